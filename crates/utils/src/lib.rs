// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod constants;
pub mod formatters;
pub mod utility_types;
pub use constants::*;
pub use formatters::*;
pub use utility_types::*;
