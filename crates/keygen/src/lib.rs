// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod error;
mod generator;
mod group;
mod key_set;
mod keys;
mod material;
pub use error::*;
pub use generator::*;
pub use group::*;
pub use key_set::*;
pub use keys::*;
pub use material::*;
