// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod error;
mod fs_token;
mod share;
mod share_manager;
mod shamir;
mod soft_token;
mod token;
pub use error::*;
pub use fs_token::FileSystemToken;
pub use share::*;
pub use share_manager::*;
pub use soft_token::SoftToken;
pub use token::*;
