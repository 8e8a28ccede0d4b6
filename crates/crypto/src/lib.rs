// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod cipher;
mod constant_time;
mod digest;
mod secret;
pub use cipher::{Cipher, CipherError, Pin};
pub use constant_time::*;
pub use digest::*;
pub use secret::*;
