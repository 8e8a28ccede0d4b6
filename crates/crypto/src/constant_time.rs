// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use subtle::ConstantTimeEq;

/// Compare two byte strings without a data-dependent early exit.
///
/// Only the lengths are compared in variable time; lengths of shares, digests and exponents are
/// public parameters.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
