// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use sha2::{Digest, Sha256};

use crate::ct_eq;

pub const DIGEST_LEN: usize = 32;

/// SHA-256 over the concatenation of all parts.
pub fn integrity_digest<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Check `expected` against the digest of `data` in constant time.
pub fn verify_digest(data: &[u8], expected: &[u8]) -> bool {
    ct_eq(&integrity_digest([data]), expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_split_invariant() {
        assert_eq!(
            integrity_digest([b"ab".as_slice(), b"cd".as_slice()]),
            integrity_digest([b"abcd".as_slice()])
        );
    }

    #[test]
    fn verify_detects_tampering() {
        let tag = integrity_digest([b"payload".as_slice()]);
        assert!(verify_digest(b"payload", &tag));
        assert!(!verify_digest(b"paylaod", &tag));
    }
}
