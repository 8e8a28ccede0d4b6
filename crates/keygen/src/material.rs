// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use ccm_crypto::SecretBytes;
use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::KeygenError;

/// A vector of secrets modulo a public prime, stored as fixed-width big-endian byte strings that
/// are wiped on drop.
///
/// This is the unit the share manager splits and reconstructs. Secrets are only materialized as
/// big integers for the duration of a computation.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKeyMaterial {
    modulus: BigUint,
    secret_length: usize,
    secrets: Vec<SecretBytes>,
}

impl PrivateKeyMaterial {
    pub fn new(modulus: BigUint, secrets: Vec<BigUint>) -> Result<Self, KeygenError> {
        let secret_length = byte_length(&modulus);
        let encoded = secrets
            .iter()
            .map(|s| encode_fixed(s, secret_length))
            .collect();
        Self::from_encoded(modulus, secret_length, encoded)
    }

    pub fn from_encoded(
        modulus: BigUint,
        secret_length: usize,
        secrets: Vec<SecretBytes>,
    ) -> Result<Self, KeygenError> {
        if modulus < BigUint::from(2u8) {
            return Err(KeygenError::InvalidConfiguration(
                "secret modulus must be at least 2".to_string(),
            ));
        }
        if secrets.is_empty() {
            return Err(KeygenError::InvalidConfiguration(
                "key material must hold at least one secret".to_string(),
            ));
        }
        if secret_length < byte_length(&modulus) {
            return Err(KeygenError::InvalidConfiguration(
                "secret length is shorter than the modulus".to_string(),
            ));
        }
        for secret in &secrets {
            if secret.len() != secret_length {
                return Err(KeygenError::InvalidConfiguration(format!(
                    "secret encoded on {} bytes, expected {}",
                    secret.len(),
                    secret_length
                )));
            }
            if BigUint::from_bytes_be(secret.expose()) >= modulus {
                return Err(KeygenError::InvalidConfiguration(
                    "secret is not reduced modulo the modulus".to_string(),
                ));
            }
        }
        Ok(Self {
            modulus,
            secret_length,
            secrets,
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Width in bytes of every encoded secret.
    pub fn secret_length(&self) -> usize {
        self.secret_length
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn secret(&self, index: usize) -> Option<BigUint> {
        self.secrets
            .get(index)
            .map(|s| BigUint::from_bytes_be(s.expose()))
    }

    pub fn secrets(&self) -> impl Iterator<Item = BigUint> + '_ {
        self.secrets
            .iter()
            .map(|s| BigUint::from_bytes_be(s.expose()))
    }

    pub fn encoded(&self) -> &[SecretBytes] {
        &self.secrets
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("modulus", &self.modulus)
            .field("secrets", &self.secrets.len())
            .finish_non_exhaustive()
    }
}

pub fn byte_length(x: &BigUint) -> usize {
    ((x.bits() as usize) + 7) / 8
}

/// Left-pad the big-endian encoding of `x` to `width` bytes.
pub fn encode_fixed(x: &BigUint, width: usize) -> SecretBytes {
    let mut raw = x.to_bytes_be();
    let mut out = vec![0u8; width.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    raw.zeroize();
    SecretBytes::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_fixed_width() {
        let material =
            PrivateKeyMaterial::new(BigUint::from(65_521u32), vec![3u8.into(), 65_000u32.into()])
                .unwrap();
        assert_eq!(material.secret_length(), 2);
        assert_eq!(material.encoded()[0].expose(), &[0, 3]);
        assert_eq!(material.secret(1), Some(BigUint::from(65_000u32)));
        assert_eq!(material.secret(2), None);
    }

    #[test]
    fn rejects_unreduced_or_empty() {
        assert!(PrivateKeyMaterial::new(BigUint::from(11u8), vec![11u8.into()]).is_err());
        assert!(PrivateKeyMaterial::new(BigUint::from(11u8), vec![]).is_err());
        assert!(PrivateKeyMaterial::new(BigUint::from(1u8), vec![0u8.into()]).is_err());
    }

    #[test]
    fn debug_does_not_print_secrets() {
        let material = PrivateKeyMaterial::new(BigUint::from(11u8), vec![7u8.into()]).unwrap();
        let out = format!("{material:?}");
        assert!(out.contains("secrets: 1"));
        assert!(!out.contains("[7]"));
    }
}
