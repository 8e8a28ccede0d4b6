// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::Serialize;

use crate::{GroupFingerprint, GroupParameters, KeygenError, PrivateKeyMaterial};

/// Multi-recipient ElGamal public key: μ group elements, tagged with the group they live in.
///
/// Only [`ElGamalPublicKey::new`] builds one, so a received key always passes the membership check
/// against its group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ElGamalPublicKey {
    group: GroupFingerprint,
    elements: Vec<BigUint>,
}

impl ElGamalPublicKey {
    /// Build a public key from raw elements, checking every element is in the group.
    pub fn new(group: &GroupParameters, elements: Vec<BigUint>) -> Result<Self, KeygenError> {
        if elements.is_empty() {
            return Err(KeygenError::InvalidConfiguration(
                "public key must have at least one element".to_string(),
            ));
        }
        if let Some(bad) = elements.iter().position(|e| !group.is_member(e)) {
            return Err(KeygenError::InvalidConfiguration(format!(
                "public key element {bad} is not a group member"
            )));
        }
        Ok(Self {
            group: group.fingerprint(),
            elements,
        })
    }

    pub fn group(&self) -> GroupFingerprint {
        self.group
    }

    pub fn elements(&self) -> &[BigUint] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element-wise product of the public keys of all control components, giving the election
    /// public key whose private key is the sum of the nodes' private keys.
    pub fn combine(
        group: &GroupParameters,
        keys: &[ElGamalPublicKey],
    ) -> Result<ElGamalPublicKey, KeygenError> {
        let Some(first) = keys.first() else {
            return Err(KeygenError::InvalidConfiguration(
                "cannot combine an empty set of public keys".to_string(),
            ));
        };
        let width = first.len();
        let mut elements = vec![BigUint::one(); width];
        for key in keys {
            group.ensure(key.group)?;
            if key.len() != width {
                return Err(KeygenError::WidthMismatch {
                    expected: width,
                    found: key.len(),
                });
            }
            for (acc, e) in elements.iter_mut().zip(&key.elements) {
                *acc = (&*acc * e) % group.p();
            }
        }
        Ok(ElGamalPublicKey {
            group: group.fingerprint(),
            elements,
        })
    }

    /// Reduce the key to `width` elements by multiplying the trailing elements into the last
    /// kept one.
    pub fn compress(
        &self,
        group: &GroupParameters,
        width: usize,
    ) -> Result<ElGamalPublicKey, KeygenError> {
        group.ensure(self.group)?;
        if width == 0 || width > self.len() {
            return Err(KeygenError::WidthMismatch {
                expected: self.len(),
                found: width,
            });
        }
        let mut elements: Vec<BigUint> = self.elements[..width - 1].to_vec();
        let tail = self.elements[width - 1..]
            .iter()
            .fold(BigUint::one(), |acc, e| (acc * e) % group.p());
        elements.push(tail);
        Ok(ElGamalPublicKey {
            group: self.group,
            elements,
        })
    }
}

/// Multi-recipient ElGamal private key: μ exponents in `[1, q - 1]`.
#[derive(Clone, PartialEq, Eq)]
pub struct ElGamalPrivateKey {
    group: GroupFingerprint,
    material: PrivateKeyMaterial,
}

impl ElGamalPrivateKey {
    /// Rebuild a private key from material recovered from shares.
    pub fn from_material(
        group: &GroupParameters,
        material: PrivateKeyMaterial,
    ) -> Result<Self, KeygenError> {
        if material.modulus() != group.q() {
            return Err(KeygenError::InvalidConfiguration(
                "key material modulus is not the group order".to_string(),
            ));
        }
        if material.secrets().any(|x| x.is_zero()) {
            return Err(KeygenError::InvalidConfiguration(
                "private exponent must not be zero".to_string(),
            ));
        }
        Ok(Self {
            group: group.fingerprint(),
            material,
        })
    }

    pub fn group(&self) -> GroupFingerprint {
        self.group
    }

    pub fn len(&self) -> usize {
        self.material.len()
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }

    pub fn exponent(&self, index: usize) -> Option<BigUint> {
        self.material.secret(index)
    }

    pub fn material(&self) -> &PrivateKeyMaterial {
        &self.material
    }

    pub fn into_material(self) -> PrivateKeyMaterial {
        self.material
    }

    /// Derive the matching public key.
    pub fn public_key(&self, group: &GroupParameters) -> Result<ElGamalPublicKey, KeygenError> {
        group.ensure(self.group)?;
        Ok(ElGamalPublicKey {
            group: self.group,
            elements: self.material.secrets().map(|x| group.exp(&x)).collect(),
        })
    }
}

impl fmt::Debug for ElGamalPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElGamalPrivateKey")
            .field("group", &self.group)
            .field("len", &self.material.len())
            .finish_non_exhaustive()
    }
}

/// A node's election key pair. Both halves have the same width μ and the same group tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamalKeyPair {
    public_key: ElGamalPublicKey,
    private_key: ElGamalPrivateKey,
}

impl ElGamalKeyPair {
    pub fn from_private(
        group: &GroupParameters,
        private_key: ElGamalPrivateKey,
    ) -> Result<Self, KeygenError> {
        let public_key = private_key.public_key(group)?;
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &ElGamalPrivateKey {
        &self.private_key
    }

    pub fn group(&self) -> GroupFingerprint {
        self.public_key.group
    }

    /// Number of recipients μ.
    pub fn len(&self) -> usize {
        self.public_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.public_key.is_empty()
    }

    /// Check that every public element is `g` raised to the matching private exponent.
    pub fn verify(&self, group: &GroupParameters) -> Result<bool, KeygenError> {
        Ok(self.private_key.public_key(group)? == self.public_key)
    }

    pub fn into_parts(self) -> (ElGamalPublicKey, ElGamalPrivateKey) {
        (self.public_key, self.private_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> GroupParameters {
        GroupParameters::from_u64(23, 11, 2).unwrap()
    }

    fn pair(exponents: &[u32]) -> ElGamalKeyPair {
        let group = group();
        let material = PrivateKeyMaterial::new(
            group.q().clone(),
            exponents.iter().map(|x| BigUint::from(*x)).collect(),
        )
        .unwrap();
        let private = ElGamalPrivateKey::from_material(&group, material).unwrap();
        ElGamalKeyPair::from_private(&group, private).unwrap()
    }

    #[test]
    fn public_elements_are_powers_of_g() {
        let kp = pair(&[3, 7]);
        // 2^3 = 8, 2^7 = 128 = 13 mod 23
        assert_eq!(
            kp.public_key().elements(),
            &[BigUint::from(8u8), BigUint::from(13u8)]
        );
        assert!(kp.verify(&group()).unwrap());
    }

    #[test]
    fn combine_multiplies_elementwise() {
        let group = group();
        let a = pair(&[3, 7]);
        let b = pair(&[2, 1]);
        let combined =
            ElGamalPublicKey::combine(&group, &[a.public_key().clone(), b.public_key().clone()])
                .unwrap();
        // exponents add: 2^5 = 9, 2^8 = 3 mod 23
        assert_eq!(
            combined.elements(),
            &[BigUint::from(9u8), BigUint::from(3u8)]
        );
    }

    #[test]
    fn combine_rejects_foreign_group_and_width() {
        let other = GroupParameters::from_u64(47, 23, 2).unwrap();
        let a = pair(&[3]);
        let wide = pair(&[3, 4]);
        assert!(matches!(
            ElGamalPublicKey::combine(&other, &[a.public_key().clone()]),
            Err(KeygenError::GroupMismatch { .. })
        ));
        assert!(matches!(
            ElGamalPublicKey::combine(&group(), &[a.public_key().clone(), wide.public_key().clone()]),
            Err(KeygenError::WidthMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn compress_folds_tail_elements() {
        let group = group();
        let kp = pair(&[1, 2, 3]);
        let compressed = kp.public_key().compress(&group, 2).unwrap();
        // 2^1, 2^(2+3) = 32 = 9 mod 23
        assert_eq!(
            compressed.elements(),
            &[BigUint::from(2u8), BigUint::from(9u8)]
        );
        assert!(kp.public_key().compress(&group, 0).is_err());
        assert!(kp.public_key().compress(&group, 4).is_err());
    }

    #[test]
    fn private_key_rejects_zero_and_wrong_modulus() {
        let group = group();
        let zero = PrivateKeyMaterial::new(group.q().clone(), vec![BigUint::zero()]).unwrap();
        assert!(ElGamalPrivateKey::from_material(&group, zero).is_err());
        let wrong = PrivateKeyMaterial::new(BigUint::from(13u8), vec![BigUint::one()]).unwrap();
        assert!(ElGamalPrivateKey::from_material(&group, wrong).is_err());
    }

    #[test]
    fn public_key_construction_checks_membership() {
        assert!(ElGamalPublicKey::new(&group(), vec![BigUint::from(5u8)]).is_err());
        assert!(ElGamalPublicKey::new(&group(), vec![BigUint::from(4u8)]).is_ok());
    }

    #[test]
    fn published_key_is_rebuilt_through_membership_check() {
        let group = group();
        let kp = pair(&[3, 7]);
        let mut published = serde_json::to_value(kp.public_key()).unwrap();

        let elements: Vec<BigUint> =
            serde_json::from_value(published["elements"].clone()).unwrap();
        assert_eq!(&ElGamalPublicKey::new(&group, elements).unwrap(), kp.public_key());

        // 5 is not a quadratic residue mod 23
        published["elements"] = serde_json::to_value(vec![BigUint::from(5u8)]).unwrap();
        let tampered: Vec<BigUint> = serde_json::from_value(published["elements"].clone()).unwrap();
        assert!(ElGamalPublicKey::new(&group, tampered).is_err());
    }
}
