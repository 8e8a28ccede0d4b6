// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use ccm_crypto::{integrity_digest, DIGEST_LEN};
use num_bigint::BigUint;
use num_prime::nt_funcs::is_prime;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::KeygenError;

/// Identifies a group by a SHA-256 over its parameters. Every key carries the fingerprint of the
/// group it was generated in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupFingerprint([u8; DIGEST_LEN]);

impl GroupFingerprint {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for GroupFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for GroupFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupFingerprint({self})")
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct RawGroupParameters {
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

/// The multiplicative subgroup of order `q` of `Z_p^*`, generated by `g`.
///
/// Constructed once per election event and shared read-only by every control component that must
/// compute compatible keys. Construction validates the parameters, so every `GroupParameters`
/// value in the system is a usable group.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGroupParameters", into = "RawGroupParameters")]
pub struct GroupParameters {
    p: BigUint,
    q: BigUint,
    g: BigUint,
    fingerprint: GroupFingerprint,
}

impl GroupParameters {
    pub fn new(p: BigUint, q: BigUint, g: BigUint) -> Result<Self, KeygenError> {
        let two = BigUint::from(2u8);
        if p <= BigUint::from(3u8) || (&p % &two).is_zero() {
            return Err(KeygenError::config("modulus p must be an odd number above 3"));
        }
        if q < two {
            return Err(KeygenError::config("order q must be at least 2"));
        }
        if !((&p - BigUint::one()) % &q).is_zero() {
            return Err(KeygenError::config("order q must divide p - 1"));
        }
        if !is_prime(&p, None).probably() {
            return Err(KeygenError::config("modulus p is not prime"));
        }
        if !is_prime(&q, None).probably() {
            return Err(KeygenError::config("order q is not prime"));
        }
        if g <= BigUint::one() || g >= p {
            return Err(KeygenError::config("generator g must lie in (1, p)"));
        }
        if !g.modpow(&q, &p).is_one() {
            return Err(KeygenError::config("generator g does not have order q"));
        }

        let fingerprint = fingerprint(&p, &q, &g);
        Ok(Self {
            p,
            q,
            g,
            fingerprint,
        })
    }

    pub fn from_u64(p: u64, q: u64, g: u64) -> Result<Self, KeygenError> {
        Self::new(BigUint::from(p), BigUint::from(q), BigUint::from(g))
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    pub fn fingerprint(&self) -> GroupFingerprint {
        self.fingerprint
    }

    /// `g^exponent mod p`
    pub fn exp(&self, exponent: &BigUint) -> BigUint {
        self.g.modpow(exponent, &self.p)
    }

    pub fn is_member(&self, x: &BigUint) -> bool {
        !x.is_zero() && x < &self.p && x.modpow(&self.q, &self.p).is_one()
    }

    /// Fail with `GroupMismatch` unless `other` names this group.
    pub fn ensure(&self, other: GroupFingerprint) -> Result<(), KeygenError> {
        if other != self.fingerprint {
            return Err(KeygenError::GroupMismatch {
                expected: self.fingerprint,
                found: other,
            });
        }
        Ok(())
    }
}

fn fingerprint(p: &BigUint, q: &BigUint, g: &BigUint) -> GroupFingerprint {
    let encoded: Vec<Vec<u8>> = [p, q, g]
        .iter()
        .map(|x| {
            let bytes = x.to_bytes_be();
            let mut out = (bytes.len() as u32).to_be_bytes().to_vec();
            out.extend(bytes);
            out
        })
        .collect();
    GroupFingerprint(integrity_digest(encoded.iter().map(|v| v.as_slice())))
}

impl TryFrom<RawGroupParameters> for GroupParameters {
    type Error = KeygenError;
    fn try_from(value: RawGroupParameters) -> Result<Self, Self::Error> {
        GroupParameters::new(value.p, value.q, value.g)
    }
}

impl From<GroupParameters> for RawGroupParameters {
    fn from(value: GroupParameters) -> Self {
        RawGroupParameters {
            p: value.p,
            q: value.q,
            g: value.g,
        }
    }
}

impl fmt::Debug for GroupParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupParameters")
            .field("p", &self.p)
            .field("q", &self.q)
            .field("g", &self.g)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_small_safe_prime_group() {
        let group = GroupParameters::from_u64(23, 11, 2).unwrap();
        assert_eq!(group.exp(&BigUint::from(11u8)), BigUint::one());
        assert!(group.is_member(&BigUint::from(4u8)));
        // 5 generates all of Z_23^*, not the order 11 subgroup
        assert!(!group.is_member(&BigUint::from(5u8)));
    }

    #[test]
    fn rejects_bad_parameters() {
        let cases = [
            (22, 11, 2), // even modulus
            (23, 7, 2),  // q does not divide p - 1
            (23, 11, 5), // g of the wrong order
            (23, 11, 1), // trivial generator
            (23, 11, 23),
            (27, 13, 2), // composite modulus
            (3, 2, 2),
        ];
        for (p, q, g) in cases {
            let err = GroupParameters::from_u64(p, q, g).unwrap_err();
            assert!(
                matches!(err, KeygenError::InvalidConfiguration(_)),
                "({p}, {q}, {g}) gave {err:?}"
            );
        }
    }

    #[test]
    fn fingerprint_distinguishes_groups() {
        let a = GroupParameters::from_u64(23, 11, 2).unwrap();
        let b = GroupParameters::from_u64(23, 11, 4).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.ensure(a.fingerprint()).is_ok());
        assert!(matches!(
            a.ensure(b.fingerprint()),
            Err(KeygenError::GroupMismatch { .. })
        ));
    }

    #[test]
    fn deserialization_revalidates() {
        let group = GroupParameters::from_u64(23, 11, 2).unwrap();
        let json = serde_json::to_string(&group).unwrap();
        let back: GroupParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);

        let tampered = json.replace("[2]", "[5]");
        assert!(serde_json::from_str::<GroupParameters>(&tampered).is_err());
    }
}
