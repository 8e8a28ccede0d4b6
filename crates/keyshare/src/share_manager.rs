// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::collections::BTreeMap;

use ccm_crypto::{ct_eq, SecretBytes};
use ccm_keygen::{byte_length, encode_fixed, PrivateKeyMaterial};
use num_bigint::{BigUint, RandBigInt};
use num_prime::nt_funcs::is_prime;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::{
    shamir::{evaluate, interpolate},
    InstanceId, Share, ShareError, TokenError, TokenSlot, INSTANCE_LEN,
};

/// Splits private key material into Shamir shares over Z_p and recombines them.
///
/// Every secret of the material is shared with its own random polynomial of degree
/// `threshold - 1`; all polynomials are evaluated at the same abscissas `1..=parts`, so share `i`
/// carries one point per secret.
pub struct ShareManager<R> {
    rng: R,
}

impl<R: RngCore + CryptoRng> ShareManager<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn split(
        &mut self,
        secret: &PrivateKeyMaterial,
        parts: u32,
        threshold: u32,
    ) -> Result<Vec<Share>, ShareError> {
        if threshold == 0 || threshold > parts {
            return Err(ShareError::InvalidThreshold { threshold, parts });
        }
        let modulus = secret.modulus();
        if BigUint::from(parts) >= *modulus {
            return Err(ShareError::InvalidModulus(format!(
                "modulus is too small for {parts} parts"
            )));
        }
        if !is_prime(modulus, None).probably() {
            return Err(ShareError::InvalidModulus(
                "secret sharing requires a prime modulus".to_string(),
            ));
        }

        let mut instance: InstanceId = [0u8; INSTANCE_LEN];
        self.rng.fill_bytes(&mut instance);

        let width = byte_length(modulus);
        let mut points: Vec<Vec<SecretBytes>> = (0..parts).map(|_| Vec::new()).collect();
        for s in secret.secrets() {
            let mut coefficients = Vec::with_capacity(threshold as usize);
            coefficients.push(s);
            for _ in 1..threshold {
                coefficients.push(self.rng.gen_biguint_below(modulus));
            }
            for (x, column) in (1..=parts).zip(points.iter_mut()) {
                let y = evaluate(&coefficients, &BigUint::from(x), modulus);
                column.push(encode_fixed(&y, width));
            }
        }

        let secret_length = u32::try_from(secret.secret_length())
            .map_err(|_| ShareError::InvalidModulus("secret length overflows".to_string()))?;
        let shares = (1..=parts)
            .zip(points)
            .map(|(index, column)| {
                Share::new(
                    parts,
                    threshold,
                    modulus.clone(),
                    secret_length,
                    instance,
                    index,
                    column,
                )
            })
            .collect();

        info!(
            parts,
            threshold,
            secrets = secret.len(),
            instance = %hex::encode(instance),
            "split key material into shares"
        );
        Ok(shares)
    }

    /// Split `secret` into one share per token and write each share under the slot's PIN.
    ///
    /// Every token must be present before anything is written.
    pub fn export_to_tokens(
        &mut self,
        secret: &PrivateKeyMaterial,
        slots: &[TokenSlot],
        threshold: u32,
    ) -> Result<(), ShareError> {
        let parts = u32::try_from(slots.len()).map_err(|_| ShareError::InvalidThreshold {
            threshold,
            parts: u32::MAX,
        })?;
        if slots.iter().any(|slot| !slot.token.is_present()) {
            return Err(TokenError::NoTokenPresent.into());
        }

        let shares = self.split(secret, parts, threshold)?;
        let tag = hex::encode(&shares[0].instance()[..4]);
        for (slot, share) in slots.iter().zip(&shares) {
            let label = format!("ccm-share-{tag}-{}-of-{parts}", share.index());
            slot.token
                .write_share(&share.to_bytes(), &label, &slot.pin)?;
            debug!(label = %label, "share exported to token");
        }
        Ok(())
    }
}

impl<R> ShareManager<R> {
    /// Recombine the secrets from at least `threshold` distinct shares of one instance.
    ///
    /// Shares beyond the threshold must lie on the same polynomials; any that does not is
    /// reported as corrupt.
    pub fn reconstruct(&self, shares: Vec<Share>) -> Result<PrivateKeyMaterial, ShareError> {
        let Some(first) = shares.first() else {
            return Err(ShareError::InsufficientShares {
                required: 1,
                found: 0,
            });
        };
        let threshold = first.threshold() as usize;
        let modulus = first.modulus().clone();
        let secret_length = first.secret_length() as usize;
        let width = byte_length(&modulus);

        let mut distinct: BTreeMap<u32, &Share> = BTreeMap::new();
        for share in &shares {
            share.verify_integrity()?;
            if !share.same_instance(first) {
                return Err(ShareError::InconsistentShares);
            }
            share.validate_parameters()?;
            if share.points().iter().any(|y| y.len() != width) {
                return Err(ShareError::CorruptShare {
                    index: share.index(),
                });
            }
            match distinct.get(&share.index()) {
                Some(existing) if !existing.ct_equals(share) => {
                    return Err(ShareError::InconsistentShares)
                }
                Some(_) => {}
                None => {
                    distinct.insert(share.index(), share);
                }
            }
        }

        if threshold == 0 || distinct.len() < threshold {
            return Err(ShareError::InsufficientShares {
                required: threshold.max(1),
                found: distinct.len(),
            });
        }

        let (base, extra): (Vec<_>, Vec<_>) = distinct
            .values()
            .enumerate()
            .partition(|(i, _)| *i < threshold);
        let base: Vec<&Share> = base.into_iter().map(|(_, s)| *s).collect();
        let extra: Vec<&Share> = extra.into_iter().map(|(_, s)| *s).collect();

        let zero = BigUint::zero();
        let mut secrets = Vec::with_capacity(first.number_of_secrets());
        for s in 0..first.number_of_secrets() {
            let points: Vec<(BigUint, BigUint)> = base
                .iter()
                .map(|share| (BigUint::from(share.index()), share.point(s)))
                .collect();
            if points.iter().any(|(_, y)| *y >= modulus) {
                return Err(ShareError::CorruptShare {
                    index: base[0].index(),
                });
            }
            let collision = || ShareError::Malformed("share abscissas collide".to_string());
            for share in &extra {
                let expected = interpolate(&points, &BigUint::from(share.index()), &modulus)
                    .ok_or_else(collision)?;
                let expected = encode_fixed(&expected, width);
                if !ct_eq(expected.expose(), share.points()[s].expose()) {
                    return Err(ShareError::CorruptShare {
                        index: share.index(),
                    });
                }
            }
            let value = interpolate(&points, &zero, &modulus).ok_or_else(collision)?;
            secrets.push(encode_fixed(&value, secret_length));
        }

        info!(
            shares = distinct.len(),
            threshold,
            secrets = secrets.len(),
            "reconstructed key material from shares"
        );
        Ok(PrivateKeyMaterial::from_encoded(
            modulus,
            secret_length,
            secrets,
        )?)
    }

    /// Read one share from every slot and reconstruct. Token errors are returned as they are.
    pub fn recover_from_tokens(
        &self,
        slots: &[TokenSlot],
    ) -> Result<PrivateKeyMaterial, ShareError> {
        let mut shares = Vec::with_capacity(slots.len());
        for slot in slots {
            let bytes = slot.token.read_share(&slot.pin)?;
            shares.push(Share::from_bytes(bytes.expose())?);
        }
        self.reconstruct(shares)
    }
}
