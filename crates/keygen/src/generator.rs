// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::{ElGamalKeyPair, ElGamalPrivateKey, GroupParameters, KeygenError, PrivateKeyMaterial};

/// Runs SetupTallyCCM: generates this control component's election key pair.
///
/// The number of recipients μ is fixed at construction (maximum number of write-in options
/// plus one) and checked on every call before the random source is touched.
pub struct ElectionKeyGenerator<R> {
    mu: usize,
    rng: R,
}

impl<R: RngCore + CryptoRng> ElectionKeyGenerator<R> {
    pub fn new(mu: usize, rng: R) -> Self {
        Self { mu, rng }
    }

    pub fn from_max_write_ins(max_write_in_options: usize, rng: R) -> Self {
        Self::new(max_write_in_options.saturating_add(1), rng)
    }

    pub fn mu(&self) -> usize {
        self.mu
    }

    /// Draw μ exponents uniformly from `[1, q - 1]` and raise the generator to each of them.
    pub fn setup_tally_ccm(
        &mut self,
        group: &GroupParameters,
    ) -> Result<ElGamalKeyPair, KeygenError> {
        if self.mu == 0 {
            return Err(KeygenError::InvalidConfiguration(
                "number of key elements mu must be strictly positive".to_string(),
            ));
        }

        let one = BigUint::one();
        let exponents: Vec<BigUint> = (0..self.mu)
            .map(|_| self.rng.gen_biguint_range(&one, group.q()))
            .collect();

        let material = PrivateKeyMaterial::new(group.q().clone(), exponents)?;
        let private_key = ElGamalPrivateKey::from_material(group, material)?;
        let key_pair = ElGamalKeyPair::from_private(group, private_key)?;

        info!(
            mu = self.mu,
            group = %group.fingerprint(),
            "SetupTallyCCM generated election key pair"
        );
        Ok(key_pair)
    }
}
