// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use ccm_crypto::{ct_eq, integrity_digest, SecretBytes, DIGEST_LEN};
use num_bigint::BigUint;
use num_prime::nt_funcs::is_prime;

use crate::ShareError;

pub const INSTANCE_LEN: usize = 16;

/// Identifies one run of `split`. Every share of that run carries it.
pub type InstanceId = [u8; INSTANCE_LEN];

/// One part of a threshold-shared vector of secrets.
///
/// A share holds one evaluation point per secret, all at the same abscissa `index` (1-based).
/// Shares are bound to exactly one custody token; two tokens must never hold the same index of
/// the same instance.
///
/// Wire layout (big-endian):
///
/// ```text
/// numberOfSecrets:u32 | numberOfParts:u32 | threshold:u32 | len:u16 | modulus | secretLength:u32
/// | instance:[u8;16] | ( len:u16 | x | len:u16 | y ) * numberOfSecrets | sha256:[u8;32]
/// ```
#[derive(Clone)]
pub struct Share {
    number_of_parts: u32,
    threshold: u32,
    modulus: BigUint,
    secret_length: u32,
    instance: InstanceId,
    index: u32,
    points: Vec<SecretBytes>,
    digest: [u8; DIGEST_LEN],
}

impl Share {
    pub(crate) fn new(
        number_of_parts: u32,
        threshold: u32,
        modulus: BigUint,
        secret_length: u32,
        instance: InstanceId,
        index: u32,
        points: Vec<SecretBytes>,
    ) -> Self {
        let mut share = Self {
            number_of_parts,
            threshold,
            modulus,
            secret_length,
            instance,
            index,
            points,
            digest: [0u8; DIGEST_LEN],
        };
        share.digest = integrity_digest([share.encode_body().expose()]);
        share
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn number_of_parts(&self) -> u32 {
        self.number_of_parts
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn number_of_secrets(&self) -> usize {
        self.points.len()
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn secret_length(&self) -> u32 {
        self.secret_length
    }

    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    pub(crate) fn point(&self, secret: usize) -> BigUint {
        BigUint::from_bytes_be(self.points[secret].expose())
    }

    pub(crate) fn points(&self) -> &[SecretBytes] {
        &self.points
    }

    /// True if both shares were produced by the same `split` call with the same parameters.
    pub fn same_instance(&self, other: &Share) -> bool {
        self.instance == other.instance
            && self.number_of_parts == other.number_of_parts
            && self.threshold == other.threshold
            && self.modulus == other.modulus
            && self.secret_length == other.secret_length
            && self.points.len() == other.points.len()
    }

    /// Recompute the digest over the share content and compare it in constant time.
    pub fn verify_integrity(&self) -> Result<(), ShareError> {
        let actual = integrity_digest([self.encode_body().expose()]);
        if !ct_eq(&actual, &self.digest) {
            return Err(ShareError::CorruptShare { index: self.index });
        }
        Ok(())
    }

    /// Check that the sharing parameters describe a usable field.
    ///
    /// The modulus must be a prime above `number_of_parts`, so that the abscissas `1..=parts`
    /// stay distinct and non-zero, and `index` must be one of them.
    pub fn validate_parameters(&self) -> Result<(), ShareError> {
        if self.modulus <= BigUint::from(self.number_of_parts) {
            return Err(ShareError::Malformed(format!(
                "modulus is too small for {} parts",
                self.number_of_parts
            )));
        }
        if !is_prime(&self.modulus, None).probably() {
            return Err(ShareError::Malformed("modulus is not prime".to_string()));
        }
        if self.threshold == 0 || self.threshold > self.number_of_parts {
            return Err(ShareError::Malformed(format!(
                "threshold {} does not fit {} parts",
                self.threshold, self.number_of_parts
            )));
        }
        if self.index == 0 || self.index > self.number_of_parts {
            return Err(ShareError::CorruptShare { index: self.index });
        }
        Ok(())
    }

    /// Constant-time comparison of the full encodings.
    pub fn ct_equals(&self, other: &Share) -> bool {
        ct_eq(self.to_bytes().expose(), other.to_bytes().expose())
    }

    fn encode_body(&self) -> SecretBytes {
        let modulus = self.modulus.to_bytes_be();
        let mut out = Vec::new();
        out.extend_from_slice(&(self.points.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.number_of_parts.to_be_bytes());
        out.extend_from_slice(&self.threshold.to_be_bytes());
        out.extend_from_slice(&(modulus.len() as u16).to_be_bytes());
        out.extend_from_slice(&modulus);
        out.extend_from_slice(&self.secret_length.to_be_bytes());
        out.extend_from_slice(&self.instance);
        let x = BigUint::from(self.index).to_bytes_be();
        for y in &self.points {
            out.extend_from_slice(&(x.len() as u16).to_be_bytes());
            out.extend_from_slice(&x);
            out.extend_from_slice(&(y.len() as u16).to_be_bytes());
            out.extend_from_slice(y.expose());
        }
        SecretBytes::new(out)
    }

    /// Serialize to the opaque blob written on custody tokens.
    pub fn to_bytes(&self) -> SecretBytes {
        let body = self.encode_body();
        let mut out = Vec::with_capacity(body.len() + DIGEST_LEN);
        out.extend_from_slice(body.expose());
        out.extend_from_slice(&self.digest);
        SecretBytes::new(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Share, ShareError> {
        if bytes.len() < DIGEST_LEN {
            return Err(ShareError::Malformed("shorter than its digest".to_string()));
        }
        let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);
        let mut reader = Reader::new(body);

        let number_of_secrets = reader.u32()?;
        let number_of_parts = reader.u32()?;
        let threshold = reader.u32()?;
        let modulus_len = reader.u16()? as usize;
        let modulus = BigUint::from_bytes_be(reader.take(modulus_len)?);
        let secret_length = reader.u32()?;
        let mut instance = [0u8; INSTANCE_LEN];
        instance.copy_from_slice(reader.take(INSTANCE_LEN)?);

        if number_of_secrets == 0 {
            return Err(ShareError::Malformed("share holds no secrets".to_string()));
        }
        // every point needs at least its two length prefixes
        if (number_of_secrets as usize).saturating_mul(4) > reader.remaining() {
            return Err(ShareError::Malformed("truncated points".to_string()));
        }

        let mut index = None;
        let mut points = Vec::with_capacity(number_of_secrets as usize);
        for _ in 0..number_of_secrets {
            let x_len = reader.u16()? as usize;
            let x = BigUint::from_bytes_be(reader.take(x_len)?);
            let x = u32::try_from(x)
                .map_err(|_| ShareError::Malformed("abscissa out of range".to_string()))?;
            match index {
                None => index = Some(x),
                Some(i) if i != x => {
                    return Err(ShareError::Malformed(
                        "points of one share must share their abscissa".to_string(),
                    ))
                }
                Some(_) => {}
            }
            let y_len = reader.u16()? as usize;
            points.push(SecretBytes::new(reader.take(y_len)?.to_vec()));
        }
        if reader.remaining() != 0 {
            return Err(ShareError::Malformed(
                "bytes left in the buffer after decoding".to_string(),
            ));
        }

        let index = index.unwrap_or_default();
        let mut expected = [0u8; DIGEST_LEN];
        expected.copy_from_slice(digest);
        let share = Share {
            number_of_parts,
            threshold,
            modulus,
            secret_length,
            instance,
            index,
            points,
            digest: expected,
        };
        share.verify_integrity()?;
        share.validate_parameters()?;
        Ok(share)
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("number_of_parts", &self.number_of_parts)
            .field("threshold", &self.threshold)
            .field("number_of_secrets", &self.points.len())
            .field("instance", &hex::encode(self.instance))
            .finish_non_exhaustive()
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ShareError> {
        if self.remaining() < n {
            return Err(ShareError::Malformed(
                "the byte array is shorter than expected".to_string(),
            ));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, ShareError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ShareError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
