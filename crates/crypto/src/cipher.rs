// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use ccm_utils::REDACTED;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

// ARGON2 PARAMS
// https://cheatsheetseries.owasp.org/cheatsheets/Password_Storage_Cheat_Sheet.html
const ARGON2_M_COST: u32 = 19 * 1024; // 19 MiB
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;
const ARGON2_ALGORITHM: Algorithm = Algorithm::Argon2id;
const ARGON2_VERSION: Version = Version::V0x13;

// AES PARAMS
const AES_SALT_LEN: usize = 32;
const AES_NONCE_LEN: usize = 12;
const AES_HEADER_LEN: usize = AES_SALT_LEN + AES_NONCE_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("key derivation failed")]
    KeyDerivation,

    #[error("sealed data is shorter than its header ({0} bytes)")]
    Truncated(usize),

    /// Raised for a wrong PIN as well as for tampered ciphertext; AES-GCM cannot tell them apart.
    #[error("authentication failed")]
    Authentication,

    #[error("encryption failed")]
    Encryption,
}

/// A token PIN. Wiped on drop and never printed.
#[derive(Clone)]
pub struct Pin(Zeroizing<Vec<u8>>);

impl Pin {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Zeroizing::new(value.as_ref().as_bytes().to_vec()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    fn bytes(&self) -> &Zeroizing<Vec<u8>> {
        &self.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({REDACTED})")
    }
}

impl From<&str> for Pin {
    fn from(value: &str) -> Self {
        Pin::new(value)
    }
}

/// Derives a 256 bit key from the PIN with Argon2id.
fn argon2_derive_key(
    pin_bytes: &Zeroizing<Vec<u8>>,
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let mut derived_key = Zeroizing::new(vec![0u8; ARGON2_OUTPUT_LEN]);
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|_| CipherError::KeyDerivation)?;

    Argon2::new(ARGON2_ALGORITHM, ARGON2_VERSION, params)
        .hash_password_into(pin_bytes, salt, &mut derived_key)
        .map_err(|_| CipherError::KeyDerivation)?;

    Ok(derived_key)
}

/// Seal `data` as `salt | nonce | AES-256-GCM ciphertext`, with a fresh salt and nonce per
/// call. The plaintext buffer is wiped before returning.
fn encrypt_data(pin_bytes: &Zeroizing<Vec<u8>>, data: &mut Vec<u8>) -> Result<Vec<u8>, CipherError> {
    let mut salt = [0u8; AES_SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; AES_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let derived_key = argon2_derive_key(pin_bytes, &salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(&derived_key).map_err(|_| CipherError::KeyDerivation)?;

    let ciphertext = cipher
        .encrypt(nonce, data.as_ref())
        .map_err(|_| CipherError::Encryption)?;

    data.zeroize();

    let mut output = Vec::with_capacity(AES_HEADER_LEN + ciphertext.len());
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Inverse of [`encrypt_data`]. A wrong PIN or a modified blob fails the GCM tag check.
fn decrypt_data(
    pin_bytes: &Zeroizing<Vec<u8>>,
    encrypted_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    if encrypted_data.len() < AES_HEADER_LEN {
        return Err(CipherError::Truncated(encrypted_data.len()));
    }

    let salt = &encrypted_data[..AES_SALT_LEN];
    let nonce = Nonce::from_slice(&encrypted_data[AES_SALT_LEN..AES_HEADER_LEN]);
    let ciphertext = &encrypted_data[AES_HEADER_LEN..];

    let derived_key = argon2_derive_key(pin_bytes, salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(&derived_key).map_err(|_| CipherError::KeyDerivation)?;

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CipherError::Authentication)?;

    Ok(Zeroizing::new(plaintext))
}

/// Seals and opens byte strings under a PIN.
///
/// Every call to [`Cipher::encrypt_data`] draws a fresh salt and nonce, so sealing the same share
/// twice yields unrelated ciphertexts. Opening with the wrong PIN fails with
/// [`CipherError::Authentication`].
///
/// ```
/// use ccm_crypto::{Cipher, Pin};
///
/// let cipher = Cipher::from_pin(&Pin::new("123456"));
/// let mut data = b"share".to_vec();
/// let sealed = cipher.encrypt_data(&mut data).unwrap();
/// assert!(data.iter().all(|b| *b == 0));
/// assert_eq!(&cipher.decrypt_data(&sealed).unwrap()[..], b"share");
/// ```
pub struct Cipher {
    pin: Pin,
}

impl Cipher {
    pub fn from_pin(pin: &Pin) -> Self {
        Self { pin: pin.clone() }
    }

    /// Encrypt `data`, zeroizing it afterwards.
    pub fn encrypt_data(&self, data: &mut Vec<u8>) -> Result<Vec<u8>, CipherError> {
        encrypt_data(self.pin.bytes(), data)
    }

    pub fn decrypt_data(&self, encrypted_data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        decrypt_data(self.pin.bytes(), encrypted_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_encryption_decryption() {
        let cipher = Cipher::from_pin(&Pin::new("1234"));
        let mut data = b"threshold share".to_vec();

        let encrypted = cipher.encrypt_data(&mut data).unwrap();
        assert_ne!(&encrypted[AES_HEADER_LEN..], b"threshold share");
        assert!(data.iter().all(|b| *b == 0));

        let decrypted = cipher.decrypt_data(&encrypted).unwrap();
        assert_eq!(&decrypted[..], b"threshold share");
    }

    #[test]
    fn test_empty_data() {
        let cipher = Cipher::from_pin(&Pin::new("1234"));
        let encrypted = cipher.encrypt_data(&mut Vec::new()).unwrap();
        assert!(cipher.decrypt_data(&encrypted).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_pin_is_authentication_failure() {
        let sealed = Cipher::from_pin(&Pin::new("1234"))
            .encrypt_data(&mut b"secret".to_vec())
            .unwrap();
        let err = Cipher::from_pin(&Pin::new("4321"))
            .decrypt_data(&sealed)
            .unwrap_err();
        assert_eq!(err, CipherError::Authentication);
    }

    #[test]
    fn test_truncated_input() {
        let cipher = Cipher::from_pin(&Pin::new("1234"));
        assert_eq!(
            cipher.decrypt_data(&[0u8; 10]).unwrap_err(),
            CipherError::Truncated(10)
        );
    }

    #[test]
    fn test_pin_debug_is_redacted() {
        assert_eq!(format!("{:?}", Pin::new("999999")), "Pin(<redacted>)");
    }
}
