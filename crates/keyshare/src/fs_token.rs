// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use ccm_crypto::{Cipher, CipherError, Pin, SecretBytes};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ShareToken, TokenError};

const SHARE_FILE: &str = "share.json";
const SHARE_FILE_TMP: &str = "share.json.tmp";

#[derive(Serialize, Deserialize)]
struct TokenFile {
    label: String,
    /// Hex of salt | nonce | AES-GCM ciphertext.
    sealed_share: String,
}

/// A token backed by a directory, typically the mount point of removable media.
///
/// The directory existing means the token is inserted. The share is sealed under a key derived
/// from the PIN, so a wrong PIN surfaces as [`TokenError::WrongPin`] when the AES-GCM tag does
/// not verify.
#[derive(Debug, Clone)]
pub struct FileSystemToken {
    dir: PathBuf,
}

impl FileSystemToken {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_present(&self) -> Result<(), TokenError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(TokenError::NoTokenPresent)
        }
    }

    fn load(&self) -> Result<Option<TokenFile>, TokenError> {
        self.ensure_present()?;
        let raw = match fs::read(self.dir.join(SHARE_FILE)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TokenError::Io(e.to_string())),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| TokenError::Unreadable(e.to_string()))
    }

    fn open(&self, file: &TokenFile, pin: &Pin) -> Result<SecretBytes, TokenError> {
        let sealed =
            hex::decode(&file.sealed_share).map_err(|e| TokenError::Unreadable(e.to_string()))?;
        let plain = Cipher::from_pin(pin)
            .decrypt_data(&sealed)
            .map_err(|e| match e {
                CipherError::Authentication => {
                    warn!(token = %self.dir.display(), "wrong PIN presented to token");
                    TokenError::WrongPin
                }
                other => TokenError::Unreadable(other.to_string()),
            })?;
        Ok(SecretBytes::new(plain.to_vec()))
    }

    /// Write to a temporary file with owner-only permissions, then rename over the share file.
    fn store(&self, label: &str, share: &SecretBytes, pin: &Pin) -> Result<(), TokenError> {
        let mut plain = share.expose().to_vec();
        let sealed = Cipher::from_pin(pin)
            .encrypt_data(&mut plain)
            .map_err(|e| TokenError::Io(e.to_string()))?;
        let file = TokenFile {
            label: label.to_string(),
            sealed_share: hex::encode(sealed),
        };
        let json = serde_json::to_vec(&file).map_err(|e| TokenError::Io(e.to_string()))?;

        let tmp = self.dir.join(SHARE_FILE_TMP);
        let _ = fs::remove_file(&tmp);
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&tmp)
            .map_err(|e| TokenError::Io(e.to_string()))?;
        out.write_all(&json)
            .and_then(|_| out.sync_all())
            .map_err(|e| TokenError::Io(e.to_string()))?;
        drop(out);
        fs::rename(&tmp, self.dir.join(SHARE_FILE)).map_err(|e| TokenError::Io(e.to_string()))?;
        debug!(token = %self.dir.display(), label = %label, "share written to token");
        Ok(())
    }
}

impl ShareToken for FileSystemToken {
    fn is_present(&self) -> bool {
        self.dir.is_dir()
    }

    fn label(&self) -> Result<Option<String>, TokenError> {
        Ok(self.load()?.map(|f| f.label))
    }

    fn read_share(&self, pin: &Pin) -> Result<SecretBytes, TokenError> {
        let file = self.load()?.ok_or(TokenError::Blank)?;
        self.open(&file, pin)
    }

    fn write_share(&self, share: &SecretBytes, label: &str, pin: &Pin) -> Result<(), TokenError> {
        self.ensure_present()?;
        self.store(label, share, pin)
    }

    fn change_pin(&self, old: &Pin, new: &Pin) -> Result<(), TokenError> {
        let file = self.load()?.ok_or(TokenError::Blank)?;
        let share = self.open(&file, old)?;
        self.store(&file.label, &share, new)
    }
}
