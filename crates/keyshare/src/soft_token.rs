// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::sync::{Mutex, MutexGuard};

use ccm_crypto::{ct_eq, Pin, SecretBytes};
use tracing::warn;
use zeroize::Zeroizing;

use crate::{ShareToken, TokenError};

const DEFAULT_PIN_RETRIES: u8 = 3;

struct SoftTokenState {
    present: bool,
    pin: Zeroizing<Vec<u8>>,
    retries_left: u8,
    label: Option<String>,
    share: Option<SecretBytes>,
}

/// In-memory token with the behavior of a PIN protected smartcard: it can be pulled out, a wrong
/// PIN burns one of a few retries and a blocked token refuses every further operation.
pub struct SoftToken {
    state: Mutex<SoftTokenState>,
    max_retries: u8,
}

impl SoftToken {
    pub fn new(pin: &str) -> Self {
        Self::with_retries(pin, DEFAULT_PIN_RETRIES)
    }

    pub fn with_retries(pin: &str, max_retries: u8) -> Self {
        Self {
            state: Mutex::new(SoftTokenState {
                present: true,
                pin: Zeroizing::new(pin.as_bytes().to_vec()),
                retries_left: max_retries,
                label: None,
                share: None,
            }),
            max_retries,
        }
    }

    pub fn insert(&self) {
        self.lock().present = true;
    }

    pub fn remove(&self) {
        self.lock().present = false;
    }

    fn lock(&self) -> MutexGuard<'_, SoftTokenState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Presence and PIN checks shared by every guarded operation.
    fn unlock<'a>(
        &'a self,
        pin: &Pin,
    ) -> Result<MutexGuard<'a, SoftTokenState>, TokenError> {
        let mut state = self.lock();
        if !state.present {
            return Err(TokenError::NoTokenPresent);
        }
        if state.retries_left == 0 {
            return Err(TokenError::Blocked);
        }
        if !ct_eq(pin.expose(), &state.pin) {
            state.retries_left -= 1;
            warn!(retries_left = state.retries_left, "wrong PIN presented to soft token");
            return Err(TokenError::WrongPin);
        }
        state.retries_left = self.max_retries;
        Ok(state)
    }
}

impl ShareToken for SoftToken {
    fn is_present(&self) -> bool {
        self.lock().present
    }

    fn label(&self) -> Result<Option<String>, TokenError> {
        let state = self.lock();
        if !state.present {
            return Err(TokenError::NoTokenPresent);
        }
        Ok(state.label.clone())
    }

    fn read_share(&self, pin: &Pin) -> Result<SecretBytes, TokenError> {
        let state = self.unlock(pin)?;
        state.share.clone().ok_or(TokenError::Blank)
    }

    fn write_share(&self, share: &SecretBytes, label: &str, pin: &Pin) -> Result<(), TokenError> {
        let mut state = self.unlock(pin)?;
        state.share = Some(share.clone());
        state.label = Some(label.to_string());
        Ok(())
    }

    fn change_pin(&self, old: &Pin, new: &Pin) -> Result<(), TokenError> {
        let mut state = self.unlock(old)?;
        state.pin = Zeroizing::new(new.expose().to_vec());
        Ok(())
    }
}
