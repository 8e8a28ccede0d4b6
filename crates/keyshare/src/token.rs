// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{fmt, sync::Arc};

use ccm_crypto::{Pin, SecretBytes};

use crate::TokenError;

/// Capability over one physical custody token (a smartcard or a stand-in for one).
///
/// The token stores a single opaque share blob plus a human readable label and guards the blob
/// with a PIN. Implementations must be usable from several threads.
pub trait ShareToken: Send + Sync {
    /// Whether the token is currently reachable.
    fn is_present(&self) -> bool;

    /// Label written with the last share, `None` for a blank token.
    fn label(&self) -> Result<Option<String>, TokenError>;

    fn read_share(&self, pin: &Pin) -> Result<SecretBytes, TokenError>;

    /// Write `share` under `pin`, replacing anything the token held.
    fn write_share(&self, share: &SecretBytes, label: &str, pin: &Pin) -> Result<(), TokenError>;

    fn change_pin(&self, old: &Pin, new: &Pin) -> Result<(), TokenError>;
}

/// A token together with the PIN the operator typed for it.
#[derive(Clone)]
pub struct TokenSlot {
    pub token: Arc<dyn ShareToken>,
    pub pin: Pin,
}

impl TokenSlot {
    pub fn new(token: Arc<dyn ShareToken>, pin: impl Into<Pin>) -> Self {
        Self {
            token,
            pin: pin.into(),
        }
    }
}

impl fmt::Debug for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSlot")
            .field("present", &self.token.is_present())
            .field("pin", &self.pin)
            .finish()
    }
}
