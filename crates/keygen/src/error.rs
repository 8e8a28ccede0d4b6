// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

use crate::GroupFingerprint;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeygenError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("key material belongs to group {found}, expected {expected}")]
    GroupMismatch {
        expected: GroupFingerprint,
        found: GroupFingerprint,
    },

    #[error("key width mismatch: expected {expected} elements, found {found}")]
    WidthMismatch { expected: usize, found: usize },
}

impl KeygenError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        KeygenError::InvalidConfiguration(msg.into())
    }
}
