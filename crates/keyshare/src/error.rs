// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use ccm_keygen::KeygenError;
use thiserror::Error;

/// Failures of the physical custody token. These are operator-recoverable and reach the caller
/// unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token present")]
    NoTokenPresent,

    #[error("wrong PIN")]
    WrongPin,

    #[error("token is blocked after too many wrong PIN attempts")]
    Blocked,

    #[error("token holds no share")]
    Blank,

    #[error("token content is unreadable: {0}")]
    Unreadable(String),

    #[error("token I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("invalid threshold {threshold} for {parts} parts")]
    InvalidThreshold { threshold: u32, parts: u32 },

    #[error("invalid secret sharing modulus: {0}")]
    InvalidModulus(String),

    #[error("not enough shares: need {required}, found {found}")]
    InsufficientShares { required: usize, found: usize },

    #[error("shares do not belong to the same secret sharing instance")]
    InconsistentShares,

    #[error("share {index} failed its integrity check")]
    CorruptShare { index: u32 },

    #[error("malformed share encoding: {0}")]
    Malformed(String),

    #[error("key material error: {0}")]
    KeyMaterial(#[from] KeygenError),

    #[error(transparent)]
    Token(#[from] TokenError),
}
