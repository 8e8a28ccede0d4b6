// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

use crate::MixDecStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("illegal mix-decrypt status transition {from} -> {to}")]
    IllegalTransition { from: MixDecStatus, to: MixDecStatus },
}
