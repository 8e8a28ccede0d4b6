// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

// Max messages queued on an actor mailbox
pub const MAILBOX_LIMIT: usize = 256;

// Placeholder printed instead of secret values
pub const REDACTED: &str = "<redacted>";
