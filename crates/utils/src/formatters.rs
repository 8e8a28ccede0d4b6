// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

/// Payloads up to this many bytes are printed in full.
const FULL_BYTES: usize = 48;
/// Bytes kept at each end of a longer payload.
const EDGE_BYTES: usize = 12;

/// Log friendly hex rendering of a public payload. Long payloads keep only their edges and the
/// total length, so mixnet outputs do not flood the logs.
pub struct HexPreview<'a>(pub &'a [u8]);

impl fmt::Display for HexPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0;
        if data.len() <= FULL_BYTES {
            f.write_str("0x")?;
            return write_hex(data, f);
        }
        write!(f, "<{} bytes:0x", data.len())?;
        write_hex(&data[..EDGE_BYTES], f)?;
        f.write_str("..")?;
        write_hex(&data[data.len() - EDGE_BYTES..], f)?;
        f.write_str(">")
    }
}

fn write_hex(data: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    data.iter().try_for_each(|b| write!(f, "{b:02x}"))
}
