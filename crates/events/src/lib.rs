// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod broadcast_aggregator_message;
mod correlation_id;
mod ids;
mod mixdec_payload;
pub use broadcast_aggregator_message::*;
pub use correlation_id::*;
pub use ids::*;
pub use mixdec_payload::*;
