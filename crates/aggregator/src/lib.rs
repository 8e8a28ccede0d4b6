// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod actors;
mod error;
mod quorum;
mod response_aggregator;
mod session;
mod store;
pub use actors::*;
pub use error::*;
pub use quorum::*;
pub use response_aggregator::*;
pub use session::{Outcome, Registration, SessionResolved, SessionScope, SessionSnapshot};
pub use store::*;
