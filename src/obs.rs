//! Optional observability helpers for the bridge flows.
//!
//! # Feature Flags
//!
//! - `tracing`: each step runs in an `idp_bridge.flow` span with `flow` and `stage` fields;
//!   failures are reported by [`log_flow_failure`] at their [`FailureSeverity`].
//! - `metrics`: [`FLOW_COUNTER`] counts attempts, successes, and failures per `flow` and
//!   `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Bridge steps observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Step one: client check, identity-provider session, session creation.
	Authorization,
	/// Step two: session cookie swapped for a one-time code.
	SessionExchange,
	/// Step three: code and client credentials swapped for a runner token.
	TokenExchange,
	/// Out-of-band verification of an issued token.
	Verification,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorization => "authorization",
			FlowKind::SessionExchange => "session_exchange",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::Verification => "verification",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a bridge step.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
