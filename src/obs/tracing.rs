//! Span and event plumbing for bridge steps.
//!
//! Without the `tracing` feature every type here is zero-cost and every call is a no-op; the
//! step kind and stage are still kept on [`FlowSpan`] so callers can inspect them.

// self
use crate::{_prelude::*, error::ErrorKind, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`].
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// The `idp_bridge.flow` span wrapped around one bridge step.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	stage: &'static str,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span carrying `flow = kind` and `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			kind,
			stage,
			#[cfg(feature = "tracing")]
			span: tracing::info_span!("idp_bridge.flow", flow = kind.as_str(), stage),
		}
	}

	/// Step this span covers.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Call site recorded in the `stage` field.
	pub fn stage(&self) -> &'static str {
		self.stage
	}

	/// Enters the span until the returned guard drops. Synchronous code only.
	pub fn entered(self) -> FlowSpanGuard {
		FlowSpanGuard {
			#[cfg(feature = "tracing")]
			_guard: self.span.entered(),
		}
	}

	/// Attaches the span to `fut` so it is entered on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Level at which a failed step is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureSeverity {
	/// Bridge-side fault: storage, signing, configuration.
	Error,
	/// The identity provider failed.
	Warn,
	/// The caller sent something unusable.
	Debug,
}
impl FailureSeverity {
	/// Picks the severity for `error`.
	pub fn of(error: &Error) -> Self {
		match error.kind() {
			ErrorKind::Server => Self::Error,
			ErrorKind::IdentityProvider => Self::Warn,
			ErrorKind::Client | ErrorKind::Unauthorized => Self::Debug,
		}
	}
}

/// Emits one failure event for `kind` at [`FailureSeverity::of`] the error.
///
/// Only the error's `Display` output is recorded; secrets never reach it.
pub fn log_flow_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		let flow = kind.as_str();

		match FailureSeverity::of(error) {
			FailureSeverity::Error => tracing::error!(flow, %error, "Bridge step failed."),
			FailureSeverity::Warn => tracing::warn!(flow, %error, "Bridge step failed."),
			FailureSeverity::Debug => tracing::debug!(flow, %error, "Bridge step rejected."),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, FailureSeverity::of(error));
	}
}
