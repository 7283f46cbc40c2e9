// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per attempt, success, and failure of a bridge step.
pub const FLOW_COUNTER: &str = "idp_bridge_flow_total";

/// Increments [`FLOW_COUNTER`] labeled with `flow` and `outcome`; a no-op without `metrics`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
