//! One-time access code generation.

// crates.io
use uuid::Uuid;
// self
use crate::auth::AccessCode;

/// Source of globally unique, time-sortable opaque codes.
pub trait CodeGenerator
where
	Self: Send + Sync,
{
	/// Produces a fresh code that has never been returned before.
	fn generate(&self) -> AccessCode;
}

/// UUIDv7-backed generator; codes sort by creation time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeOrderedCodeGenerator;
impl CodeGenerator for TimeOrderedCodeGenerator {
	fn generate(&self) -> AccessCode {
		AccessCode::from_generated(Uuid::now_v7().simple().to_string())
	}
}
