//! Session persistence contracts and the built-in store implementations.

pub mod file;
pub mod memory;

mod index;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccessCode, Session, SessionId},
};

/// Boxed future returned by every [`SessionStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for bridge sessions.
///
/// Implementations index sessions by id and by their current access code. Updates are a
/// compare-and-swap on the access code so that a code is consumed at most once, and locking is
/// per record rather than store-wide.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Persists a new session.
	///
	/// Fails with [`StoreError::Duplicate`] when the id, or the session's access code, is already
	/// taken.
	fn create(&self, session: Session) -> StoreFuture<'_, ()>;

	/// Fetches a session by id.
	fn fetch<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>>;

	/// Fetches the session whose current access code equals `code`.
	///
	/// Once a code has been replaced or cleared this never returns a session for it again.
	fn fetch_by_access_code<'a>(
		&'a self,
		code: &'a AccessCode,
	) -> StoreFuture<'a, Option<Session>>;

	/// Replaces the stored session with `replacement` if its access code still equals
	/// `expected_code`.
	///
	/// A backend error leaves the last committed state in place.
	fn update<'a>(
		&'a self,
		expected_code: Option<&'a AccessCode>,
		replacement: Session,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Result of an access-code compare-and-swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The expected code matched and the session was replaced.
	Updated,
	/// The session exists but its current code differs from the expected one.
	CodeMismatch,
	/// The replacement's code is already attached to another session.
	CodeInUse,
	/// No session with the replacement's id exists.
	Missing,
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Encoding or decoding a stored session failed.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A unique id or access code collided with an existing one.
	#[error("Duplicate entry: {message}.")]
	Duplicate {
		/// Human-readable error payload.
		message: String,
	},
}
