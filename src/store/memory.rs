//! Thread-safe in-memory [`SessionStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccessCode, Session, SessionId},
	store::{CompareAndSwapOutcome, SessionStore, StoreFuture, index::SessionIndex},
};

/// Keeps sessions in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<SessionIndex>);
impl MemoryStore {
	/// Number of stored sessions.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no session has been stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl SessionStore for MemoryStore {
	fn create(&self, session: Session) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.0.create(session, |_| Ok(())) })
	}

	fn fetch<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.0.fetch(id)) })
	}

	fn fetch_by_access_code<'a>(
		&'a self,
		code: &'a AccessCode,
	) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.0.fetch_by_access_code(code)) })
	}

	fn update<'a>(
		&'a self,
		expected_code: Option<&'a AccessCode>,
		replacement: Session,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move { self.0.update(expected_code, replacement, |_| Ok(())) })
	}
}
