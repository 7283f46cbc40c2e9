//! Dual session/code index shared by the built-in stores.
//!
//! Lock order is always `sessions` then `codes`; a `codes` guard is never held while touching
//! `sessions`.

// crates.io
use dashmap::{DashMap, mapref::entry::Entry};
// self
use crate::{
	auth::{AccessCode, Session, SessionId},
	store::{CompareAndSwapOutcome, StoreError},
};

#[derive(Debug, Default)]
pub(crate) struct SessionIndex {
	sessions: DashMap<SessionId, Session>,
	codes: DashMap<AccessCode, SessionId>,
}
impl SessionIndex {
	pub(crate) fn len(&self) -> usize {
		self.sessions.len()
	}

	/// Inserts a new session, running `persist` while the id slot is held.
	pub(crate) fn create<F>(&self, session: Session, persist: F) -> Result<(), StoreError>
	where
		F: FnOnce(&Session) -> Result<(), StoreError>,
	{
		let Entry::Vacant(slot) = self.sessions.entry(session.id().clone()) else {
			return Err(StoreError::Duplicate { message: format!("session {}", session.id()) });
		};
		let reserved = match session.access_code() {
			Some(code) => {
				self.reserve(code, session.id())?;

				Some(code.clone())
			},
			None => None,
		};

		if let Err(e) = persist(&session) {
			if let Some(code) = reserved {
				self.release(&code, session.id());
			}

			return Err(e);
		}

		slot.insert(session);

		Ok(())
	}

	pub(crate) fn fetch(&self, id: &SessionId) -> Option<Session> {
		self.sessions.get(id).map(|session| session.value().clone())
	}

	pub(crate) fn fetch_by_access_code(&self, code: &AccessCode) -> Option<Session> {
		let owner = self.codes.get(code).map(|owner| owner.value().clone())?;
		let session = self.fetch(&owner)?;

		// The code may have been swapped out between the two lookups.
		(session.access_code() == Some(code)).then_some(session)
	}

	/// Compare-and-swap on the access code, running `persist` before committing in memory.
	pub(crate) fn update<F>(
		&self,
		expected_code: Option<&AccessCode>,
		replacement: Session,
		persist: F,
	) -> Result<CompareAndSwapOutcome, StoreError>
	where
		F: FnOnce(&Session) -> Result<(), StoreError>,
	{
		let Some(mut current) = self.sessions.get_mut(replacement.id()) else {
			return Ok(CompareAndSwapOutcome::Missing);
		};

		if current.access_code() != expected_code {
			return Ok(CompareAndSwapOutcome::CodeMismatch);
		}

		let incoming = replacement.access_code().filter(|code| current.access_code() != Some(*code));

		if let Some(code) = incoming {
			if self.reserve(code, replacement.id()).is_err() {
				return Ok(CompareAndSwapOutcome::CodeInUse);
			}
		}
		if let Err(e) = persist(&replacement) {
			if let Some(code) = incoming {
				self.release(code, replacement.id());
			}

			return Err(e);
		}
		let outgoing =
			current.access_code().filter(|code| replacement.access_code() != Some(*code));

		if let Some(code) = outgoing {
			self.release(code, replacement.id());
		}

		*current = replacement;

		Ok(CompareAndSwapOutcome::Updated)
	}

	/// Loads a session read back from durable storage.
	pub(crate) fn restore(&self, session: Session) -> Result<(), StoreError> {
		self.create(session, |_| Ok(()))
	}

	fn reserve(&self, code: &AccessCode, owner: &SessionId) -> Result<(), StoreError> {
		match self.codes.entry(code.clone()) {
			Entry::Occupied(_) =>
				Err(StoreError::Duplicate { message: format!("access code for session {owner}") }),
			Entry::Vacant(slot) => {
				slot.insert(owner.clone());

				Ok(())
			},
		}
	}

	fn release(&self, code: &AccessCode, owner: &SessionId) {
		self.codes.remove_if(code, |_, current| current == owner);
	}
}
