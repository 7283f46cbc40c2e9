//! Durable [`SessionStore`] writing one JSON document per session.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{AccessCode, Session, SessionId},
	store::{CompareAndSwapOutcome, SessionStore, StoreError, StoreFuture, index::SessionIndex},
};

const EXTENSION: &str = "json";

/// Stores each session as `<dir>/<encoded id>.json`.
///
/// Writes go to a temporary file that is synced and renamed over the target, so a failed write
/// leaves the previous document intact. Indexes are rebuilt from the directory on [`open`].
///
/// [`open`]: FileStore::open
#[derive(Clone, Debug)]
pub struct FileStore {
	dir: PathBuf,
	index: Arc<SessionIndex>,
}
impl FileStore {
	/// Opens (or creates) a store rooted at `dir`, loading every stored session.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let dir = dir.into();

		fs::create_dir_all(&dir).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", dir.display()),
		})?;

		let index = SessionIndex::default();
		let entries = fs::read_dir(&dir).map_err(|e| StoreError::Backend {
			message: format!("Failed to list {}: {e}", dir.display()),
		})?;

		for entry in entries {
			let path = entry
				.map_err(|e| StoreError::Backend {
					message: format!("Failed to list {}: {e}", dir.display()),
				})?
				.path();

			if path.extension().is_some_and(|ext| ext == EXTENSION) {
				index.restore(Self::load(&path)?)?;
			}
		}

		Ok(Self { dir, index: Arc::new(index) })
	}

	/// Directory backing the store.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Number of stored sessions.
	pub fn len(&self) -> usize {
		self.index.len()
	}

	/// Returns `true` when no session has been stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn load(path: &Path) -> Result<Session, StoreError> {
		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {} at {}: {}", path.display(), e.path(), e.inner()),
		})
	}

	fn path_for(&self, id: &SessionId) -> PathBuf {
		self.dir.join(format!("{}.{EXTENSION}", URL_SAFE_NO_PAD.encode(id.as_bytes())))
	}

	fn persist(&self, session: &Session) -> Result<(), StoreError> {
		let path = self.path_for(session.id());
		let serialized = serde_json::to_vec_pretty(session).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize session {}: {e}", session.id()),
		})?;
		let tmp_path = path.with_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| {
			let _ = fs::remove_file(&tmp_path);

			StoreError::Backend { message: format!("Failed to replace {}: {e}", path.display()) }
		})
	}
}
impl SessionStore for FileStore {
	fn create(&self, session: Session) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.index.create(session, |session| self.persist(session)) })
	}

	fn fetch<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.index.fetch(id)) })
	}

	fn fetch_by_access_code<'a>(
		&'a self,
		code: &'a AccessCode,
	) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.index.fetch_by_access_code(code)) })
	}

	fn update<'a>(
		&'a self,
		expected_code: Option<&'a AccessCode>,
		replacement: Session,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.index.update(expected_code, replacement, |session| self.persist(session))
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::BackendToken;

	fn temp_dir() -> PathBuf {
		let unique = format!(
			"idp_bridge_file_store_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn session(id: &str) -> Session {
		let now = macros::datetime!(2030-01-01 00:00 UTC);

		Session::new(
			SessionId::new(id).expect("Session id fixture should be valid."),
			None,
			BackendToken::new("backend", now + Duration::hours(1)),
			now,
		)
	}

	#[test]
	fn sessions_and_codes_survive_reopen() {
		let dir = temp_dir();
		let store = FileStore::open(&dir).expect("Failed to open file store directory.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let code = AccessCode::new("code-1").expect("Access code fixture should be valid.");
		let mut stored = session("../escape");

		rt.block_on(store.create(stored.clone())).expect("Failed to create session.");
		stored
			.set_access_code(code.clone(), macros::datetime!(2030-01-01 00:01 UTC))
			.expect("Code should attach.");

		let outcome =
			rt.block_on(store.update(None, stored.clone())).expect("Failed to update session.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);
		assert!(store.path_for(stored.id()).starts_with(&dir));
		drop(store);

		let reopened = FileStore::open(&dir).expect("Failed to reopen file store directory.");
		let fetched = rt
			.block_on(reopened.fetch_by_access_code(&code))
			.expect("Failed to fetch session by code.")
			.expect("File store lost session after reopen.");

		assert_eq!(fetched, stored);
		assert_eq!(reopened.len(), 1);

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store directory {}: {e}", dir.display())
		});
	}

	#[test]
	fn corrupt_documents_report_their_path() {
		let dir = temp_dir();

		fs::create_dir_all(&dir).expect("Failed to create temporary directory.");
		fs::write(dir.join("broken.json"), br#"{"id":"s","backend_token":{"value":"v"}}"#)
			.expect("Failed to write corrupt document.");

		let err = FileStore::open(&dir).expect_err("Corrupt document should fail to load.");

		assert!(matches!(
			&err,
			StoreError::Serialization { message } if message.contains("backend_token")
		));

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store directory {}: {e}", dir.display())
		});
	}
}
