//! Bridge session record and the transitions applied to it by the flows.

// self
use crate::{
	_prelude::*,
	auth::{AccessCode, BackendToken, RunnerToken, RunnerTokenIssuer, SessionId},
	error::ConfigError,
};

/// Access code currently attached to a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAccessCode {
	/// The one-time code.
	pub code: AccessCode,
	/// When the session exchange minted it.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
}

/// Reasons a session transition was refused.
#[derive(Debug, ThisError)]
pub enum SessionError {
	/// A runner token was already minted; the session accepts no further codes.
	#[error("Session has already been redeemed.")]
	AlreadyRedeemed,
	/// The presented code is not the session's current code.
	#[error("Access code does not match the session.")]
	CodeMismatch,
	/// The code outlived its time-to-live.
	#[error("Access code expired at {expired_at}.")]
	CodeExpired {
		/// Instant the code stopped being accepted.
		expired_at: OffsetDateTime,
	},
	/// The backend token the runner token would derive from has expired.
	#[error("Backend token expired at {expired_at}.")]
	BackendTokenExpired {
		/// Backend token expiry.
		expired_at: OffsetDateTime,
	},
	/// Signing the runner token failed.
	#[error(transparent)]
	Signing(#[from] ConfigError),
}

/// One completed identity-provider login that entered the bridge.
///
/// Sessions are owned by the store. Flows work on a cloned value, apply transitions, and write
/// the result back through [`SessionStore::update`](crate::store::SessionStore::update).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	id: SessionId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	subject: Option<String>,
	backend_token: BackendToken,
	#[serde(with = "time::serde::rfc3339")]
	created_at: OffsetDateTime,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access_code: Option<IssuedAccessCode>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	runner_token: Option<RunnerToken>,
}
impl Session {
	/// Creates a fresh session with no access code and no runner token.
	pub fn new(
		id: SessionId,
		subject: Option<String>,
		backend_token: BackendToken,
		created_at: OffsetDateTime,
	) -> Self {
		Self { id, subject, backend_token, created_at, access_code: None, runner_token: None }
	}

	/// Session identifier (also the cookie value).
	pub fn id(&self) -> &SessionId {
		&self.id
	}

	/// Subject reported by the identity provider, if any.
	pub fn subject(&self) -> Option<&str> {
		self.subject.as_deref()
	}

	/// Backend token captured at creation.
	pub fn backend_token(&self) -> &BackendToken {
		&self.backend_token
	}

	/// Creation instant.
	pub fn created_at(&self) -> OffsetDateTime {
		self.created_at
	}

	/// Current one-time code, if one is outstanding.
	pub fn access_code(&self) -> Option<&AccessCode> {
		self.access_code.as_ref().map(|issued| &issued.code)
	}

	/// Current code together with its issue instant.
	pub fn issued_access_code(&self) -> Option<&IssuedAccessCode> {
		self.access_code.as_ref()
	}

	/// Runner token minted by a successful token exchange.
	pub fn runner_token(&self) -> Option<&RunnerToken> {
		self.runner_token.as_ref()
	}

	/// Attaches a new one-time code, discarding any previous one.
	pub fn set_access_code(
		&mut self,
		code: AccessCode,
		now: OffsetDateTime,
	) -> Result<(), SessionError> {
		if self.runner_token.is_some() {
			return Err(SessionError::AlreadyRedeemed);
		}

		self.access_code = Some(IssuedAccessCode { code, issued_at: now });

		Ok(())
	}

	/// Clears the code if `presented` matches it and it is younger than `ttl`.
	///
	/// The session is left untouched on failure.
	pub fn consume_access_code(
		&mut self,
		presented: &AccessCode,
		now: OffsetDateTime,
		ttl: Duration,
	) -> Result<AccessCode, SessionError> {
		let Some(issued) = self.access_code.as_ref() else {
			return Err(SessionError::CodeMismatch);
		};

		if &issued.code != presented {
			return Err(SessionError::CodeMismatch);
		}

		let expired_at = issued.issued_at + ttl;

		if now >= expired_at {
			return Err(SessionError::CodeExpired { expired_at });
		}

		self.access_code.take().map(|issued| issued.code).ok_or(SessionError::CodeMismatch)
	}

	/// Mints the runner token for this session.
	///
	/// Expiry is the backend token's expiry, shortened to `now + max_ttl` when a cap is given.
	pub fn generate_runner_token(
		&mut self,
		issuer: &RunnerTokenIssuer,
		jti: &str,
		now: OffsetDateTime,
		max_ttl: Option<Duration>,
	) -> Result<RunnerToken, SessionError> {
		if self.runner_token.is_some() {
			return Err(SessionError::AlreadyRedeemed);
		}
		if self.backend_token.is_expired_at(now) {
			return Err(SessionError::BackendTokenExpired {
				expired_at: self.backend_token.expires_at,
			});
		}

		let expires_at = match max_ttl {
			Some(ttl) => self.backend_token.expires_at.min(now + ttl),
			None => self.backend_token.expires_at,
		};
		let subject = self.subject.as_deref().unwrap_or(self.id.as_ref());
		let token = issuer.issue(subject, &self.id, jti, now, expires_at)?;

		self.runner_token = Some(token.clone());

		Ok(token)
	}
}
