//! Bridge-level error types shared across flows, stores, and transports.

// self
use crate::{_prelude::*, idp::IdpError};

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical bridge error exposed by public APIs.
///
/// Variants that describe session or code lookups intentionally carry no detail so callers
/// cannot distinguish an unknown value from a consumed or expired one.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider reported a failure other than "no session".
	#[error("Identity provider failure: {0}")]
	IdentityProvider(#[source] IdpError),

	/// The `client_id` supplied to the authorization step is not registered.
	#[error("Invalid client_id.")]
	InvalidClient,
	/// The client id or secret presented to the token exchange is not valid.
	#[error("Invalid client_id or client_secret.")]
	InvalidClientCredentials,
	/// No usable session cookie accompanied the request.
	#[error("Session cookie is missing.")]
	MissingSession,
	/// The session cookie does not match a stored session.
	#[error("Session is unknown.")]
	UnknownSession,
	/// The access code is unknown, already consumed, or expired.
	#[error("Access code is invalid.")]
	InvalidCode,
	/// The identity provider session exists but no backend token accompanied it.
	#[error("Backend token is missing or unreadable.")]
	MissingBackendToken,
}
impl Error {
	/// Classifies the error for transports that need a single status mapping.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::InvalidClient
			| Error::InvalidClientCredentials
			| Error::MissingSession
			| Error::UnknownSession
			| Error::InvalidCode => ErrorKind::Client,
			Error::MissingBackendToken => ErrorKind::Unauthorized,
			Error::IdentityProvider(_) => ErrorKind::IdentityProvider,
			Error::Storage(_) | Error::Config(_) => ErrorKind::Server,
		}
	}
}
impl From<IdpError> for Error {
	fn from(e: IdpError) -> Self {
		Self::IdentityProvider(e)
	}
}

/// Coarse error classes used to pick a response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Caller supplied invalid input (HTTP 400).
	Client,
	/// Caller is not authenticated (HTTP 401).
	Unauthorized,
	/// The identity provider presents the failure itself.
	IdentityProvider,
	/// Internal failure (HTTP 500).
	Server,
}

/// Configuration and startup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// RSA key material could not be parsed.
	#[error("The {purpose} key is not a valid RSA PEM.")]
	InvalidKey {
		/// Which key failed to load.
		purpose: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Runner token could not be signed.
	#[error("Runner token could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
	/// Settings failed validation.
	#[error(transparent)]
	Settings(#[from] crate::settings::SettingsError),
}
