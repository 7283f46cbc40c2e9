//! Backend tokens handed over by the identity provider integration.

// self
use crate::{
	_prelude::*,
	auth::{
		Claims, TokenSecret, TokenVerifier, VerifyError,
		verifier::{self, decode_segment, split_compact},
	},
};

/// Opaque credential issued by the trusted backend at login time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendToken {
	/// Raw token value; never logged.
	pub value: TokenSecret,
	/// Instant after which the backend no longer honours the token.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl BackendToken {
	/// Wraps a raw token and its expiry.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: TokenSecret::new(value), expires_at }
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Strategy for turning the backend-token cookie into a [`BackendToken`].
#[derive(Clone, Debug, Default)]
pub enum BackendTokenReader {
	/// Read `exp` from the JWT payload without checking the signature.
	///
	/// Appropriate when the cookie is only ever written by the identity provider integration on
	/// the same origin.
	#[default]
	Unverified,
	/// Fully verify the backend JWT against the backend's public key first.
	Trusted(TokenVerifier),
}
impl BackendTokenReader {
	/// Parses the raw cookie value, rejecting unreadable or already-expired tokens.
	pub fn read(&self, raw: &str, now: OffsetDateTime) -> Result<BackendToken, VerifyError> {
		let expires_at = match self {
			Self::Trusted(verifier) => verifier::expiry(&verifier.verify_at(raw, now)?)?,
			Self::Unverified => {
				let [_, payload, _] = split_compact(raw)?;
				let claims: Claims = decode_segment(payload)
					.ok_or(VerifyError::MalformedClaims { reason: "payload is not a JSON object" })?;
				let expires_at = verifier::expiry(&claims)?;

				if now >= expires_at {
					return Err(VerifyError::TokenExpired { expired_at: expires_at });
				}

				expires_at
			},
		};

		Ok(BackendToken::new(raw, expires_at))
	}
}
