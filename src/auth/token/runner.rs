//! Runner tokens: the RS256 credentials handed to downstream applications.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Token type reported alongside every runner token.
pub const BEARER: &str = "Bearer";

/// Signed credential issued by the token exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerToken {
	/// Compact JWS; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Always [`BEARER`].
	pub token_type: String,
	/// Issued-at instant stamped into the `iat` claim.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Expiry instant stamped into the `exp` claim.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl RunnerToken {
	/// Seconds left until expiry at `now`, floored at zero.
	pub fn expires_in_at(&self, now: OffsetDateTime) -> i64 {
		(self.expires_at - now).whole_seconds().max(0)
	}
}

/// Claim set written into runner tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerClaims {
	/// Identity-provider subject, or the session id when the provider supplied none.
	pub sub: String,
	/// Bridge session that minted the token.
	pub sid: String,
	/// Unique token identifier.
	pub jti: String,
	/// Issued-at (Unix seconds).
	pub iat: i64,
	/// Expiry (Unix seconds).
	pub exp: i64,
	/// Issuer, when configured.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
}

/// Signs runner tokens with the bridge's RSA private key.
#[derive(Clone)]
pub struct RunnerTokenIssuer {
	key: EncodingKey,
	issuer: Option<String>,
}
impl RunnerTokenIssuer {
	/// Wraps an already-parsed RSA encoding key.
	pub fn new(key: EncodingKey) -> Self {
		Self { key, issuer: None }
	}

	/// Parses a PEM encoded RSA private key (PKCS#1 or PKCS#8).
	pub fn from_rsa_pem(pem: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
		let key = EncodingKey::from_rsa_pem(pem.as_ref())
			.map_err(|source| ConfigError::InvalidKey { purpose: "signing", source })?;

		Ok(Self::new(key))
	}

	/// Sets the `iss` claim stamped into every token.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Configured issuer, if any.
	pub fn issuer(&self) -> Option<&str> {
		self.issuer.as_deref()
	}

	/// Signs a token for `subject` that is valid from `issued_at` until `expires_at`.
	pub fn issue(
		&self,
		subject: &str,
		session_id: &str,
		jti: &str,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Result<RunnerToken, ConfigError> {
		let claims = RunnerClaims {
			sub: subject.to_owned(),
			sid: session_id.to_owned(),
			jti: jti.to_owned(),
			iat: issued_at.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			iss: self.issuer.clone(),
		};
		let access_token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
			.map_err(ConfigError::Signing)?;

		Ok(RunnerToken {
			access_token: TokenSecret::new(access_token),
			token_type: BEARER.into(),
			issued_at,
			expires_at,
		})
	}
}
impl Debug for RunnerTokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RunnerTokenIssuer").field("issuer", &self.issuer).finish()
	}
}
