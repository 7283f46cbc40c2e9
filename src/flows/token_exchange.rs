//! Step three: redeem a one-time access code for a runner token.

// self
use crate::{
	_prelude::*,
	auth::{AccessCode, RunnerToken, SessionError},
	flows::{self, Bridge},
	obs::FlowKind,
	store::CompareAndSwapOutcome,
};

/// Parameters of the token exchange, accepted from a body or a query string.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenRequest {
	/// One-time access code from the session exchange.
	#[serde(default)]
	pub code: String,
	/// Registered downstream client.
	#[serde(default)]
	pub client_id: String,
	/// Secret of `client_id`.
	#[serde(default)]
	pub client_secret: String,
}
impl Debug for TokenRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("client_id", &self.client_id)
			.field("code_set", &!self.code.is_empty())
			.field("client_secret_set", &!self.client_secret.is_empty())
			.finish()
	}
}

impl Bridge {
	/// Runs the token exchange at the current time.
	pub async fn exchange_token(&self, request: &TokenRequest) -> Result<RunnerToken> {
		self.exchange_token_at(request, OffsetDateTime::now_utc()).await
	}

	/// Consumes the access code and mints the session's runner token.
	///
	/// Unknown, consumed, expired, and concurrently redeemed codes all fail with the same
	/// [`Error::InvalidCode`]. Of several concurrent calls presenting one code, at most one
	/// succeeds.
	pub async fn exchange_token_at(
		&self,
		request: &TokenRequest,
		now: OffsetDateTime,
	) -> Result<RunnerToken> {
		flows::observe(FlowKind::TokenExchange, "exchange_token", async move {
			if request.client_id.is_empty()
				|| request.client_secret.is_empty()
				|| !self.clients.is_valid_client_id(&request.client_id)
				|| !self.clients.is_valid_client_secret(&request.client_id, &request.client_secret)
			{
				return Err(Error::InvalidClientCredentials);
			}

			let code = AccessCode::new(&request.code).map_err(|_| Error::InvalidCode)?;
			let mut session =
				self.store.fetch_by_access_code(&code).await?.ok_or(Error::InvalidCode)?;

			session
				.consume_access_code(&code, now, self.settings.access_code_ttl)
				.map_err(|_| Error::InvalidCode)?;

			let jti = self.codes.generate();
			let token = session
				.generate_runner_token(&self.issuer, &jti, now, self.settings.runner_token_ttl)
				.map_err(|e| match e {
					SessionError::Signing(e) => Error::Config(e),
					_ => Error::InvalidCode,
				})?;

			match self.store.update(Some(&code), session).await? {
				CompareAndSwapOutcome::Updated => Ok(token),
				CompareAndSwapOutcome::CodeMismatch
				| CompareAndSwapOutcome::CodeInUse
				| CompareAndSwapOutcome::Missing => Err(Error::InvalidCode),
			}
		})
		.await
	}
}
