//! Step two: swap the session cookie for a one-time access code.

// self
use crate::{
	_prelude::*,
	auth::SessionId,
	flows::{self, Bridge},
	obs::FlowKind,
	store::{CompareAndSwapOutcome, StoreError},
};

const UPDATE_ATTEMPTS: usize = 5;

/// Inputs of the session-exchange step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionExchangeRequest {
	/// Opaque caller state echoed back unmodified.
	pub state: String,
	/// Value of the session cookie, if the browser sent one.
	pub session_cookie: Option<String>,
}

impl Bridge {
	/// Runs the session exchange at the current time.
	pub async fn exchange_session(&self, request: &SessionExchangeRequest) -> Result<Url> {
		self.exchange_session_at(request, OffsetDateTime::now_utc()).await
	}

	/// Attaches a fresh access code to the session and returns the downstream redirect.
	///
	/// Any code previously attached to the session stops working.
	pub async fn exchange_session_at(
		&self,
		request: &SessionExchangeRequest,
		now: OffsetDateTime,
	) -> Result<Url> {
		flows::observe(FlowKind::SessionExchange, "exchange_session", async move {
			let session_id = request
				.session_cookie
				.as_deref()
				.and_then(|value| SessionId::new(value).ok())
				.ok_or(Error::MissingSession)?;
			let mut current =
				self.store.fetch(&session_id).await?.ok_or(Error::UnknownSession)?;

			// A mismatch means another exchange attached its code first; retry on its result.
			for _ in 0..UPDATE_ATTEMPTS {
				let expected = current.access_code().cloned();
				let code = self.codes.generate();
				let mut replacement = current.clone();

				replacement.set_access_code(code.clone(), now).map_err(|_| Error::UnknownSession)?;

				match self.store.update(expected.as_ref(), replacement).await? {
					CompareAndSwapOutcome::Updated =>
						return Ok(self.settings.downstream_redirect(&code, &request.state)),
					CompareAndSwapOutcome::CodeMismatch =>
						current =
							self.store.fetch(&session_id).await?.ok_or(Error::UnknownSession)?,
					CompareAndSwapOutcome::Missing => return Err(Error::UnknownSession),
					CompareAndSwapOutcome::CodeInUse => continue,
				}
			}

			Err(StoreError::Backend {
				message: "access code could not be attached after repeated attempts".into(),
			}
			.into())
		})
		.await
	}
}
