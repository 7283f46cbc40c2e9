//! Step one: validate the client, make sure an identity-provider session exists, and open a
//! bridge session.

// self
use crate::{
	_prelude::*,
	auth::{Session, SessionId},
	flows::{self, Bridge},
	idp::{IdpError, IdpRequest},
	obs::FlowKind,
	settings::SessionCookie,
};

/// Query parameters of the authorization step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	/// Registered downstream client.
	#[serde(default)]
	pub client_id: String,
	/// Requested scopes, passed through unvalidated.
	#[serde(default)]
	pub scopes: String,
	/// Opaque caller state echoed back unmodified.
	#[serde(default)]
	pub state: String,
}

/// What the transport should do after the authorization step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationOutcome {
	/// No identity-provider session yet: send the browser to the provider.
	StartIdentityFlow {
		/// Provider login location.
		location: Url,
	},
	/// A bridge session was opened.
	SessionCreated {
		/// Id of the new session.
		session_id: SessionId,
		/// Cookie binding the browser to the session.
		cookie: SessionCookie,
		/// Relative location of the session-exchange step.
		redirect: String,
	},
}

impl Bridge {
	/// Runs the authorization step at the current time.
	pub async fn authorize(
		&self,
		request: &AuthorizationRequest,
		idp_request: &IdpRequest,
	) -> Result<AuthorizationOutcome> {
		self.authorize_at(request, idp_request, OffsetDateTime::now_utc()).await
	}

	/// Runs the authorization step as of `now`.
	///
	/// No session is created unless the client is registered, the identity provider reports a
	/// session, and a readable, unexpired backend token accompanies the request.
	pub async fn authorize_at(
		&self,
		request: &AuthorizationRequest,
		idp_request: &IdpRequest,
		now: OffsetDateTime,
	) -> Result<AuthorizationOutcome> {
		flows::observe(FlowKind::Authorization, "authorize", async move {
			if !self.clients.is_valid_client_id(&request.client_id) {
				return Err(Error::InvalidClient);
			}

			let idp_session = match self.identity_provider.session(idp_request).await {
				Ok(session) => session,
				Err(IdpError::NoSession) => {
					let location = self.identity_provider.start_auth_flow(idp_request).await?;

					return Ok(AuthorizationOutcome::StartIdentityFlow { location });
				},
				Err(e) => return Err(e.into()),
			};
			let raw_backend_token = idp_request
				.cookie(&self.settings.backend_token_cookie_name)
				.filter(|value| !value.is_empty())
				.ok_or(Error::MissingBackendToken)?;
			let backend_token = self
				.backend_tokens
				.read(raw_backend_token, now)
				.map_err(|_| Error::MissingBackendToken)?;
			let session =
				Session::new(SessionId::generate(), idp_session.subject, backend_token, now);
			let session_id = session.id().clone();

			self.store.create(session).await?;

			Ok(AuthorizationOutcome::SessionCreated {
				cookie: self.settings.session_cookie(session_id.to_string()),
				redirect: self.settings.session_exchange_redirect(&request.state),
				session_id,
			})
		})
		.await
	}
}
