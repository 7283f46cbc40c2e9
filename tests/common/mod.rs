#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use time::{Duration, OffsetDateTime, macros};
use tokio::sync::Barrier;
// self
use idp_bridge::{
	auth::{
		AccessCode, ClientId, RunnerTokenIssuer, Session, SessionId, StaticClientRegistry,
		TokenVerifier,
	},
	flows::{AuthorizationOutcome, AuthorizationRequest, Bridge, SessionExchangeRequest},
	idp::{IdentityProvider, IdpError, IdpErrorResponse, IdpFuture, IdpRequest, IdpSession},
	settings::BridgeSettings,
	store::{CompareAndSwapOutcome, MemoryStore, SessionStore, StoreFuture},
	url::Url,
};

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const VERIFYING_KEY: &str = include_str!("../fixtures/signing_key.pub.pem");
pub const UNTRUSTED_KEY: &str = include_str!("../fixtures/untrusted_key.pem");

pub const CLIENT_ID: &str = "abc123";
pub const CLIENT_SECRET: &str = "s3cret";
pub const IDP_COOKIE: &str = "idp_session";
pub const IDP_LOGIN: &str = "https://idp.example.com/sso";
pub const CALLBACK: &str =
	"https://app.example.com/accounts/runner/apps/saml/login/callback/bifrost/";

/// Identity provider that trusts an `idp_session` cookie whose value is the subject.
///
/// The value `broken` simulates a provider failure.
#[derive(Debug, Default)]
pub struct CookieIdentityProvider;
impl IdentityProvider for CookieIdentityProvider {
	fn session<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, IdpSession> {
		Box::pin(async move {
			match request.cookie(IDP_COOKIE) {
				None | Some("") => Err(IdpError::NoSession),
				Some("broken") => Err(IdpError::Provider { message: "assertion rejected".into() }),
				Some(subject) => Ok(IdpSession { subject: Some(subject.to_owned()) }),
			}
		})
	}

	fn start_auth_flow<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, Url> {
		Box::pin(async move {
			let mut location = Url::parse(IDP_LOGIN)
				.map_err(|e| IdpError::Provider { message: e.to_string() })?;

			location.query_pairs_mut().append_pair("RelayState", &request.request_uri);

			Ok(location)
		})
	}

	fn on_error(&self, _request: &IdpRequest, error: &IdpError) -> IdpErrorResponse {
		IdpErrorResponse { status: 502, body: format!("Identity provider failure: {error}") }
	}
}

/// Memory store whose next `parties` updates wait for each other once [`GatedStore::arm`] runs.
///
/// Every gated caller has finished its reads before any of them commits, which forces the
/// compare-and-swap paths that sequential scheduling would never reach.
#[derive(Debug)]
pub struct GatedStore {
	inner: MemoryStore,
	barrier: Barrier,
	parties: usize,
	gated: AtomicUsize,
}
impl GatedStore {
	pub fn new(parties: usize) -> Self {
		Self {
			inner: MemoryStore::default(),
			barrier: Barrier::new(parties),
			parties,
			gated: AtomicUsize::new(0),
		}
	}

	pub fn arm(&self) {
		self.gated.store(self.parties, Ordering::SeqCst);
	}
}
impl SessionStore for GatedStore {
	fn create(&self, session: Session) -> StoreFuture<'_, ()> {
		self.inner.create(session)
	}

	fn fetch<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<Session>> {
		self.inner.fetch(id)
	}

	fn fetch_by_access_code<'a>(
		&'a self,
		code: &'a AccessCode,
	) -> StoreFuture<'a, Option<Session>> {
		self.inner.fetch_by_access_code(code)
	}

	fn update<'a>(
		&'a self,
		expected_code: Option<&'a AccessCode>,
		replacement: Session,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let gated = self
				.gated
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
				.is_ok();

			if gated {
				self.barrier.wait().await;
			}

			self.inner.update(expected_code, replacement).await
		})
	}
}

pub fn now() -> OffsetDateTime {
	macros::datetime!(2030-01-01 12:00 UTC)
}

pub fn settings() -> BridgeSettings {
	BridgeSettings::builder(Url::parse(CALLBACK).expect("Callback fixture should parse."))
		.build()
		.expect("Default settings should validate.")
}

pub fn clients() -> StaticClientRegistry {
	StaticClientRegistry::new().with_client(
		ClientId::new(CLIENT_ID).expect("Client id fixture should be valid."),
		CLIENT_SECRET,
	)
}

pub fn issuer() -> RunnerTokenIssuer {
	RunnerTokenIssuer::from_rsa_pem(SIGNING_KEY).expect("Signing fixture key should parse.")
}

pub fn verifier() -> TokenVerifier {
	TokenVerifier::from_rsa_pem(VERIFYING_KEY).expect("Verifying fixture key should parse.")
}

pub fn bridge_with_settings(store: Arc<dyn SessionStore>, settings: BridgeSettings) -> Bridge {
	Bridge::new(store, Arc::new(CookieIdentityProvider), Arc::new(clients()), issuer(), settings)
		.expect("Bridge fixture should accept validated settings.")
}

pub fn bridge(store: Arc<dyn SessionStore>) -> Bridge {
	bridge_with_settings(store, settings())
}

/// Backend JWT as the identity provider integration would set it.
pub fn backend_jwt(exp: OffsetDateTime) -> String {
	let key = EncodingKey::from_rsa_pem(UNTRUSTED_KEY.as_bytes())
		.expect("Backend fixture key should parse.");

	jsonwebtoken::encode(
		&Header::new(Algorithm::RS256),
		&json!({ "sub": "backend-user", "exp": exp.unix_timestamp() }),
		&key,
	)
	.expect("Backend fixture token should sign.")
}

/// Browser request carrying an identity-provider session and a backend token valid for an hour.
pub fn logged_in_request() -> IdpRequest {
	IdpRequest::new("/apps/saml/oauth2/authorize?client_id=abc123&state=xyz")
		.with_cookie(IDP_COOKIE, "user@example.com")
		.with_cookie("token", backend_jwt(now() + Duration::hours(1)))
}

pub fn authorization_request(client_id: &str) -> AuthorizationRequest {
	AuthorizationRequest {
		client_id: client_id.into(),
		scopes: "runner".into(),
		state: "xyz".into(),
	}
}

/// Runs steps one and two, returning the session id and the issued access code.
pub async fn issue_code(bridge: &Bridge) -> (String, String) {
	let outcome = bridge
		.authorize_at(&authorization_request(CLIENT_ID), &logged_in_request(), now())
		.await
		.expect("Authorization should succeed for a logged-in browser.");
	let session_id = match outcome {
		AuthorizationOutcome::SessionCreated { session_id, .. } => session_id,
		other => panic!("Authorization should create a session, got {other:?}."),
	};
	let redirect = bridge
		.exchange_session_at(
			&SessionExchangeRequest {
				state: "xyz".into(),
				session_cookie: Some(session_id.to_string()),
			},
			now(),
		)
		.await
		.expect("Session exchange should succeed.");

	(session_id.to_string(), query_value(&redirect, "code"))
}

pub fn query_value(url: &Url, name: &str) -> String {
	url.query_pairs()
		.find(|(key, _)| key == name)
		.map(|(_, value)| value.into_owned())
		.unwrap_or_else(|| panic!("Redirect {url} should carry `{name}`."))
}
