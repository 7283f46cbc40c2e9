//! Serves the bridge on `127.0.0.1:8080` behind a stand-in identity provider.
//!
//! Open `http://127.0.0.1:8080/apps/saml/oauth2/authorize?client_id=demo-client&state=demo` in a
//! browser. The stand-in provider signs you in as `demo@example.com`, sets a backend token, and
//! the bridge lands on `/demo/callback` with a fresh code. Redeem it with:
//!
//! ```sh
//! curl -d 'code=<code>&client_id=demo-client&client_secret=demo-secret' \
//!   http://127.0.0.1:8080/apps/saml/oauth2/token
//! ```

// std
use std::{collections::BTreeMap, sync::Arc};
// crates.io
use axum::{
	Router,
	extract::Query,
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
	routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use color_eyre::Result;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use idp_bridge::{
	auth::{ClientId, RunnerTokenIssuer, StaticClientRegistry},
	flows::Bridge,
	http,
	idp::{IdentityProvider, IdpError, IdpFuture, IdpRequest, IdpSession},
	settings::BridgeSettings,
	store::MemoryStore,
	url::Url,
};

const ADDR: &str = "127.0.0.1:8080";
const SIGNING_KEY: &str = include_str!("../tests/fixtures/signing_key.pem");
const USER_COOKIE: &str = "demo_user";
const DEMO_USER: &str = "demo@example.com";

/// Treats the `demo_user` cookie as an established single-sign-on session.
struct DemoIdentityProvider;
impl IdentityProvider for DemoIdentityProvider {
	fn session<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, IdpSession> {
		Box::pin(async move {
			request
				.cookie(USER_COOKIE)
				.filter(|user| !user.is_empty())
				.map(|user| IdpSession { subject: Some(user.to_owned()) })
				.ok_or(IdpError::NoSession)
		})
	}

	fn start_auth_flow<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, Url> {
		Box::pin(async move {
			let mut login = Url::parse(&format!("http://{ADDR}/demo/login"))
				.map_err(|e| IdpError::Provider { message: e.to_string() })?;

			login.query_pairs_mut().append_pair("return_to", &request.request_uri);

			Ok(login)
		})
	}
}

#[derive(Deserialize)]
struct LoginQuery {
	return_to: String,
}

/// Stand-in login page: signs the browser in and sets the backend token cookie.
async fn login(jar: CookieJar, Query(query): Query<LoginQuery>) -> Response {
	let key = match EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()) {
		Ok(key) => key,
		Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
	};
	let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
	let backend_token = match jsonwebtoken::encode(
		&Header::new(Algorithm::RS256),
		&json!({ "sub": DEMO_USER, "exp": expires_at.unix_timestamp() }),
		&key,
	) {
		Ok(token) => token,
		Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
	};
	let return_to = if query.return_to.starts_with('/') { query.return_to } else { "/".into() };
	let jar = jar
		.add(Cookie::build((USER_COOKIE, DEMO_USER)).path("/").http_only(true))
		.add(Cookie::build(("token", backend_token)).path("/").http_only(true));

	(jar, Redirect::to(&return_to)).into_response()
}

async fn callback(Query(params): Query<BTreeMap<String, String>>) -> String {
	format!("Downstream callback received {params:?}. Redeem `code` at the token endpoint.\n")
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let settings = BridgeSettings::builder(Url::parse(&format!("http://{ADDR}/demo/callback"))?)
		.issuer(format!("http://{ADDR}"))
		.build()?;
	let clients =
		StaticClientRegistry::new().with_client(ClientId::new("demo-client")?, "demo-secret");
	let bridge = Bridge::new(
		Arc::new(MemoryStore::default()),
		Arc::new(DemoIdentityProvider),
		Arc::new(clients),
		RunnerTokenIssuer::from_rsa_pem(SIGNING_KEY)?,
		settings,
	)?;
	let app = http::router(Arc::new(bridge))
		.merge(Router::new().route("/demo/login", get(login)).route("/demo/callback", get(callback)));
	let listener = tokio::net::TcpListener::bind(ADDR).await?;

	println!(
		"Open http://{ADDR}/apps/saml/oauth2/authorize?client_id=demo-client&state=demo to sign in."
	);

	axum::serve(listener, app).await?;

	Ok(())
}
