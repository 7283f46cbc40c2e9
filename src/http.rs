//! axum transport for the bridge steps.
//!
//! [`router`] mounts the authorization, session-exchange, and token-exchange steps on the paths
//! configured in [`BridgeSettings`](crate::settings::BridgeSettings). The identity provider's
//! own endpoints are not part of this router.

// crates.io
use axum::{
	Form, Json, Router,
	extract::{FromRequest, FromRequestParts, Query, Request, State},
	http::{Method, StatusCode, Uri, header},
	response::{IntoResponse, Redirect, Response},
	routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
// self
use crate::{
	_prelude::*,
	auth::RunnerToken,
	error::ErrorKind,
	flows::{
		AuthorizationOutcome, AuthorizationRequest, Bridge, SessionExchangeRequest, TokenRequest,
	},
	idp::IdpRequest,
	settings::SessionCookie,
};

/// Builds the bridge router; merge or nest it into the host application.
///
/// The mounted paths were checked to be distinct by [`Bridge::new`].
pub fn router(bridge: Arc<Bridge>) -> Router {
	let settings = &bridge.settings;

	Router::new()
		.route(&settings.authorize_path, get(authorize))
		.route(&settings.session_exchange_path, get(exchange_session))
		.route(&settings.token_path, get(exchange_token).post(exchange_token))
		.with_state(bridge)
}

#[derive(Debug, Default, Deserialize)]
struct StateQuery {
	#[serde(default)]
	state: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
	error: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenBody<'a> {
	access_token: &'a str,
	token_type: &'a str,
	expires_in: i64,
	#[serde(with = "time::serde::rfc3339")]
	expires_at: OffsetDateTime,
}
impl<'a> TokenBody<'a> {
	fn new(token: &'a RunnerToken, now: OffsetDateTime) -> Self {
		Self {
			access_token: token.access_token.expose(),
			token_type: &token.token_type,
			expires_in: token.expires_in_at(now),
			expires_at: token.expires_at,
		}
	}
}

/// Token parameters merged from the query string and, for POST, a JSON or form body.
#[derive(Debug)]
struct TokenParams(TokenRequest);
impl<S> FromRequest<S> for TokenParams
where
	S: Send + Sync,
{
	type Rejection = Response;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let (mut parts, body) = req.into_parts();
		let Query(mut params) = Query::<TokenRequest>::from_request_parts(&mut parts, state)
			.await
			.map_err(IntoResponse::into_response)?;

		if parts.method != Method::POST {
			return Ok(Self(params));
		}

		let content_type = parts
			.headers
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_ascii_lowercase();
		let req = Request::from_parts(parts, body);
		let from_body = if content_type.starts_with("application/json") {
			let Json(body) = Json::<TokenRequest>::from_request(req, state)
				.await
				.map_err(IntoResponse::into_response)?;

			Some(body)
		} else if content_type.starts_with("application/x-www-form-urlencoded") {
			let Form(body) = Form::<TokenRequest>::from_request(req, state)
				.await
				.map_err(IntoResponse::into_response)?;

			Some(body)
		} else {
			None
		};

		if let Some(body) = from_body {
			overlay(&mut params, body);
		}

		Ok(Self(params))
	}
}

fn overlay(params: &mut TokenRequest, body: TokenRequest) {
	let TokenRequest { code, client_id, client_secret } = body;

	if !code.is_empty() {
		params.code = code;
	}
	if !client_id.is_empty() {
		params.client_id = client_id;
	}
	if !client_secret.is_empty() {
		params.client_secret = client_secret;
	}
}

async fn authorize(
	State(bridge): State<Arc<Bridge>>,
	uri: Uri,
	jar: CookieJar,
	Query(request): Query<AuthorizationRequest>,
) -> Response {
	let request_uri = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
	let idp_request = jar.iter().fold(IdpRequest::new(request_uri), |acc, cookie| {
		acc.with_cookie(cookie.name(), cookie.value())
	});

	match bridge.authorize(&request, &idp_request).await {
		Ok(AuthorizationOutcome::StartIdentityFlow { location }) =>
			(StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response(),
		Ok(AuthorizationOutcome::SessionCreated { cookie, redirect, .. }) =>
			(jar.add(session_cookie(cookie)), Redirect::temporary(&redirect)).into_response(),
		Err(e) => error_response(&bridge, Some(&idp_request), e),
	}
}

async fn exchange_session(
	State(bridge): State<Arc<Bridge>>,
	jar: CookieJar,
	Query(query): Query<StateQuery>,
) -> Response {
	let request = SessionExchangeRequest {
		state: query.state,
		session_cookie: jar
			.get(&bridge.settings.session_cookie_name)
			.map(|cookie| cookie.value().to_owned()),
	};

	match bridge.exchange_session(&request).await {
		Ok(location) => Redirect::temporary(location.as_str()).into_response(),
		Err(e) => error_response(&bridge, None, e),
	}
}

async fn exchange_token(
	State(bridge): State<Arc<Bridge>>,
	TokenParams(request): TokenParams,
) -> Response {
	let now = OffsetDateTime::now_utc();

	match bridge.exchange_token_at(&request, now).await {
		Ok(token) => (
			[(header::CACHE_CONTROL, "no-store")],
			Json(TokenBody::new(&token, now)),
		)
			.into_response(),
		Err(e) => error_response(&bridge, None, e),
	}
}

fn session_cookie(cookie: SessionCookie) -> Cookie<'static> {
	Cookie::build((cookie.name, cookie.value))
		.http_only(cookie.http_only)
		.secure(cookie.secure)
		.same_site(SameSite::Lax)
		.path(cookie.path)
		.build()
}

fn error_response(bridge: &Bridge, idp_request: Option<&IdpRequest>, error: Error) -> Response {
	if let Error::IdentityProvider(idp_error) = &error {
		let fallback = IdpRequest::default();
		let presented =
			bridge.identity_provider.on_error(idp_request.unwrap_or(&fallback), idp_error);
		let status = StatusCode::from_u16(presented.status).unwrap_or(StatusCode::FORBIDDEN);

		return (status, presented.body).into_response();
	}

	let status = match error.kind() {
		ErrorKind::Client => StatusCode::BAD_REQUEST,
		ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
		ErrorKind::IdentityProvider => StatusCode::FORBIDDEN,
		ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
	};
	let message =
		if status.is_server_error() { "Internal server error.".into() } else { error.to_string() };

	(status, Json(ErrorBody { error: &message })).into_response()
}
