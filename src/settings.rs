//! Validated runtime settings for the bridge endpoints, cookies, and token lifetimes.

// self
use crate::{_prelude::*, auth::AccessCode};

/// Default path of the authorization step.
pub const DEFAULT_AUTHORIZE_PATH: &str = "/apps/saml/oauth2/authorize";
/// Default path of the session-exchange step.
pub const DEFAULT_SESSION_EXCHANGE_PATH: &str = "/apps/saml/oauth2/session";
/// Default path of the token-exchange step.
pub const DEFAULT_TOKEN_PATH: &str = "/apps/saml/oauth2/token";

/// Errors raised while validating [`BridgeSettings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SettingsError {
	/// The downstream callback must be an absolute http(s) URL.
	#[error("The downstream callback must use http or https: {url}.")]
	InsecureCallback {
		/// Callback that failed validation.
		url: String,
	},
	/// Endpoint paths must be absolute and free of query strings.
	#[error("The {field} path must start with '/' and carry no query: {path}.")]
	InvalidPath {
		/// Setting name.
		field: &'static str,
		/// Offending value.
		path: String,
	},
	/// Two steps were mounted on the same path.
	#[error("Endpoint paths must be distinct: {path}.")]
	DuplicatePath {
		/// Path used more than once.
		path: String,
	},
	/// Cookie names must be non-empty RFC 6265 tokens.
	#[error("The {field} cookie name is not a valid token: {name:?}.")]
	InvalidCookieName {
		/// Setting name.
		field: &'static str,
		/// Offending value.
		name: String,
	},
	/// Session and backend-token cookies must differ.
	#[error("Session and backend-token cookies share the name {name:?}.")]
	CookieNameClash {
		/// Shared cookie name.
		name: String,
	},
	/// The downstream application id is required.
	#[error("The app_id must not be empty.")]
	EmptyAppId,
	/// Durations must be strictly positive.
	#[error("The {field} must be positive.")]
	NonPositiveDuration {
		/// Setting name.
		field: &'static str,
	},
}

/// Settings shared by every flow and the HTTP router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
	/// Path of the authorization step.
	pub authorize_path: String,
	/// Path of the session-exchange step; step one redirects here.
	pub session_exchange_path: String,
	/// Path of the token-exchange step.
	pub token_path: String,
	/// Downstream application callback receiving `app_id`, `code`, and `state`.
	pub downstream_callback: Url,
	/// Identifier of this bridge as known to the downstream application.
	pub app_id: String,
	/// Cookie carrying the session id.
	pub session_cookie_name: String,
	/// Cookie set by the identity provider integration carrying the backend token.
	pub backend_token_cookie_name: String,
	/// Path attribute of the session cookie.
	pub cookie_path: String,
	/// Whether the session cookie is marked `Secure`.
	pub secure_cookies: bool,
	/// How long an access code stays redeemable.
	pub access_code_ttl: Duration,
	/// Optional cap on runner-token lifetime.
	pub runner_token_ttl: Option<Duration>,
	/// `iss` claim written into runner tokens.
	pub issuer: Option<String>,
}
impl BridgeSettings {
	/// Starts a builder for the given downstream callback.
	pub fn builder(downstream_callback: Url) -> BridgeSettingsBuilder {
		BridgeSettingsBuilder::new(downstream_callback)
	}

	/// Relative location of the session-exchange step carrying `state`.
	pub fn session_exchange_redirect(&self, state: &str) -> String {
		let query = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("state", state)
			.finish();

		format!("{}?{query}", self.session_exchange_path)
	}

	/// Downstream callback carrying `app_id`, `code`, and `state`.
	pub fn downstream_redirect(&self, code: &AccessCode, state: &str) -> Url {
		let mut url = self.downstream_callback.clone();

		url.query_pairs_mut()
			.append_pair("app_id", &self.app_id)
			.append_pair("code", code)
			.append_pair("state", state);

		url
	}

	/// Session cookie bound to `value`.
	pub fn session_cookie(&self, value: impl Into<String>) -> SessionCookie {
		SessionCookie {
			name: self.session_cookie_name.clone(),
			value: value.into(),
			path: self.cookie_path.clone(),
			http_only: true,
			secure: self.secure_cookies,
		}
	}

	/// Re-runs builder validation, e.g. after deserializing settings from a file.
	pub fn validate(&self) -> Result<(), SettingsError> {
		match self.downstream_callback.scheme() {
			"http" | "https" => {},
			_ =>
				return Err(SettingsError::InsecureCallback {
					url: self.downstream_callback.to_string(),
				}),
		}

		validate_path("authorize", &self.authorize_path)?;
		validate_path("session_exchange", &self.session_exchange_path)?;
		validate_path("token", &self.token_path)?;
		validate_path("cookie", &self.cookie_path)?;

		let paths = [&self.authorize_path, &self.session_exchange_path, &self.token_path];

		for (i, path) in paths.iter().enumerate() {
			if paths[..i].contains(path) {
				return Err(SettingsError::DuplicatePath { path: path.to_string() });
			}
		}

		validate_cookie_name("session", &self.session_cookie_name)?;
		validate_cookie_name("backend_token", &self.backend_token_cookie_name)?;

		if self.session_cookie_name == self.backend_token_cookie_name {
			return Err(SettingsError::CookieNameClash { name: self.session_cookie_name.clone() });
		}
		if self.app_id.trim().is_empty() {
			return Err(SettingsError::EmptyAppId);
		}
		if !self.access_code_ttl.is_positive() {
			return Err(SettingsError::NonPositiveDuration { field: "access_code_ttl" });
		}
		if self.runner_token_ttl.is_some_and(|ttl| !ttl.is_positive()) {
			return Err(SettingsError::NonPositiveDuration { field: "runner_token_ttl" });
		}

		Ok(())
	}
}

/// Session cookie attributes, independent of any HTTP framework.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
	/// Cookie name.
	pub name: String,
	/// Session id.
	pub value: String,
	/// Path attribute.
	pub path: String,
	/// Always `true`.
	pub http_only: bool,
	/// `Secure` attribute.
	pub secure: bool,
}

/// Builder for [`BridgeSettings`]; validation happens in [`build`](Self::build).
#[derive(Debug)]
pub struct BridgeSettingsBuilder {
	settings: BridgeSettings,
}
impl BridgeSettingsBuilder {
	/// Seeds every field with its default.
	pub fn new(downstream_callback: Url) -> Self {
		Self {
			settings: BridgeSettings {
				authorize_path: DEFAULT_AUTHORIZE_PATH.into(),
				session_exchange_path: DEFAULT_SESSION_EXCHANGE_PATH.into(),
				token_path: DEFAULT_TOKEN_PATH.into(),
				downstream_callback,
				app_id: "saml".into(),
				session_cookie_name: "session".into(),
				backend_token_cookie_name: "token".into(),
				cookie_path: "/".into(),
				secure_cookies: false,
				access_code_ttl: Duration::minutes(5),
				runner_token_ttl: None,
				issuer: None,
			},
		}
	}

	/// Overrides the authorization path.
	pub fn authorize_path(mut self, path: impl Into<String>) -> Self {
		self.settings.authorize_path = path.into();

		self
	}

	/// Overrides the session-exchange path.
	pub fn session_exchange_path(mut self, path: impl Into<String>) -> Self {
		self.settings.session_exchange_path = path.into();

		self
	}

	/// Overrides the token-exchange path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.settings.token_path = path.into();

		self
	}

	/// Overrides the downstream `app_id`.
	pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
		self.settings.app_id = app_id.into();

		self
	}

	/// Overrides the session cookie name.
	pub fn session_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.settings.session_cookie_name = name.into();

		self
	}

	/// Overrides the backend-token cookie name.
	pub fn backend_token_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.settings.backend_token_cookie_name = name.into();

		self
	}

	/// Overrides the session cookie path.
	pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
		self.settings.cookie_path = path.into();

		self
	}

	/// Marks the session cookie `Secure`.
	pub fn secure_cookies(mut self, secure: bool) -> Self {
		self.settings.secure_cookies = secure;

		self
	}

	/// Overrides the access-code time-to-live.
	pub fn access_code_ttl(mut self, ttl: Duration) -> Self {
		self.settings.access_code_ttl = ttl;

		self
	}

	/// Caps runner-token lifetime below the backend token's expiry.
	pub fn runner_token_ttl(mut self, ttl: Duration) -> Self {
		self.settings.runner_token_ttl = Some(ttl);

		self
	}

	/// Sets the runner-token issuer.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.settings.issuer = Some(issuer.into());

		self
	}

	/// Consumes the builder and validates the settings.
	pub fn build(self) -> Result<BridgeSettings, SettingsError> {
		self.settings.validate()?;

		Ok(self.settings)
	}
}

fn validate_path(field: &'static str, path: &str) -> Result<(), SettingsError> {
	if path.starts_with('/') && !path.contains(['?', '#']) && !path.contains(char::is_whitespace)
	{
		Ok(())
	} else {
		Err(SettingsError::InvalidPath { field, path: path.to_owned() })
	}
}

fn validate_cookie_name(field: &'static str, name: &str) -> Result<(), SettingsError> {
	const SEPARATORS: &str = "()<>@,;:\\\"/[]?={}";

	if !name.is_empty()
		&& name.chars().all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(c))
	{
		Ok(())
	} else {
		Err(SettingsError::InvalidCookieName { field, name: name.to_owned() })
	}
}
