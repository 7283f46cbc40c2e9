//! Identity-provider capability consumed by the authorization flow.
//!
//! The bridge never speaks the identity provider's wire protocol. An [`IdentityProvider`]
//! answers whether the caller already holds an authenticated session and, if not, where to send
//! the browser to start one. The provider's own callback endpoint (which sets the backend-token
//! cookie) lives outside this crate.

// self
use crate::_prelude::*;

/// Boxed future returned by [`IdentityProvider`] hooks.
pub type IdpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IdpError>> + 'a + Send>>;

/// Transport-neutral view of the incoming browser request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdpRequest {
	/// Path and query of the original request, used as the post-login return target.
	pub request_uri: String,
	cookies: BTreeMap<String, String>,
}
impl IdpRequest {
	/// Creates a request view with no cookies.
	pub fn new(request_uri: impl Into<String>) -> Self {
		Self { request_uri: request_uri.into(), cookies: BTreeMap::new() }
	}

	/// Adds a cookie; the first value seen for a name wins.
	pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.cookies.entry(name.into()).or_insert_with(|| value.into());

		self
	}

	/// Looks up a cookie value by name.
	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.get(name).map(String::as_str)
	}
}

/// Proof that the caller is authenticated with the identity provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpSession {
	/// Subject (name id) asserted by the provider, when it exposes one.
	pub subject: Option<String>,
}

/// Failures reported by the identity-provider capability.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdpError {
	/// The caller has no authenticated session; the flow must be started.
	#[error("No identity provider session.")]
	NoSession,
	/// Any other provider failure.
	#[error("{message}")]
	Provider {
		/// Provider-supplied description.
		message: String,
	},
}

/// Response the provider wants shown when it fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdpErrorResponse {
	/// HTTP status code.
	pub status: u16,
	/// Plain-text body.
	pub body: String,
}
impl Default for IdpErrorResponse {
	fn default() -> Self {
		Self { status: 403, body: "Forbidden".into() }
	}
}

/// Capability implemented by the single-sign-on integration.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Resolves the caller's provider session, or [`IdpError::NoSession`].
	fn session<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, IdpSession>;

	/// Returns the location that starts the provider login for `request`.
	fn start_auth_flow<'a>(&'a self, request: &'a IdpRequest) -> IdpFuture<'a, Url>;

	/// Renders a provider failure for the browser.
	fn on_error(&self, _request: &IdpRequest, _error: &IdpError) -> IdpErrorResponse {
		IdpErrorResponse::default()
	}
}
