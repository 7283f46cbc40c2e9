//! The bridge facade and the three redirect/exchange steps it drives.
//!
//! [`Bridge`] owns every collaborator a step needs (session store, identity provider, client
//! registry, code generator, token issuer) so each step module only carries its own protocol
//! logic. Every step runs inside a [`FlowSpan`] and records attempt/success/failure counters.

pub mod authorization;
pub mod session_exchange;
pub mod token_exchange;

pub use authorization::*;
pub use session_exchange::*;
pub use token_exchange::*;

// self
use crate::{
	_prelude::*,
	auth::{
		BackendTokenReader, ClientRegistry, CodeGenerator, RunnerTokenIssuer,
		TimeOrderedCodeGenerator,
	},
	error::ConfigError,
	idp::IdentityProvider,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	settings::BridgeSettings,
	store::SessionStore,
};

/// Coordinates the bridge steps against one identity provider and one session store.
#[derive(Clone)]
pub struct Bridge {
	/// Session persistence.
	pub store: Arc<dyn SessionStore>,
	/// Single-sign-on capability.
	pub identity_provider: Arc<dyn IdentityProvider>,
	/// Registered downstream clients.
	pub clients: Arc<dyn ClientRegistry>,
	/// Source of one-time codes and runner-token ids.
	pub codes: Arc<dyn CodeGenerator>,
	/// Runner-token signer.
	pub issuer: Arc<RunnerTokenIssuer>,
	/// How the backend-token cookie is read.
	pub backend_tokens: Arc<BackendTokenReader>,
	/// Paths, cookies, and lifetimes.
	pub settings: BridgeSettings,
}
impl Bridge {
	/// Creates a bridge using UUIDv7 codes and the unverified backend-token reader.
	///
	/// Settings are validated here as well, since deserialized settings bypass the builder. When
	/// `settings.issuer` is set and the issuer carries none, it is applied to the issuer.
	pub fn new(
		store: Arc<dyn SessionStore>,
		identity_provider: Arc<dyn IdentityProvider>,
		clients: Arc<dyn ClientRegistry>,
		issuer: RunnerTokenIssuer,
		settings: BridgeSettings,
	) -> Result<Self, ConfigError> {
		settings.validate()?;

		let issuer = match (&settings.issuer, issuer.issuer()) {
			(Some(configured), None) => issuer.with_issuer(configured.clone()),
			_ => issuer,
		};

		Ok(Self {
			store,
			identity_provider,
			clients,
			codes: Arc::new(TimeOrderedCodeGenerator),
			issuer: Arc::new(issuer),
			backend_tokens: Arc::new(BackendTokenReader::default()),
			settings,
		})
	}

	/// Replaces the code generator.
	pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
		self.codes = codes;

		self
	}

	/// Replaces the backend-token reader, e.g. with [`BackendTokenReader::Trusted`].
	pub fn with_backend_token_reader(mut self, reader: BackendTokenReader) -> Self {
		self.backend_tokens = Arc::new(reader);

		self
	}
}
impl Debug for Bridge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Bridge")
			.field("issuer", &self.issuer)
			.field("backend_tokens", &self.backend_tokens)
			.field("settings", &self.settings)
			.finish()
	}
}

/// Runs one step inside its span, recording the outcome and logging failures.
async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, step: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(step).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
			obs::log_flow_failure(kind, e);
		},
	}

	result
}
