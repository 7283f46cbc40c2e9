//! Downstream client registry and credential checks.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ClientId};

/// Answers whether a downstream client may use the bridge.
pub trait ClientRegistry
where
	Self: Send + Sync,
{
	/// Returns `true` when `client_id` names a registered client.
	fn is_valid_client_id(&self, client_id: &str) -> bool;

	/// Returns `true` when `secret` is the registered secret for `client_id`.
	fn is_valid_client_secret(&self, client_id: &str, secret: &str) -> bool;
}

/// In-memory registry keyed by client id.
///
/// Secrets are kept only as SHA-256 digests and compared in constant time.
#[derive(Clone, Default)]
pub struct StaticClientRegistry {
	clients: HashMap<ClientId, [u8; 32]>,
}
impl StaticClientRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) a client and its secret.
	pub fn with_client(mut self, client_id: ClientId, secret: impl AsRef<str>) -> Self {
		self.clients.insert(client_id, digest(secret.as_ref()));

		self
	}

	/// Number of registered clients.
	pub fn len(&self) -> usize {
		self.clients.len()
	}

	/// Returns `true` when no client has been registered.
	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}
}
impl ClientRegistry for StaticClientRegistry {
	fn is_valid_client_id(&self, client_id: &str) -> bool {
		self.clients.contains_key(client_id)
	}

	fn is_valid_client_secret(&self, client_id: &str, secret: &str) -> bool {
		let Some(expected) = self.clients.get(client_id) else {
			return false;
		};
		let presented = digest(secret);

		expected.iter().zip(presented.iter()).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}
impl Debug for StaticClientRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StaticClientRegistry")
			.field("clients", &self.clients.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn digest(secret: &str) -> [u8; 32] {
	Sha256::digest(secret.as_bytes()).into()
}
