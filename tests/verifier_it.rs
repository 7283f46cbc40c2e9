mod common;

// std
use std::sync::Arc;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::json;
// self
use common::*;
use idp_bridge::{
	auth::{TokenVerifier, VerifyError},
	flows::TokenRequest,
	store::MemoryStore,
};

async fn runner_token() -> String {
	let bridge = bridge(Arc::new(MemoryStore::default()));
	let (_, code) = issue_code(&bridge).await;
	let request =
		TokenRequest { code, client_id: CLIENT_ID.into(), client_secret: CLIENT_SECRET.into() };

	bridge
		.exchange_token_at(&request, now())
		.await
		.expect("Token exchange should succeed.")
		.access_token
		.expose()
		.to_owned()
}

#[tokio::test]
async fn tampered_claims_fail_signature_check() {
	let token = runner_token().await;
	let mut segments = token.split('.').map(str::to_owned).collect::<Vec<_>>();
	let forged =
		json!({ "sub": "admin", "sid": "x", "jti": "x", "iat": 0, "exp": 4_102_444_800_i64 });

	segments[1] = URL_SAFE_NO_PAD.encode(forged.to_string());

	assert_eq!(
		verifier().verify_at(&segments.join("."), now()),
		Err(VerifyError::InvalidSignature)
	);
}

#[tokio::test]
async fn tokens_only_verify_against_the_bridge_key() {
	let token = runner_token().await;
	let other = TokenVerifier::from_rsa_pem(include_str!("fixtures/untrusted_key.pub.pem"))
		.expect("Untrusted public key fixture should parse.");

	verifier().verify_at(&token, now()).expect("Bridge key should verify its own tokens.");

	assert_eq!(other.verify_at(&token, now()), Err(VerifyError::InvalidSignature));
}
