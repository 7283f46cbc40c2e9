//! RSA-only verification of runner tokens.
//!
//! The JOSE header is read first and anything outside RS256/RS384/RS512 (including `none` and
//! HMAC) is refused before the key is consulted. A token is expired from its `exp` second on.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind as JwtErrorKind};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Decoded claim set returned by a successful verification.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Verification failures surfaced to callers of [`TokenVerifier::verify`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VerifyError {
	/// Input is not a three-segment compact JWS with a readable header.
	#[error("Token is malformed.")]
	MalformedToken,
	/// The header names an algorithm outside the RSA family.
	#[error("Unexpected signing method: {alg}.")]
	UnexpectedSigningMethod {
		/// Algorithm advertised by the token header.
		alg: String,
	},
	/// The signature does not match the trusted key.
	#[error("Token signature is invalid.")]
	InvalidSignature,
	/// The payload is unreadable or lacks a numeric `exp` claim.
	#[error("Token claims are malformed: {reason}.")]
	MalformedClaims {
		/// Short description of what was wrong.
		reason: &'static str,
	},
	/// The current instant is at or past the `exp` claim.
	#[error("Token expired at {expired_at}.")]
	TokenExpired {
		/// Expiry instant carried by the token.
		expired_at: OffsetDateTime,
	},
}

#[derive(Deserialize)]
struct RawHeader {
	alg: String,
}

/// Validates runner tokens against a trusted RSA public key.
///
/// The key is a required constructor argument, so a verifier cannot exist without one; loading
/// it with [`TokenVerifier::from_rsa_pem`] fails at startup when the PEM is absent or invalid.
#[derive(Clone)]
pub struct TokenVerifier {
	key: DecodingKey,
}
impl TokenVerifier {
	/// Wraps an already-parsed RSA decoding key.
	pub fn new(key: DecodingKey) -> Self {
		Self { key }
	}

	/// Parses a PEM encoded RSA public key (PKCS#1 or SPKI).
	pub fn from_rsa_pem(pem: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
		let key = DecodingKey::from_rsa_pem(pem.as_ref())
			.map_err(|source| ConfigError::InvalidKey { purpose: "verifier", source })?;

		Ok(Self::new(key))
	}

	/// Verifies a token against the current UTC clock.
	pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
		self.verify_at(token, OffsetDateTime::now_utc())
	}

	/// Verifies a token, treating `now` as the current instant.
	pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, VerifyError> {
		const KIND: FlowKind = FlowKind::Verification;

		let _span = FlowSpan::new(KIND, "verify").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.verify_inner(token, now);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn verify_inner(&self, token: &str, now: OffsetDateTime) -> Result<Claims, VerifyError> {
		let algorithm = rsa_algorithm(token)?;
		let mut validation = Validation::new(algorithm);

		// Expiry is checked below without leeway.
		validation.validate_exp = false;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		let data = jsonwebtoken::decode::<Claims>(token, &self.key, &validation)
			.map_err(|e| map_decode_error(e.kind()))?;
		let expired_at = expiry(&data.claims)?;

		if now >= expired_at {
			return Err(VerifyError::TokenExpired { expired_at });
		}

		Ok(data.claims)
	}
}
impl Debug for TokenVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenVerifier(..)")
	}
}

/// Reads the `exp` claim as a UTC instant. Fractional seconds are truncated.
pub fn expiry(claims: &Claims) -> Result<OffsetDateTime, VerifyError> {
	let exp = claims.get("exp").ok_or(VerifyError::MalformedClaims { reason: "missing exp" })?;
	let seconds = match exp {
		serde_json::Value::Number(n) => n
			.as_i64()
			.or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
			.ok_or(VerifyError::MalformedClaims { reason: "exp is not a timestamp" })?,
		_ => return Err(VerifyError::MalformedClaims { reason: "exp is not numeric" }),
	};

	OffsetDateTime::from_unix_timestamp(seconds)
		.map_err(|_| VerifyError::MalformedClaims { reason: "exp is out of range" })
}

/// Splits a compact JWS into its header, payload, and signature segments.
pub(crate) fn split_compact(token: &str) -> Result<[&str; 3], VerifyError> {
	let mut parts = token.split('.');

	match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(header), Some(payload), Some(signature), None) => Ok([header, payload, signature]),
		_ => Err(VerifyError::MalformedToken),
	}
}

/// Base64url-decodes a segment and parses it as JSON.
pub(crate) fn decode_segment<T>(segment: &str) -> Option<T>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;

	serde_json::from_slice(&bytes).ok()
}

fn rsa_algorithm(token: &str) -> Result<Algorithm, VerifyError> {
	let [header, _, _] = split_compact(token)?;
	let RawHeader { alg } = decode_segment(header).ok_or(VerifyError::MalformedToken)?;

	match alg.as_str() {
		"RS256" => Ok(Algorithm::RS256),
		"RS384" => Ok(Algorithm::RS384),
		"RS512" => Ok(Algorithm::RS512),
		_ => Err(VerifyError::UnexpectedSigningMethod { alg }),
	}
}

fn map_decode_error(kind: &JwtErrorKind) -> VerifyError {
	match kind {
		// The header was decoded up front and the payload is only decoded after the signature
		// check, so a base64 failure here comes from the signature segment.
		JwtErrorKind::InvalidSignature
		| JwtErrorKind::Base64(_)
		| JwtErrorKind::InvalidRsaKey(_)
		| JwtErrorKind::InvalidKeyFormat
		| JwtErrorKind::Crypto(_) => VerifyError::InvalidSignature,
		JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
			VerifyError::UnexpectedSigningMethod { alg: "unknown".into() }
		},
		JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
			VerifyError::MalformedClaims { reason: "payload is not a JSON object" }
		},
		_ => VerifyError::MalformedToken,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{EncodingKey, Header};
	use serde_json::json;
	use time::macros;
	// self
	use super::*;

	const SIGNING_KEY: &str = include_str!("../../tests/fixtures/signing_key.pem");
	const VERIFYING_KEY: &str = include_str!("../../tests/fixtures/signing_key.pub.pem");
	const UNTRUSTED_KEY: &str = include_str!("../../tests/fixtures/untrusted_key.pem");

	fn verifier() -> TokenVerifier {
		TokenVerifier::from_rsa_pem(VERIFYING_KEY).expect("Verifier fixture key should parse.")
	}

	fn sign(algorithm: Algorithm, pem: &str, claims: &serde_json::Value) -> String {
		let key =
			EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Signing fixture key should parse.");

		jsonwebtoken::encode(&Header::new(algorithm), claims, &key)
			.expect("Fixture token should sign.")
	}

	fn unsigned(alg: &str, claims: &serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(json!({ "alg": alg, "typ": "JWT" }).to_string());
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

		format!("{header}.{payload}.")
	}

	#[test]
	fn accepts_rsa_tokens_before_expiry() {
		let expires = macros::datetime!(2030-01-01 00:00 UTC);
		let token = sign(
			Algorithm::RS256,
			SIGNING_KEY,
			&json!({ "sub": "runner", "exp": expires.unix_timestamp() }),
		);
		let claims = verifier()
			.verify_at(&token, macros::datetime!(2029-12-31 23:59:59 UTC))
			.expect("Token should verify before expiry.");

		assert_eq!(claims.get("sub"), Some(&json!("runner")));
	}

	#[test]
	fn expiry_boundary_is_exclusive() {
		let expires = macros::datetime!(2030-01-01 00:00 UTC);
		let token =
			sign(Algorithm::RS384, SIGNING_KEY, &json!({ "exp": expires.unix_timestamp() }));
		let err = verifier().verify_at(&token, expires).expect_err("Token must expire at exp.");

		assert_eq!(err, VerifyError::TokenExpired { expired_at: expires });
	}

	#[test]
	fn rejects_none_algorithm_before_signature_check() {
		let token = unsigned("none", &json!({ "exp": 4_102_444_800_i64 }));
		let err = verifier().verify(&token).expect_err("The none algorithm must be rejected.");

		assert_eq!(err, VerifyError::UnexpectedSigningMethod { alg: "none".into() });
	}

	#[test]
	fn rejects_hmac_signed_with_public_key_material() {
		let key = EncodingKey::from_secret(VERIFYING_KEY.as_bytes());
		let token = jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&json!({ "exp": 4_102_444_800_i64 }),
			&key,
		)
		.expect("HMAC fixture token should sign.");
		let err = verifier().verify(&token).expect_err("HS256 tokens must be rejected.");

		assert_eq!(err, VerifyError::UnexpectedSigningMethod { alg: "HS256".into() });
	}

	#[test]
	fn rejects_tokens_signed_by_other_keys() {
		let token = sign(Algorithm::RS256, UNTRUSTED_KEY, &json!({ "exp": 4_102_444_800_i64 }));

		assert_eq!(verifier().verify(&token), Err(VerifyError::InvalidSignature));
	}

	#[test]
	fn undecodable_signature_segment_is_an_invalid_signature() {
		let token = sign(Algorithm::RS256, SIGNING_KEY, &json!({ "exp": 4_102_444_800_i64 }));
		let [header, payload, _] = split_compact(&token).expect("Signed fixture should split.");
		let mangled = format!("{header}.{payload}.!!not-base64!!");

		assert_eq!(verifier().verify(&mangled), Err(VerifyError::InvalidSignature));
	}

	#[test]
	fn missing_or_non_numeric_exp_is_malformed() {
		let without_exp = sign(Algorithm::RS256, SIGNING_KEY, &json!({ "sub": "runner" }));
		let string_exp = sign(Algorithm::RS256, SIGNING_KEY, &json!({ "exp": "tomorrow" }));

		assert!(matches!(
			verifier().verify(&without_exp),
			Err(VerifyError::MalformedClaims { .. })
		));
		assert!(matches!(verifier().verify(&string_exp), Err(VerifyError::MalformedClaims { .. })));
	}

	#[test]
	fn fractional_exp_is_truncated() {
		let mut claims = Claims::new();

		claims.insert("exp".into(), json!(1_700_000_000.9_f64));

		assert_eq!(
			expiry(&claims).expect("Fractional exp should parse."),
			OffsetDateTime::from_unix_timestamp(1_700_000_000)
				.expect("Fixture timestamp should be in range."),
		);
	}

	#[test]
	fn garbage_input_is_malformed() {
		assert_eq!(verifier().verify("not-a-token"), Err(VerifyError::MalformedToken));
		assert_eq!(verifier().verify("a.b.c.d"), Err(VerifyError::MalformedToken));
		assert_eq!(verifier().verify("!!.e30.sig"), Err(VerifyError::MalformedToken));
	}

	#[test]
	fn construction_fails_without_a_key() {
		assert!(matches!(
			TokenVerifier::from_rsa_pem(""),
			Err(ConfigError::InvalidKey { purpose: "verifier", .. })
		));
	}
}
