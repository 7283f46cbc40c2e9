//! Bridge enterprise SSO logins into one-time exchange codes and backend-signed runner tokens.
//!
//! The crate implements a three-step redirect/exchange protocol on top of an external
//! identity provider: an authenticated browser session becomes a [`auth::Session`], the session
//! cookie is swapped for a single-use access code, and a downstream backend trades that code
//! (plus its client credentials) for an RS256 runner token. [`auth::TokenVerifier`] validates
//! those tokens wherever they are presented later.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod flows;
#[cfg(feature = "axum")] pub mod http;
pub mod idp;
pub mod obs;
pub mod settings;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use url;
#[cfg(test)] use {color_eyre as _, tokio as _, tower as _, tracing_subscriber as _};
