//! Auth-domain identifiers, sessions, token models, and verification.

pub mod client;
pub mod code;
pub mod id;
pub mod session;
pub mod token;
pub mod verifier;

pub use client::*;
pub use code::*;
pub use id::*;
pub use session::*;
pub use token::{backend::*, runner::*, secret::*};
pub use verifier::*;
