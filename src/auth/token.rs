//! Backend and runner token models plus the redacting secret wrapper.

pub mod backend;
pub mod runner;
pub mod secret;
