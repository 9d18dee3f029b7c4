//! Password verification behind a single seam.
//!
//! Stored passwords are opaque strings. `PlaintextVerifier` compares them
//! verbatim; a hashing verifier can replace it without touching callers.

pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, supplied: &str, stored: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextVerifier;

impl PasswordVerifier for PlaintextVerifier {
    fn verify(&self, supplied: &str, stored: &str) -> bool {
        supplied == stored
    }
}
