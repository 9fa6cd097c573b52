pub mod directory;
pub mod verifier;
