//! Token-based caller authentication.
//!
//! Callers present an opaque token: AES-CBC ciphertext (base64) of a JSON
//! credentials object. The gateway decrypts it and asks an external login
//! endpoint whether the credentials are valid.

mod cipher;
mod gateway;
mod validator;

pub use cipher::{CipherError, Credentials, TokenCipher};
pub use gateway::AuthGateway;
pub use validator::{CredentialValidator, HttpCredentialValidator, ValidatorError};
