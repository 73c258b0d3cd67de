use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EncryptionConfig;

const IV_LEN: usize = 16;

/// Username/password pair carried inside a caller token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credentials {
    #[serde(rename = "Username", alias = "username", default)]
    pub username: String,
    #[serde(rename = "Password", alias = "password", default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields present and non-empty. Whitespace counts as a value.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// AES-CBC/PKCS7 cipher for caller tokens.
///
/// The key length selects AES-128, AES-192 or AES-256.
#[derive(Clone)]
pub struct TokenCipher {
    key: Vec<u8>,
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key_bits", &(self.key.len() * 8))
            .finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Build from base64 key and IV strings.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, CipherError> {
        let key = STANDARD
            .decode(config.key.trim())
            .map_err(|error| CipherError::InvalidKey(format!("key is not valid base64: {error}")))?;
        let iv = STANDARD
            .decode(config.iv.trim())
            .map_err(|error| CipherError::InvalidKey(format!("iv is not valid base64: {error}")))?;
        Self::new(&key, &iv)
    }

    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(CipherError::InvalidKey(format!(
                "key must be 16, 24 or 32 bytes, got {}",
                key.len()
            )));
        }
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| CipherError::InvalidKey(format!("iv must be {IV_LEN} bytes, got {}", iv.len())))?;
        Ok(Self { key: key.to_vec(), iv })
    }

    /// Serialize `value` as JSON, encrypt it and return base64 text.
    pub fn encrypt<T: Serialize>(&self, value: &T) -> Result<String, CipherError> {
        let plain = serde_json::to_vec(value)?;
        let encrypted = self.encrypt_bytes(&plain)?;
        Ok(STANDARD.encode(encrypted))
    }

    /// Reverse of [`TokenCipher::encrypt`].
    ///
    /// Spaces are read as `+`, since tokens often arrive through an unescaped
    /// query string.
    pub fn decrypt<T: DeserializeOwned>(&self, token: &str) -> Result<T, CipherError> {
        let normalized = token.trim().replace(' ', "+");
        let encrypted = STANDARD
            .decode(normalized.as_bytes())
            .map_err(|error| CipherError::InvalidToken(format!("not valid base64: {error}")))?;
        let plain = self.decrypt_bytes(&encrypted)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    fn encrypt_bytes(&self, plain: &[u8]) -> Result<Vec<u8>, CipherError> {
        let out = match self.key.len() {
            16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plain),
            24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plain),
            _ => cbc::Encryptor::<aes::Aes256>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plain),
        };
        Ok(out)
    }

    fn decrypt_bytes(&self, encrypted: &[u8]) -> Result<Vec<u8>, CipherError> {
        let out = match self.key.len() {
            16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(encrypted),
            24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(encrypted),
            _ => cbc::Decryptor::<aes::Aes256>::new_from_slices(&self.key, &self.iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(encrypted),
        };
        out.map_err(|_| CipherError::InvalidToken("decryption failed".to_string()))
    }
}

fn invalid_length(error: aes::cipher::InvalidLength) -> CipherError {
    CipherError::InvalidKey(error.to_string())
}

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid encryption settings: {0}")]
    InvalidKey(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
