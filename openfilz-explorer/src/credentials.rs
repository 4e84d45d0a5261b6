use keyring::Entry;
use thiserror::Error;

const SERVICE_NAME: &str = "org.openfilz.explorer";
const TOKEN_KEY: &str = "openfilz_token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("token not found")]
    TokenNotFound,
}

/// Bearer token kept in the system keyring between runs.
pub struct TokenStorage {
    entry: Entry,
}

impl TokenStorage {
    pub fn new() -> Result<Self, CredentialError> {
        Ok(Self {
            entry: Entry::new(SERVICE_NAME, TOKEN_KEY)?,
        })
    }

    pub fn save_token(&self, token: &str) -> Result<(), CredentialError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<String, CredentialError> {
        match self.entry.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(CredentialError::TokenNotFound),
            Err(err) => Err(CredentialError::Keyring(err)),
        }
    }

    pub fn delete_token(&self) -> Result<(), CredentialError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(CredentialError::Keyring(err)),
        }
    }
}

/// Picks the first token available: explicit flag, environment, then keyring.
pub fn resolve_token(
    explicit: Option<&str>,
    from_env: Option<&str>,
    storage: Option<&TokenStorage>,
) -> Option<String> {
    explicit
        .or(from_env)
        .map(str::to_string)
        .or_else(|| storage.and_then(|storage| storage.get_token().ok()))
}
