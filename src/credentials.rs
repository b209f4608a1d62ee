use crate::constants::MAX_PASSWORD_BYTES;
use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
	#[error("password must be at most {MAX_PASSWORD_BYTES} bytes")]
	TooLong,

	#[error("password hashing failed: {0}")]
	Hash(#[from] BcryptError),
}

/// Salted bcrypt hash; the salt and cost travel inside the returned string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
	if password.len() > MAX_PASSWORD_BYTES {
		return Err(CredentialError::TooLong);
	}
	Ok(hash(password.as_bytes(), DEFAULT_COST)?)
}

/// A malformed stored hash counts as a mismatch, and so does a password
/// too long to have been hashed.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
	if password.len() > MAX_PASSWORD_BYTES {
		return false;
	}
	match verify(password.as_bytes(), password_hash) {
		Ok(matches) => matches,
		Err(e) => {
			log::warn!("Stored password hash could not be checked: {}", e);
			false
		},
	}
}
