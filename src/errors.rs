use crate::{
	constants::{MESSAGE_INTERNAL_ERROR, MESSAGE_INVALID_TOKEN},
	credentials::CredentialError,
	midware::jwt::AuthError,
	models::ApiResponse,
	plaid::PlaidError,
	repo::RepoError,
};
use actix_web::{
	error::{BlockingError, JsonPayloadError, QueryPayloadError},
	http::StatusCode,
	HttpRequest, HttpResponse, ResponseError,
};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("{0}")]
	BadRequest(String),

	#[error("{0}")]
	Unauthorized(String),

	#[error("{0}")]
	NotFound(String),

	#[error("{0}")]
	Conflict(String),

	#[error("{0}")]
	Vendor(#[from] PlaidError),

	#[error("internal error: {0}")]
	Internal(String),
}

impl ApiError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		ApiError::BadRequest(message.into())
	}

	pub fn unauthorized(message: impl Into<String>) -> Self {
		ApiError::Unauthorized(message.into())
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		ApiError::NotFound(message.into())
	}

	pub fn conflict(message: impl Into<String>) -> Self {
		ApiError::Conflict(message.into())
	}

	pub fn internal(message: impl Into<String>) -> Self {
		ApiError::Internal(message.into())
	}

	/// Text shown to the client. Storage and signing details stay in the logs.
	fn client_message(&self) -> String {
		match self {
			ApiError::Internal(_) => MESSAGE_INTERNAL_ERROR.to_string(),
			other => other.to_string(),
		}
	}
}

impl ResponseError for ApiError {
	fn status_code(&self) -> StatusCode {
		match self {
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::Conflict(_) => StatusCode::CONFLICT,
			ApiError::Vendor(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn error_response(&self) -> HttpResponse {
		match self {
			ApiError::Internal(detail) => log::error!("Internal error: {}", detail),
			ApiError::Vendor(e) => log::error!("Plaid error: {}", e),
			other => log::warn!("Request rejected ({}): {}", self.status_code(), other),
		}
		HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(self.client_message()))
	}
}

impl From<RepoError> for ApiError {
	fn from(e: RepoError) -> Self {
		match e {
			RepoError::Conflict(what) => ApiError::Conflict(what),
			other => ApiError::Internal(other.to_string()),
		}
	}
}

impl From<AuthError> for ApiError {
	fn from(e: AuthError) -> Self {
		match e {
			AuthError::InvalidToken => ApiError::Unauthorized(MESSAGE_INVALID_TOKEN.to_string()),
			AuthError::Signing(err) => ApiError::Internal(format!("token signing failed: {}", err)),
		}
	}
}

impl From<CredentialError> for ApiError {
	fn from(e: CredentialError) -> Self {
		match e {
			CredentialError::TooLong => ApiError::BadRequest(e.to_string()),
			CredentialError::Hash(_) => ApiError::Internal(e.to_string()),
		}
	}
}

impl From<BlockingError> for ApiError {
	fn from(e: BlockingError) -> Self {
		ApiError::Internal(e.to_string())
	}
}

impl From<ValidationErrors> for ApiError {
	fn from(e: ValidationErrors) -> Self {
		ApiError::BadRequest(e.to_string())
	}
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
	ApiError::bad_request(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
	ApiError::bad_request(err.to_string()).into()
}
