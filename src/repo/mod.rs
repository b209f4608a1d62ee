mod account;
mod event;
mod item;
mod transaction;
mod user;

pub use account::AccountRepo;
pub use event::EventRepo;
pub use item::ItemRepo;
pub use transaction::TransactionRepo;
pub use user::UserRepo;

use crate::{
	constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT},
	db::DbPool,
	errors::ApiError,
	models::Pagination,
};
use actix_web::web;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
	/// A unique constraint rejected the write.
	#[error("{0}")]
	Conflict(String),

	#[error("database error: {0}")]
	Database(DieselError),

	#[error("connection pool error: {0}")]
	Pool(#[from] r2d2::Error),
}

impl From<DieselError> for RepoError {
	fn from(e: DieselError) -> Self {
		match e {
			DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
				RepoError::Conflict(info.message().to_string())
			},
			other => RepoError::Database(other),
		}
	}
}

/// Maps a unique violation to a conflict carrying `message`.
pub(crate) fn conflict_as(message: &'static str) -> impl FnOnce(DieselError) -> RepoError {
	move |e| match RepoError::from(e) {
		RepoError::Conflict(_) => RepoError::Conflict(message.to_string()),
		other => other,
	}
}

impl Pagination {
	pub fn limit(&self) -> i64 {
		self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
	}

	pub fn offset(&self) -> i64 {
		self.offset.unwrap_or(0).max(0)
	}
}

/// Runs diesel work on actix's blocking pool.
pub async fn blocking<F, T>(pool: &web::Data<DbPool>, f: F) -> Result<T, ApiError>
where
	F: FnOnce(&DbPool) -> Result<T, RepoError> + Send + 'static,
	T: Send + 'static,
{
	let pool = pool.clone();
	Ok(web::block(move || f(&pool)).await??)
}
