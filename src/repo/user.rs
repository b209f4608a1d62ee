use super::{conflict_as, RepoError};
use crate::{
	db::DbPool,
	models::{NewUser, User, UserChanges},
	schema::users,
};
use diesel::prelude::*;
use uuid::Uuid;

const EMAIL_TAKEN: &str = "Email already registered";

pub struct UserRepo<'a> {
	pool: &'a DbPool,
}

impl<'a> UserRepo<'a> {
	pub fn new(pool: &'a DbPool) -> Self {
		Self { pool }
	}

	pub fn create(&self, new_user: &NewUser) -> Result<User, RepoError> {
		let mut conn = self.pool.get()?;
		diesel::insert_into(users::table)
			.values(new_user)
			.returning(User::as_returning())
			.get_result(&mut conn)
			.map_err(conflict_as(EMAIL_TAKEN))
	}

	pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(users::table.find(id).select(User::as_select()).first(&mut conn).optional()?)
	}

	pub fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(users::table
			.filter(users::email.eq(email))
			.select(User::as_select())
			.first(&mut conn)
			.optional()?)
	}

	pub fn update_profile(
		&self,
		id: Uuid,
		changes: &UserChanges,
	) -> Result<Option<User>, RepoError> {
		let mut conn = self.pool.get()?;
		diesel::update(users::table.find(id))
			.set(changes)
			.returning(User::as_returning())
			.get_result(&mut conn)
			.optional()
			.map_err(conflict_as(EMAIL_TAKEN))
	}

	pub fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let updated = diesel::update(users::table.find(id))
			.set((users::password_hash.eq(password_hash), users::updated_at.eq(chrono::Utc::now())))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	pub fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::delete(users::table.find(id)).execute(&mut conn)? > 0)
	}
}
