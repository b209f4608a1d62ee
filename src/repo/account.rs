use super::{conflict_as, RepoError};
use crate::{
	db::DbPool,
	models::{Account, AccountRefresh, NewAccount, Pagination},
	schema::accounts,
};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

pub struct AccountRepo<'a> {
	pool: &'a DbPool,
}

impl<'a> AccountRepo<'a> {
	pub fn new(pool: &'a DbPool) -> Self {
		Self { pool }
	}

	pub fn create(&self, new_account: &NewAccount) -> Result<Account, RepoError> {
		let mut conn = self.pool.get()?;
		diesel::insert_into(accounts::table)
			.values(new_account)
			.returning(Account::as_returning())
			.get_result(&mut conn)
			.map_err(conflict_as("Account already exists"))
	}

	/// Inserts, or refreshes the row holding the same vendor account id.
	pub fn upsert(&self, new_account: &NewAccount) -> Result<Account, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::insert_into(accounts::table)
			.values(new_account)
			.on_conflict(accounts::plaid_account_id)
			.do_update()
			.set(AccountRefresh::from(new_account))
			.returning(Account::as_returning())
			.get_result(&mut conn)?)
	}

	pub fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(accounts::table.find(id).select(Account::as_select()).first(&mut conn).optional()?)
	}

	pub fn find_by_plaid_account_id(
		&self,
		plaid_account_id: &str,
	) -> Result<Option<Account>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(accounts::table
			.filter(accounts::plaid_account_id.eq(plaid_account_id))
			.select(Account::as_select())
			.first(&mut conn)
			.optional()?)
	}

	pub fn list_by_item(&self, item_id: Uuid) -> Result<Vec<Account>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(accounts::table
			.filter(accounts::item_id.eq(item_id))
			.order(accounts::name.asc())
			.select(Account::as_select())
			.load(&mut conn)?)
	}

	pub fn list_by_user(&self, user_id: Uuid, page: Pagination) -> Result<Vec<Account>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(accounts::table
			.filter(accounts::user_id.eq(user_id))
			.order(accounts::name.asc())
			.limit(page.limit())
			.offset(page.offset())
			.select(Account::as_select())
			.load(&mut conn)?)
	}

	pub fn update_balances(
		&self,
		id: Uuid,
		available: Option<&BigDecimal>,
		current: Option<&BigDecimal>,
	) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let now = Utc::now();
		let updated = diesel::update(accounts::table.find(id))
			.set((
				accounts::available_balance.eq(available),
				accounts::current_balance.eq(current),
				accounts::last_updated.eq(now),
				accounts::updated_at.eq(now),
			))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	pub fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::delete(accounts::table.find(id)).execute(&mut conn)? > 0)
	}
}
