use super::{conflict_as, RepoError};
use crate::{
	db::DbPool,
	models::{NewTransaction, Pagination, Transaction, TransactionRefresh},
	schema::transactions,
};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct TransactionRepo<'a> {
	pool: &'a DbPool,
}

impl<'a> TransactionRepo<'a> {
	pub fn new(pool: &'a DbPool) -> Self {
		Self { pool }
	}

	pub fn create(&self, new_tx: &NewTransaction) -> Result<Transaction, RepoError> {
		let mut conn = self.pool.get()?;
		diesel::insert_into(transactions::table)
			.values(new_tx)
			.returning(Transaction::as_returning())
			.get_result(&mut conn)
			.map_err(conflict_as("Transaction already exists"))
	}

	/// Keyed by the vendor transaction id; a settled copy of a pending
	/// transaction overwrites it in place.
	pub fn upsert(&self, new_tx: &NewTransaction) -> Result<Transaction, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::insert_into(transactions::table)
			.values(new_tx)
			.on_conflict(transactions::plaid_transaction_id)
			.do_update()
			.set(TransactionRefresh::from(new_tx))
			.returning(Transaction::as_returning())
			.get_result(&mut conn)?)
	}

	pub fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(transactions::table
			.find(id)
			.select(Transaction::as_select())
			.first(&mut conn)
			.optional()?)
	}

	pub fn find_by_plaid_transaction_id(
		&self,
		plaid_transaction_id: &str,
	) -> Result<Option<Transaction>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(transactions::table
			.filter(transactions::plaid_transaction_id.eq(plaid_transaction_id))
			.select(Transaction::as_select())
			.first(&mut conn)
			.optional()?)
	}

	pub fn list_by_account(
		&self,
		account_id: Uuid,
		page: Pagination,
	) -> Result<Vec<Transaction>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(transactions::table
			.filter(transactions::account_id.eq(account_id))
			.order((transactions::date.desc(), transactions::created_at.desc()))
			.limit(page.limit())
			.offset(page.offset())
			.select(Transaction::as_select())
			.load(&mut conn)?)
	}

	pub fn list_by_user(
		&self,
		user_id: Uuid,
		page: Pagination,
	) -> Result<Vec<Transaction>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(transactions::table
			.filter(transactions::user_id.eq(user_id))
			.order((transactions::date.desc(), transactions::created_at.desc()))
			.limit(page.limit())
			.offset(page.offset())
			.select(Transaction::as_select())
			.load(&mut conn)?)
	}

	/// Both bounds are inclusive.
	pub fn list_by_date_range(
		&self,
		user_id: Uuid,
		start: NaiveDate,
		end: NaiveDate,
		page: Pagination,
	) -> Result<Vec<Transaction>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(transactions::table
			.filter(transactions::user_id.eq(user_id))
			.filter(transactions::date.between(start, end))
			.order((transactions::date.desc(), transactions::created_at.desc()))
			.limit(page.limit())
			.offset(page.offset())
			.select(Transaction::as_select())
			.load(&mut conn)?)
	}

	pub fn update_pending_status(&self, id: Uuid, pending: bool) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let updated = diesel::update(transactions::table.find(id))
			.set((transactions::pending.eq(pending), transactions::updated_at.eq(Utc::now())))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	pub fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::delete(transactions::table.find(id)).execute(&mut conn)? > 0)
	}

	pub fn delete_by_plaid_transaction_id(
		&self,
		plaid_transaction_id: &str,
	) -> Result<usize, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::delete(
			transactions::table.filter(transactions::plaid_transaction_id.eq(plaid_transaction_id)),
		)
		.execute(&mut conn)?)
	}
}
