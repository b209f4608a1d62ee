use super::{conflict_as, RepoError};
use crate::{
	db::DbPool,
	models::{Item, ItemStatus, NewItem, Pagination},
	schema::items,
};
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

pub struct ItemRepo<'a> {
	pool: &'a DbPool,
}

impl<'a> ItemRepo<'a> {
	pub fn new(pool: &'a DbPool) -> Self {
		Self { pool }
	}

	pub fn create(&self, new_item: &NewItem) -> Result<Item, RepoError> {
		let mut conn = self.pool.get()?;
		diesel::insert_into(items::table)
			.values(new_item)
			.returning(Item::as_returning())
			.get_result(&mut conn)
			.map_err(conflict_as("Item is already linked"))
	}

	pub fn find_by_id(&self, id: Uuid) -> Result<Option<Item>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(items::table.find(id).select(Item::as_select()).first(&mut conn).optional()?)
	}

	pub fn find_by_plaid_item_id(&self, plaid_item_id: &str) -> Result<Option<Item>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(items::table
			.filter(items::plaid_item_id.eq(plaid_item_id))
			.select(Item::as_select())
			.first(&mut conn)
			.optional()?)
	}

	pub fn list_by_user(&self, user_id: Uuid, page: Pagination) -> Result<Vec<Item>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(items::table
			.filter(items::user_id.eq(user_id))
			.order(items::created_at.desc())
			.limit(page.limit())
			.offset(page.offset())
			.select(Item::as_select())
			.load(&mut conn)?)
	}

	pub fn update_status(
		&self,
		id: Uuid,
		status: ItemStatus,
		error: Option<&str>,
	) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let updated = diesel::update(items::table.find(id))
			.set((
				items::status.eq(status.as_str()),
				items::error.eq(error),
				items::updated_at.eq(Utc::now()),
			))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	pub fn update_webhook(&self, id: Uuid, webhook_url: &str) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let updated = diesel::update(items::table.find(id))
			.set((items::webhook_url.eq(webhook_url), items::updated_at.eq(Utc::now())))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	/// Stores the vendor's opaque sync cursor and stamps the sync time.
	pub fn update_transaction_cursor(&self, id: Uuid, cursor: &str) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		let now = Utc::now();
		let updated = diesel::update(items::table.find(id))
			.set((
				items::transaction_cursor.eq(cursor),
				items::last_success_sync.eq(now),
				items::updated_at.eq(now),
			))
			.execute(&mut conn)?;
		Ok(updated > 0)
	}

	/// Accounts and their transactions go with the item (ON DELETE CASCADE).
	pub fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::delete(items::table.find(id)).execute(&mut conn)? > 0)
	}
}
