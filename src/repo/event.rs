use super::RepoError;
use crate::{
	db::DbPool,
	models::{LinkEvent, NewLinkEvent, NewPlaidApiEvent, Pagination, PlaidApiEvent},
	schema::{link_events, plaid_api_events},
};
use diesel::prelude::*;
use uuid::Uuid;

/// Append-only audit log of vendor calls and Link interactions.
pub struct EventRepo<'a> {
	pool: &'a DbPool,
}

impl<'a> EventRepo<'a> {
	pub fn new(pool: &'a DbPool) -> Self {
		Self { pool }
	}

	pub fn create_api_event(&self, event: &NewPlaidApiEvent) -> Result<PlaidApiEvent, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::insert_into(plaid_api_events::table)
			.values(event)
			.returning(PlaidApiEvent::as_returning())
			.get_result(&mut conn)?)
	}

	pub fn api_events_by_user(
		&self,
		user_id: Uuid,
		page: Pagination,
	) -> Result<Vec<PlaidApiEvent>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(plaid_api_events::table
			.filter(plaid_api_events::user_id.eq(user_id))
			.order(plaid_api_events::request_time.desc())
			.limit(page.limit())
			.offset(page.offset())
			.select(PlaidApiEvent::as_select())
			.load(&mut conn)?)
	}

	pub fn api_events_by_item(
		&self,
		item_id: Uuid,
		page: Pagination,
	) -> Result<Vec<PlaidApiEvent>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(plaid_api_events::table
			.filter(plaid_api_events::item_id.eq(item_id))
			.order(plaid_api_events::request_time.desc())
			.limit(page.limit())
			.offset(page.offset())
			.select(PlaidApiEvent::as_select())
			.load(&mut conn)?)
	}

	pub fn create_link_event(&self, event: &NewLinkEvent) -> Result<LinkEvent, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(diesel::insert_into(link_events::table)
			.values(event)
			.returning(LinkEvent::as_returning())
			.get_result(&mut conn)?)
	}

	pub fn link_events_by_user(
		&self,
		user_id: Uuid,
		page: Pagination,
	) -> Result<Vec<LinkEvent>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(link_events::table
			.filter(link_events::user_id.eq(user_id))
			.order(link_events::timestamp.desc())
			.limit(page.limit())
			.offset(page.offset())
			.select(LinkEvent::as_select())
			.load(&mut conn)?)
	}

	pub fn link_events_by_item(
		&self,
		item_id: Uuid,
		page: Pagination,
	) -> Result<Vec<LinkEvent>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(link_events::table
			.filter(link_events::item_id.eq(item_id))
			.order(link_events::timestamp.desc())
			.limit(page.limit())
			.offset(page.offset())
			.select(LinkEvent::as_select())
			.load(&mut conn)?)
	}

	pub fn link_events_by_session(&self, link_session_id: &str) -> Result<Vec<LinkEvent>, RepoError> {
		let mut conn = self.pool.get()?;
		Ok(link_events::table
			.filter(link_events::link_session_id.eq(link_session_id))
			.order(link_events::timestamp.desc())
			.select(LinkEvent::as_select())
			.load(&mut conn)?)
	}
}
