use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
	db::DbPool,
	handler::persist_sync,
	models::{Item, ItemStatus, NewItem, NewLinkEvent, NewPlaidApiEvent, Pagination, UserChanges},
	repo::{AccountRepo, EventRepo, ItemRepo, RepoError, TransactionRepo, UserRepo},
	tests::{
		fixtures::TestFixtures,
		test_utils::{create_user, db_pool, unique_email},
	},
};

fn create_item(pool: &DbPool, user_id: Uuid) -> Item {
	let plaid_item_id = format!("item-{}", Uuid::new_v4());
	let access_token = format!("access-sandbox-{}", Uuid::new_v4());
	ItemRepo::new(pool).create(&NewItem::new(user_id, &plaid_item_id, &access_token)).unwrap()
}

#[test]
fn test_find_by_id_on_unknown_id_is_none() {
	let Some(pool) = db_pool() else { return };

	assert!(UserRepo::new(&pool).find_by_id(Uuid::new_v4()).unwrap().is_none());
	assert!(ItemRepo::new(&pool).find_by_id(Uuid::new_v4()).unwrap().is_none());
	assert!(AccountRepo::new(&pool).find_by_id(Uuid::new_v4()).unwrap().is_none());
	assert!(TransactionRepo::new(&pool).find_by_id(Uuid::new_v4()).unwrap().is_none());
	assert!(UserRepo::new(&pool).find_by_email(&unique_email()).unwrap().is_none());
}

#[test]
fn test_user_lifecycle() {
	let Some(pool) = db_pool() else { return };
	let repo = UserRepo::new(&pool);
	let user = create_user(&pool);

	let found = repo.find_by_email(&user.email).unwrap().unwrap();
	assert_eq!(found.id, user.id);

	let updated = repo
		.update_profile(
			user.id,
			&UserChanges {
				email: None,
				first_name: Some("Janet"),
				last_name: None,
				updated_at: Utc::now(),
			},
		)
		.unwrap()
		.unwrap();
	assert_eq!(updated.first_name.as_deref(), Some("Janet"));
	assert_eq!(updated.last_name.as_deref(), Some("User"));
	assert_eq!(updated.email, user.email);

	assert!(repo.update_password(user.id, "$2b$12$replaced").unwrap());
	assert!(repo.delete(user.id).unwrap());
	assert!(repo.find_by_id(user.id).unwrap().is_none());
	assert!(!repo.delete(user.id).unwrap());
}

#[test]
fn test_duplicate_email_is_a_conflict() {
	let Some(pool) = db_pool() else { return };
	let first = create_user(&pool);
	let other = create_user(&pool);

	let err = UserRepo::new(&pool)
		.update_profile(
			other.id,
			&UserChanges {
				email: Some(&first.email),
				first_name: None,
				last_name: None,
				updated_at: Utc::now(),
			},
		)
		.unwrap_err();
	assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn test_duplicate_item_is_a_conflict() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let repo = ItemRepo::new(&pool);
	let item = create_item(&pool, user.id);

	let err = repo.create(&NewItem::new(user.id, &item.plaid_item_id, "access-other")).unwrap_err();
	assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn test_item_updates() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let repo = ItemRepo::new(&pool);
	let item = create_item(&pool, user.id);
	assert_eq!(item.status(), Some(ItemStatus::Active));

	assert!(repo.update_status(item.id, ItemStatus::LoginRequired, Some("login required")).unwrap());
	assert!(repo.update_webhook(item.id, "https://example.com/hook").unwrap());
	assert!(repo.update_transaction_cursor(item.id, "cursor-1").unwrap());

	let item = repo.find_by_plaid_item_id(&item.plaid_item_id).unwrap().unwrap();
	assert_eq!(item.status(), Some(ItemStatus::LoginRequired));
	assert_eq!(item.error.as_deref(), Some("login required"));
	assert_eq!(item.webhook_url.as_deref(), Some("https://example.com/hook"));
	assert_eq!(item.transaction_cursor.as_deref(), Some("cursor-1"));
	assert!(item.last_success_sync.is_some());

	let listed = repo.list_by_user(user.id, Pagination::default()).unwrap();
	assert_eq!(listed.len(), 1);
	assert!(repo.delete(item.id).unwrap());
	assert!(repo.list_by_user(user.id, Pagination::default()).unwrap().is_empty());
}

#[test]
fn test_account_upsert_refreshes_balances() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let item = create_item(&pool, user.id);
	let repo = AccountRepo::new(&pool);
	let plaid_account_id = format!("acc-{}", Uuid::new_v4());

	let first = repo
		.upsert(&TestFixtures::plaid_account(&plaid_account_id, 110.0).to_new_account(item.id, user.id))
		.unwrap();
	let second = repo
		.upsert(&TestFixtures::plaid_account(&plaid_account_id, 95.5).to_new_account(item.id, user.id))
		.unwrap();

	assert_eq!(first.id, second.id);
	assert_eq!(second.current_balance, Some(BigDecimal::from_str("95.5").unwrap()));
	assert_eq!(repo.list_by_item(item.id).unwrap().len(), 1);
	assert_eq!(repo.list_by_user(user.id, Pagination::default()).unwrap().len(), 1);

	let zero = BigDecimal::from(0);
	assert!(repo.update_balances(first.id, None, Some(&zero)).unwrap());
	let account = repo.find_by_plaid_account_id(&plaid_account_id).unwrap().unwrap();
	assert_eq!(account.available_balance, None);
	assert_eq!(account.current_balance, Some(zero));

	let err = repo
		.create(&TestFixtures::plaid_account(&plaid_account_id, 1.0).to_new_account(item.id, user.id))
		.unwrap_err();
	assert!(matches!(err, RepoError::Conflict(_)));

	assert!(repo.delete(account.id).unwrap());
}

#[test]
fn test_transaction_pending_to_settled() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let item = create_item(&pool, user.id);
	let plaid_account_id = format!("acc-{}", Uuid::new_v4());
	let account = AccountRepo::new(&pool)
		.upsert(&TestFixtures::plaid_account(&plaid_account_id, 50.0).to_new_account(item.id, user.id))
		.unwrap();
	let repo = TransactionRepo::new(&pool);
	let plaid_tx_id = format!("tx-{}", Uuid::new_v4());

	let pending = TestFixtures::plaid_transaction(&plaid_tx_id, &plaid_account_id, 6.33, true)
		.to_new_transaction(account.id, user.id)
		.unwrap();
	let created = repo.create(&pending).unwrap();
	assert!(created.pending);
	assert!(matches!(repo.create(&pending).unwrap_err(), RepoError::Conflict(_)));

	let settled = TestFixtures::plaid_transaction(&plaid_tx_id, &plaid_account_id, 6.5, false)
		.to_new_transaction(account.id, user.id)
		.unwrap();
	let upserted = repo.upsert(&settled).unwrap();
	assert_eq!(upserted.id, created.id);
	assert!(!upserted.pending);
	assert_eq!(upserted.amount, BigDecimal::from_str("6.5").unwrap());

	assert!(repo.update_pending_status(created.id, true).unwrap());
	assert!(repo.find_by_plaid_transaction_id(&plaid_tx_id).unwrap().unwrap().pending);

	let october = repo
		.list_by_date_range(
			user.id,
			NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
			NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
			Pagination::default(),
		)
		.unwrap();
	assert_eq!(october.len(), 1);
	let september = repo
		.list_by_date_range(
			user.id,
			NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
			NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
			Pagination::default(),
		)
		.unwrap();
	assert!(september.is_empty());
	assert_eq!(repo.list_by_account(account.id, Pagination::default()).unwrap().len(), 1);
	assert_eq!(repo.list_by_user(user.id, Pagination::default()).unwrap().len(), 1);

	assert_eq!(repo.delete_by_plaid_transaction_id(&plaid_tx_id).unwrap(), 1);
	assert!(!repo.delete(created.id).unwrap());
}

#[test]
fn test_deleting_item_cascades_to_accounts() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let item = create_item(&pool, user.id);
	let account = AccountRepo::new(&pool)
		.upsert(
			&TestFixtures::plaid_account(&format!("acc-{}", Uuid::new_v4()), 10.0)
				.to_new_account(item.id, user.id),
		)
		.unwrap();

	assert!(ItemRepo::new(&pool).delete(item.id).unwrap());
	assert!(AccountRepo::new(&pool).find_by_id(account.id).unwrap().is_none());
}

#[test]
fn test_event_logs() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let item = create_item(&pool, user.id);
	let repo = EventRepo::new(&pool);

	let api_event = repo
		.create_api_event(
			&NewPlaidApiEvent::started(
				user.id,
				Some(item.id),
				"/accounts/get",
				json!({ "access_token": "[redacted]" }),
			)
			.finish(Some(200), Some(json!({ "accounts": [] })), Some("req-1".to_string()), None, None),
		)
		.unwrap();
	assert_eq!(api_event.status_code, Some(200));
	assert!(api_event.execution_time.unwrap() >= 0);
	assert_eq!(repo.api_events_by_user(user.id, Pagination::default()).unwrap().len(), 1);
	assert_eq!(repo.api_events_by_item(item.id, Pagination::default()).unwrap().len(), 1);

	let session = format!("session-{}", Uuid::new_v4());
	let now = Utc::now();
	for name in ["OPEN", "HANDOFF"] {
		repo.create_link_event(&NewLinkEvent {
			id: Uuid::new_v4(),
			user_id: user.id,
			item_id: Some(item.id),
			event_name: name.to_string(),
			event_metadata: json!({ "view_name": "CONNECTED" }),
			link_session_id: session.clone(),
			request_id: None,
			error_code: None,
			error_message: None,
			status: "success".to_string(),
			institution_id: Some("ins_109508".to_string()),
			institution_name: Some("First Platypus Bank".to_string()),
			timestamp: now,
			created_at: now,
		})
		.unwrap();
	}
	assert_eq!(repo.link_events_by_session(&session).unwrap().len(), 2);
	assert_eq!(repo.link_events_by_user(user.id, Pagination::default()).unwrap().len(), 2);
	assert_eq!(repo.link_events_by_item(item.id, Pagination::default()).unwrap().len(), 2);
	assert!(repo.link_events_by_session("no-such-session").unwrap().is_empty());
}

#[test]
fn test_persist_sync_applies_changes_and_cursor() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let item = create_item(&pool, user.id);
	let plaid_account_id = format!("acc-{}", Uuid::new_v4());
	AccountRepo::new(&pool)
		.upsert(&TestFixtures::plaid_account(&plaid_account_id, 50.0).to_new_account(item.id, user.id))
		.unwrap();
	let (tx_a, tx_b) = (format!("tx-{}", Uuid::new_v4()), format!("tx-{}", Uuid::new_v4()));

	let first = TestFixtures::sync_response(
		vec![
			TestFixtures::plaid_transaction(&tx_a, &plaid_account_id, 12.0, true),
			TestFixtures::plaid_transaction(&tx_b, &plaid_account_id, 3.0, false),
			TestFixtures::plaid_transaction("tx-elsewhere", "acc-unknown", 1.0, false),
		],
		vec![],
		&[],
		"cursor-1",
	);
	let summary = persist_sync(&pool, &item, &first).unwrap();
	assert_eq!((summary.added, summary.modified, summary.removed, summary.skipped), (2, 0, 0, 1));

	let second = TestFixtures::sync_response(
		vec![],
		vec![TestFixtures::plaid_transaction(&tx_a, &plaid_account_id, 12.0, false)],
		&[tx_b.as_str()],
		"cursor-2",
	);
	let summary = persist_sync(&pool, &item, &second).unwrap();
	assert_eq!((summary.added, summary.modified, summary.removed), (0, 1, 1));
	assert_eq!(summary.next_cursor, "cursor-2");

	let repo = TransactionRepo::new(&pool);
	assert!(!repo.find_by_plaid_transaction_id(&tx_a).unwrap().unwrap().pending);
	assert!(repo.find_by_plaid_transaction_id(&tx_b).unwrap().is_none());
	let item = ItemRepo::new(&pool).find_by_id(item.id).unwrap().unwrap();
	assert_eq!(item.transaction_cursor.as_deref(), Some("cursor-2"));
}
