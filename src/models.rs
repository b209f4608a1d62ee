use crate::{constants::MAX_PASSWORD_BYTES, schema::*};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct User {
	pub id: Uuid,
	pub email: String,
	#[serde(skip_serializing, default)]
	pub password_hash: String,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
	pub id: Uuid,
	pub email: &'a str,
	pub password_hash: &'a str,
	pub first_name: Option<&'a str>,
	pub last_name: Option<&'a str>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl<'a> NewUser<'a> {
	pub fn new(
		email: &'a str,
		password_hash: &'a str,
		first_name: Option<&'a str>,
		last_name: Option<&'a str>,
	) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			email,
			password_hash,
			first_name,
			last_name,
			created_at: now,
			updated_at: now,
		}
	}
}

/// Profile edit; `None` fields are left untouched.
#[derive(AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges<'a> {
	pub email: Option<&'a str>,
	pub first_name: Option<&'a str>,
	pub last_name: Option<&'a str>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	Active,
	LoginRequired,
	Errored,
	PendingExpiration,
	Revoked,
}

impl ItemStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ItemStatus::Active => "active",
			ItemStatus::LoginRequired => "login_required",
			ItemStatus::Errored => "errored",
			ItemStatus::PendingExpiration => "pending_expiration",
			ItemStatus::Revoked => "revoked",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"active" => Some(ItemStatus::Active),
			"login_required" => Some(ItemStatus::LoginRequired),
			"errored" => Some(ItemStatus::Errored),
			"pending_expiration" => Some(ItemStatus::PendingExpiration),
			"revoked" => Some(ItemStatus::Revoked),
			_ => None,
		}
	}
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(Pg))]
pub struct Item {
	pub id: Uuid,
	pub user_id: Uuid,
	pub plaid_item_id: String,
	#[serde(skip_serializing)]
	pub access_token: String,
	pub institution_id: Option<String>,
	pub institution_name: Option<String>,
	pub status: String,
	pub webhook_url: Option<String>,
	pub consent: Option<String>,
	pub error: Option<String>,
	pub transaction_cursor: Option<String>,
	pub last_success_sync: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Item {
	pub fn status(&self) -> Option<ItemStatus> {
		ItemStatus::parse(&self.status)
	}
}

#[derive(Insertable)]
#[diesel(table_name = items)]
pub struct NewItem<'a> {
	pub id: Uuid,
	pub user_id: Uuid,
	pub plaid_item_id: &'a str,
	pub access_token: &'a str,
	pub institution_id: Option<&'a str>,
	pub institution_name: Option<&'a str>,
	pub status: &'a str,
	pub webhook_url: Option<&'a str>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl<'a> NewItem<'a> {
	pub fn new(user_id: Uuid, plaid_item_id: &'a str, access_token: &'a str) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			user_id,
			plaid_item_id,
			access_token,
			institution_id: None,
			institution_name: None,
			status: ItemStatus::Active.as_str(),
			webhook_url: None,
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(Pg))]
pub struct Account {
	pub id: Uuid,
	pub item_id: Uuid,
	pub user_id: Uuid,
	pub plaid_account_id: String,
	pub name: String,
	pub official_name: Option<String>,
	#[serde(rename = "type")]
	pub account_type: String,
	pub subtype: Option<String>,
	pub mask: Option<String>,
	pub available_balance: Option<BigDecimal>,
	pub current_balance: Option<BigDecimal>,
	pub currency_code: Option<String>,
	pub last_updated: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
	pub id: Uuid,
	pub item_id: Uuid,
	pub user_id: Uuid,
	pub plaid_account_id: String,
	pub name: String,
	pub official_name: Option<String>,
	pub account_type: String,
	pub subtype: Option<String>,
	pub mask: Option<String>,
	pub available_balance: Option<BigDecimal>,
	pub current_balance: Option<BigDecimal>,
	pub currency_code: Option<String>,
	pub last_updated: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Columns overwritten when a vendor account is seen again.
#[derive(AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(treat_none_as_null = true)]
pub struct AccountRefresh<'a> {
	pub name: &'a str,
	pub official_name: Option<&'a str>,
	pub account_type: &'a str,
	pub subtype: Option<&'a str>,
	pub mask: Option<&'a str>,
	pub available_balance: Option<&'a BigDecimal>,
	pub current_balance: Option<&'a BigDecimal>,
	pub currency_code: Option<&'a str>,
	pub last_updated: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a NewAccount> for AccountRefresh<'a> {
	fn from(account: &'a NewAccount) -> Self {
		Self {
			name: &account.name,
			official_name: account.official_name.as_deref(),
			account_type: &account.account_type,
			subtype: account.subtype.as_deref(),
			mask: account.mask.as_deref(),
			available_balance: account.available_balance.as_ref(),
			current_balance: account.current_balance.as_ref(),
			currency_code: account.currency_code.as_deref(),
			last_updated: account.last_updated,
			updated_at: account.updated_at,
		}
	}
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(Pg))]
pub struct Transaction {
	pub id: Uuid,
	pub account_id: Uuid,
	pub user_id: Uuid,
	pub plaid_transaction_id: String,
	pub category_id: Option<String>,
	pub category: Option<Vec<String>>,
	pub name: String,
	pub merchant_name: Option<String>,
	pub amount: BigDecimal,
	pub iso_currency_code: Option<String>,
	pub date: NaiveDate,
	pub pending: bool,
	pub payment_channel: Option<String>,
	pub address: Option<String>,
	pub city: Option<String>,
	pub region: Option<String>,
	pub postal_code: Option<String>,
	pub country: Option<String>,
	pub latitude: Option<BigDecimal>,
	pub longitude: Option<BigDecimal>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
	pub id: Uuid,
	pub account_id: Uuid,
	pub user_id: Uuid,
	pub plaid_transaction_id: String,
	pub category_id: Option<String>,
	pub category: Option<Vec<String>>,
	pub name: String,
	pub merchant_name: Option<String>,
	pub amount: BigDecimal,
	pub iso_currency_code: Option<String>,
	pub date: NaiveDate,
	pub pending: bool,
	pub payment_channel: Option<String>,
	pub address: Option<String>,
	pub city: Option<String>,
	pub region: Option<String>,
	pub postal_code: Option<String>,
	pub country: Option<String>,
	pub latitude: Option<BigDecimal>,
	pub longitude: Option<BigDecimal>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Columns overwritten when a vendor transaction is upserted, e.g. on the
/// pending to settled transition.
#[derive(AsChangeset)]
#[diesel(table_name = transactions)]
#[diesel(treat_none_as_null = true)]
pub struct TransactionRefresh<'a> {
	pub account_id: Uuid,
	pub category_id: Option<&'a str>,
	pub category: Option<&'a Vec<String>>,
	pub name: &'a str,
	pub merchant_name: Option<&'a str>,
	pub amount: &'a BigDecimal,
	pub iso_currency_code: Option<&'a str>,
	pub date: NaiveDate,
	pub pending: bool,
	pub payment_channel: Option<&'a str>,
	pub address: Option<&'a str>,
	pub city: Option<&'a str>,
	pub region: Option<&'a str>,
	pub postal_code: Option<&'a str>,
	pub country: Option<&'a str>,
	pub latitude: Option<&'a BigDecimal>,
	pub longitude: Option<&'a BigDecimal>,
	pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a NewTransaction> for TransactionRefresh<'a> {
	fn from(tx: &'a NewTransaction) -> Self {
		Self {
			account_id: tx.account_id,
			category_id: tx.category_id.as_deref(),
			category: tx.category.as_ref(),
			name: &tx.name,
			merchant_name: tx.merchant_name.as_deref(),
			amount: &tx.amount,
			iso_currency_code: tx.iso_currency_code.as_deref(),
			date: tx.date,
			pending: tx.pending,
			payment_channel: tx.payment_channel.as_deref(),
			address: tx.address.as_deref(),
			city: tx.city.as_deref(),
			region: tx.region.as_deref(),
			postal_code: tx.postal_code.as_deref(),
			country: tx.country.as_deref(),
			latitude: tx.latitude.as_ref(),
			longitude: tx.longitude.as_ref(),
			updated_at: tx.updated_at,
		}
	}
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = plaid_api_events)]
#[diesel(check_for_backend(Pg))]
pub struct PlaidApiEvent {
	pub id: Uuid,
	pub user_id: Uuid,
	pub item_id: Option<Uuid>,
	pub endpoint: String,
	pub request_body: Value,
	pub response_body: Option<Value>,
	pub status_code: Option<i32>,
	pub error_code: Option<String>,
	pub error_message: Option<String>,
	pub request_id: Option<String>,
	pub request_time: DateTime<Utc>,
	pub response_time: Option<DateTime<Utc>>,
	pub execution_time: Option<i32>,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = plaid_api_events)]
pub struct NewPlaidApiEvent {
	pub id: Uuid,
	pub user_id: Uuid,
	pub item_id: Option<Uuid>,
	pub endpoint: String,
	pub request_body: Value,
	pub response_body: Option<Value>,
	pub status_code: Option<i32>,
	pub error_code: Option<String>,
	pub error_message: Option<String>,
	pub request_id: Option<String>,
	pub request_time: DateTime<Utc>,
	pub response_time: Option<DateTime<Utc>>,
	pub execution_time: Option<i32>,
	pub created_at: DateTime<Utc>,
}

impl NewPlaidApiEvent {
	pub fn started(user_id: Uuid, item_id: Option<Uuid>, endpoint: &str, request_body: Value) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			user_id,
			item_id,
			endpoint: endpoint.to_string(),
			request_body,
			response_body: None,
			status_code: None,
			error_code: None,
			error_message: None,
			request_id: None,
			request_time: now,
			response_time: None,
			execution_time: None,
			created_at: now,
		}
	}

	pub fn finish(
		mut self,
		status_code: Option<u16>,
		response_body: Option<Value>,
		request_id: Option<String>,
		error_code: Option<String>,
		error_message: Option<String>,
	) -> Self {
		let now = Utc::now();
		self.status_code = status_code.map(i32::from);
		self.response_body = response_body;
		self.request_id = request_id;
		self.error_code = error_code;
		self.error_message = error_message;
		self.response_time = Some(now);
		self.execution_time =
			Some((now - self.request_time).num_milliseconds().clamp(0, i64::from(i32::MAX)) as i32);
		self
	}
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = link_events)]
#[diesel(check_for_backend(Pg))]
pub struct LinkEvent {
	pub id: Uuid,
	pub user_id: Uuid,
	pub item_id: Option<Uuid>,
	pub event_name: String,
	pub event_metadata: Value,
	pub link_session_id: String,
	pub request_id: Option<String>,
	pub error_code: Option<String>,
	pub error_message: Option<String>,
	pub status: String,
	pub institution_id: Option<String>,
	pub institution_name: Option<String>,
	pub timestamp: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = link_events)]
pub struct NewLinkEvent {
	pub id: Uuid,
	pub user_id: Uuid,
	pub item_id: Option<Uuid>,
	pub event_name: String,
	pub event_metadata: Value,
	pub link_session_id: String,
	pub request_id: Option<String>,
	pub error_code: Option<String>,
	pub error_message: Option<String>,
	pub status: String,
	pub institution_id: Option<String>,
	pub institution_name: Option<String>,
	pub timestamp: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

// Request and response bodies

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
	if password.len() > MAX_PASSWORD_BYTES {
		return Err(ValidationError::new("password_too_long")
			.with_message(format!("must be at most {} bytes", MAX_PASSWORD_BYTES).into()));
	}
	Ok(())
}

#[derive(Serialize, Deserialize, Validate)]
pub struct SignupRequest {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 6), custom(function = "validate_password_bytes"))]
	pub password: String,
	#[validate(length(min = 1, max = 255))]
	pub first_name: String,
	#[validate(length(min = 1, max = 255))]
	pub last_name: String,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct LoginRequest {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1))]
	pub password: String,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct RefreshRequest {
	#[validate(length(min = 1))]
	pub refresh_token: String,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
	#[validate(length(min = 1, max = 255))]
	pub first_name: Option<String>,
	#[validate(length(min = 1, max = 255))]
	pub last_name: Option<String>,
	#[validate(email)]
	pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
	pub token: String,
	pub refresh_token: String,
	pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
	pub user: User,
}

#[derive(Serialize, Deserialize, Validate, Default)]
pub struct CreateLinkTokenRequest {
	#[validate(length(min = 1, max = 30))]
	pub client_name: Option<String>,
	#[serde(default)]
	pub products: Vec<String>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct ExchangePublicTokenRequest {
	#[validate(length(min = 1))]
	pub public_token: String,
	pub institution_id: Option<String>,
	pub institution_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkedItemResponse {
	pub item: Item,
	pub accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
	pub item_id: Uuid,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct TransactionsRequest {
	pub item_id: Uuid,
	/// YYYY-MM-DD
	#[validate(length(equal = 10))]
	pub start_date: String,
	/// YYYY-MM-DD
	#[validate(length(equal = 10))]
	pub end_date: String,
	#[validate(range(min = 1, max = 500))]
	pub count: Option<u32>,
	pub offset: Option<u32>,
}

#[derive(Serialize, Deserialize)]
pub struct SyncTransactionsRequest {
	pub item_id: Uuid,
	/// Falls back to the cursor stored on the item when absent.
	pub cursor: Option<String>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct UpdateItemWebhookRequest {
	pub item_id: Uuid,
	#[validate(url, length(max = 255))]
	pub webhook_url: String,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct LinkEventRequest {
	#[validate(length(min = 1, max = 255))]
	pub event_name: String,
	#[serde(default)]
	pub metadata: Value,
	#[validate(length(min = 1, max = 255))]
	pub link_session_id: String,
	pub item_id: Option<Uuid>,
	pub request_id: Option<String>,
	pub error_code: Option<String>,
	pub error_message: Option<String>,
	pub status: Option<String>,
	pub institution_id: Option<String>,
	pub institution_name: Option<String>,
	pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkTokenResponse {
	pub link_token: String,
	pub expiration: String,
}

/// What a `/transactions/sync` call changed locally.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SyncSummary {
	pub added: usize,
	pub modified: usize,
	pub removed: usize,
	/// Vendor rows for accounts this service has not stored yet.
	pub skipped: usize,
	pub next_cursor: String,
	pub has_more: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookError {
	pub error_code: Option<String>,
	pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaidWebhook {
	pub webhook_type: String,
	pub webhook_code: String,
	pub item_id: Option<String>,
	pub error: Option<WebhookError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
	pub environment: String,
	pub database: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct Pagination {
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
	pub status: String,
	pub data: Option<T>,
	pub error: Option<String>,
}

impl<T> ApiResponse<T> {
	pub fn success(data: T) -> Self {
		Self { status: "success".to_string(), data: Some(data), error: None }
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self { status: "error".to_string(), data: None, error: Some(message.into()) }
	}
}
