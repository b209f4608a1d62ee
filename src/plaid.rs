use crate::{
	config::PlaidConfig,
	models::{NewAccount, NewTransaction},
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use log::{error, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PlaidError {
	#[error("Plaid request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Plaid {error_type} {error_code}: {error_message}")]
	Api {
		status: u16,
		error_type: String,
		error_code: String,
		error_message: String,
		request_id: Option<String>,
	},
}

impl PlaidError {
	pub fn status_code(&self) -> Option<u16> {
		match self {
			PlaidError::Api { status, .. } => Some(*status),
			PlaidError::Http(e) => e.status().map(|s| s.as_u16()),
		}
	}

	pub fn error_code(&self) -> Option<&str> {
		match self {
			PlaidError::Api { error_code, .. } => Some(error_code),
			PlaidError::Http(_) => None,
		}
	}

	pub fn request_id(&self) -> Option<&str> {
		match self {
			PlaidError::Api { request_id, .. } => request_id.as_deref(),
			PlaidError::Http(_) => None,
		}
	}
}

pub mod endpoints {
	pub const LINK_TOKEN_CREATE: &str = "/link/token/create";
	pub const PUBLIC_TOKEN_EXCHANGE: &str = "/item/public_token/exchange";
	pub const ACCOUNTS_GET: &str = "/accounts/get";
	pub const TRANSACTIONS_GET: &str = "/transactions/get";
	pub const TRANSACTIONS_SYNC: &str = "/transactions/sync";
	pub const ITEM_GET: &str = "/item/get";
	pub const ITEM_WEBHOOK_UPDATE: &str = "/item/webhook/update";
}

const REDACTED_FIELDS: [&str; 3] = ["access_token", "public_token", "secret"];

/// Masks credentials in a top-level JSON object before it is logged or stored.
pub fn redact(value: Value) -> Value {
	match value {
		Value::Object(mut fields) => {
			for key in REDACTED_FIELDS {
				if let Some(field) = fields.get_mut(key) {
					*field = Value::String("[redacted]".to_string());
				}
			}
			Value::Object(fields)
		},
		other => other,
	}
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
	#[serde(default)]
	error_type: String,
	#[serde(default)]
	error_code: String,
	#[serde(default)]
	error_message: String,
	request_id: Option<String>,
}

// Wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTokenRequest {
	pub client_user_id: String,
	pub client_name: String,
	pub products: Vec<String>,
	pub webhook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTokenCreateResponse {
	pub link_token: String,
	pub expiration: String,
	pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTokenExchangeResponse {
	pub access_token: String,
	pub item_id: String,
	pub request_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaidBalances {
	pub available: Option<f64>,
	pub current: Option<f64>,
	pub limit: Option<f64>,
	pub iso_currency_code: Option<String>,
	pub unofficial_currency_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidAccount {
	pub account_id: String,
	pub name: String,
	pub official_name: Option<String>,
	pub mask: Option<String>,
	#[serde(rename = "type")]
	pub account_type: String,
	pub subtype: Option<String>,
	#[serde(default)]
	pub balances: PlaidBalances,
}

impl PlaidAccount {
	pub fn to_new_account(&self, item_id: Uuid, user_id: Uuid) -> NewAccount {
		let now = Utc::now();
		NewAccount {
			id: Uuid::new_v4(),
			item_id,
			user_id,
			plaid_account_id: self.account_id.clone(),
			name: self.name.clone(),
			official_name: self.official_name.clone(),
			account_type: self.account_type.clone(),
			subtype: self.subtype.clone(),
			mask: self.mask.clone(),
			available_balance: self.balances.available.and_then(to_decimal),
			current_balance: self.balances.current.and_then(to_decimal),
			currency_code: self
				.balances
				.iso_currency_code
				.clone()
				.or_else(|| self.balances.unofficial_currency_code.clone()),
			last_updated: now,
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaidLocation {
	pub address: Option<String>,
	pub city: Option<String>,
	pub region: Option<String>,
	pub postal_code: Option<String>,
	pub country: Option<String>,
	pub lat: Option<f64>,
	pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidTransaction {
	pub transaction_id: String,
	pub account_id: String,
	/// Positive values are money leaving the account.
	pub amount: f64,
	pub iso_currency_code: Option<String>,
	pub date: NaiveDate,
	pub name: String,
	pub merchant_name: Option<String>,
	#[serde(default)]
	pub pending: bool,
	pub category: Option<Vec<String>>,
	pub category_id: Option<String>,
	pub payment_channel: Option<String>,
	#[serde(default)]
	pub location: PlaidLocation,
}

impl PlaidTransaction {
	/// `None` when the amount is not a finite number.
	pub fn to_new_transaction(&self, account_id: Uuid, user_id: Uuid) -> Option<NewTransaction> {
		let now = Utc::now();
		Some(NewTransaction {
			id: Uuid::new_v4(),
			account_id,
			user_id,
			plaid_transaction_id: self.transaction_id.clone(),
			category_id: self.category_id.clone(),
			category: self.category.clone(),
			name: self.name.clone(),
			merchant_name: self.merchant_name.clone(),
			amount: to_decimal(self.amount)?,
			iso_currency_code: self.iso_currency_code.clone(),
			date: self.date,
			pending: self.pending,
			payment_channel: self.payment_channel.clone(),
			address: self.location.address.clone(),
			city: self.location.city.clone(),
			region: self.location.region.clone(),
			postal_code: self.location.postal_code.clone(),
			country: self.location.country.clone(),
			latitude: self.location.lat.and_then(to_decimal),
			longitude: self.location.lon.and_then(to_decimal),
			created_at: now,
			updated_at: now,
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedTransaction {
	pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsGetResponse {
	pub accounts: Vec<PlaidAccount>,
	#[serde(default)]
	pub item: Value,
	pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsGetResponse {
	#[serde(default)]
	pub accounts: Vec<PlaidAccount>,
	pub transactions: Vec<PlaidTransaction>,
	pub total_transactions: u32,
	pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsSyncResponse {
	#[serde(default)]
	pub added: Vec<PlaidTransaction>,
	#[serde(default)]
	pub modified: Vec<PlaidTransaction>,
	#[serde(default)]
	pub removed: Vec<RemovedTransaction>,
	pub next_cursor: String,
	pub has_more: bool,
	pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidItem {
	pub item_id: String,
	pub institution_id: Option<String>,
	pub webhook: Option<String>,
	pub error: Option<Value>,
	#[serde(default)]
	pub available_products: Vec<String>,
	#[serde(default)]
	pub billed_products: Vec<String>,
	pub consent_expiration_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemGetResponse {
	pub item: PlaidItem,
	pub status: Option<Value>,
	pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWebhookUpdateResponse {
	pub item: PlaidItem,
	pub request_id: String,
}

/// Every vendor response carries the id Plaid support asks for.
pub trait PlaidResponse {
	fn request_id(&self) -> &str;
}

macro_rules! impl_plaid_response {
	($($ty:ty),*) => {
		$(impl PlaidResponse for $ty {
			fn request_id(&self) -> &str {
				&self.request_id
			}
		})*
	};
}

impl_plaid_response!(
	LinkTokenCreateResponse,
	PublicTokenExchangeResponse,
	AccountsGetResponse,
	TransactionsGetResponse,
	TransactionsSyncResponse,
	ItemGetResponse,
	ItemWebhookUpdateResponse
);

/// Vendor operations the HTTP layer depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaidGateway: Send + Sync {
	async fn create_link_token(
		&self,
		request: &LinkTokenRequest,
	) -> Result<LinkTokenCreateResponse, PlaidError>;

	async fn exchange_public_token(
		&self,
		public_token: &str,
	) -> Result<PublicTokenExchangeResponse, PlaidError>;

	async fn get_accounts(&self, access_token: &str) -> Result<AccountsGetResponse, PlaidError>;

	async fn get_transactions(
		&self,
		access_token: &str,
		start_date: NaiveDate,
		end_date: NaiveDate,
		count: Option<u32>,
		offset: Option<u32>,
	) -> Result<TransactionsGetResponse, PlaidError>;

	async fn sync_transactions(
		&self,
		access_token: &str,
		cursor: Option<String>,
	) -> Result<TransactionsSyncResponse, PlaidError>;

	async fn get_item(&self, access_token: &str) -> Result<ItemGetResponse, PlaidError>;

	async fn update_item_webhook(
		&self,
		access_token: &str,
		webhook_url: &str,
	) -> Result<ItemWebhookUpdateResponse, PlaidError>;
}

pub struct PlaidClient {
	http: reqwest::Client,
	base_url: String,
	client_id: String,
	secret: String,
}

impl PlaidClient {
	pub fn new(config: &PlaidConfig) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: config.base_url.clone(),
			client_id: config.client_id.clone(),
			secret: config.secret.clone(),
		}
	}

	async fn post<T: DeserializeOwned>(&self, endpoint: &str, mut body: Value) -> Result<T, PlaidError> {
		if let Value::Object(fields) = &mut body {
			fields.insert("client_id".to_string(), Value::String(self.client_id.clone()));
			fields.insert("secret".to_string(), Value::String(self.secret.clone()));
		}

		let res = self
			.http
			.post(format!("{}{}", self.base_url, endpoint))
			.json(&body)
			.send()
			.await
			.inspect_err(|e| error!("Request to Plaid {} failed: {}", endpoint, e))?;

		let status = res.status();
		if status.is_success() {
			return Ok(res.json::<T>().await?);
		}

		let body = res.json::<ErrorBody>().await.unwrap_or_default();
		warn!("Plaid {} returned {}: {} {}", endpoint, status, body.error_code, body.error_message);
		Err(PlaidError::Api {
			status: status.as_u16(),
			error_type: body.error_type,
			error_code: body.error_code,
			error_message: body.error_message,
			request_id: body.request_id,
		})
	}
}

#[async_trait]
impl PlaidGateway for PlaidClient {
	async fn create_link_token(
		&self,
		request: &LinkTokenRequest,
	) -> Result<LinkTokenCreateResponse, PlaidError> {
		let mut body = json!({
			"client_name": request.client_name,
			"language": "en",
			"country_codes": ["US"],
			"user": { "client_user_id": request.client_user_id },
			"products": request.products,
		});
		if let Some(webhook) = &request.webhook {
			body["webhook"] = Value::String(webhook.clone());
		}
		self.post(endpoints::LINK_TOKEN_CREATE, body).await
	}

	async fn exchange_public_token(
		&self,
		public_token: &str,
	) -> Result<PublicTokenExchangeResponse, PlaidError> {
		self.post(endpoints::PUBLIC_TOKEN_EXCHANGE, json!({ "public_token": public_token })).await
	}

	async fn get_accounts(&self, access_token: &str) -> Result<AccountsGetResponse, PlaidError> {
		self.post(endpoints::ACCOUNTS_GET, json!({ "access_token": access_token })).await
	}

	async fn get_transactions(
		&self,
		access_token: &str,
		start_date: NaiveDate,
		end_date: NaiveDate,
		count: Option<u32>,
		offset: Option<u32>,
	) -> Result<TransactionsGetResponse, PlaidError> {
		let mut body = json!({
			"access_token": access_token,
			"start_date": start_date.format("%Y-%m-%d").to_string(),
			"end_date": end_date.format("%Y-%m-%d").to_string(),
		});
		if count.is_some() || offset.is_some() {
			let mut options = serde_json::Map::new();
			if let Some(count) = count {
				options.insert("count".to_string(), json!(count));
			}
			if let Some(offset) = offset {
				options.insert("offset".to_string(), json!(offset));
			}
			body["options"] = Value::Object(options);
		}
		self.post(endpoints::TRANSACTIONS_GET, body).await
	}

	async fn sync_transactions(
		&self,
		access_token: &str,
		cursor: Option<String>,
	) -> Result<TransactionsSyncResponse, PlaidError> {
		let mut body = json!({ "access_token": access_token });
		if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
			body["cursor"] = Value::String(cursor);
		}
		self.post(endpoints::TRANSACTIONS_SYNC, body).await
	}

	async fn get_item(&self, access_token: &str) -> Result<ItemGetResponse, PlaidError> {
		self.post(endpoints::ITEM_GET, json!({ "access_token": access_token })).await
	}

	async fn update_item_webhook(
		&self,
		access_token: &str,
		webhook_url: &str,
	) -> Result<ItemWebhookUpdateResponse, PlaidError> {
		self.post(endpoints::ITEM_WEBHOOK_UPDATE, json!({ "access_token": access_token, "webhook": webhook_url }))
			.await
	}
}

/// Accepts every webhook.
///
/// Real verification decodes the `Plaid-Verification` JWT, fetches its key
/// from `/webhook_verification_key/get` and compares the SHA-256 of `body`.
/// Until that exists, forged webhooks are indistinguishable from real ones.
pub fn verify_webhook(verification_header: Option<&str>, body: &[u8]) -> bool {
	warn!(
		"Webhook verification is not implemented; accepting {} bytes (header present: {})",
		body.len(),
		verification_header.is_some()
	);
	true
}

fn to_decimal(value: f64) -> Option<BigDecimal> {
	if !value.is_finite() {
		return None;
	}
	BigDecimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::PlaidEnvironment;
	use actix_web::{web, App, HttpResponse};

	fn client_for(srv: &actix_test::TestServer) -> PlaidClient {
		PlaidClient::new(&PlaidConfig {
			client_id: "client-id".to_string(),
			secret: "sandbox-secret".to_string(),
			environment: PlaidEnvironment::Sandbox,
			base_url: srv.url("/").trim_end_matches('/').to_string(),
			client_name: "Finance API".to_string(),
			webhook_url: None,
		})
	}

	fn has_credentials(body: &Value) -> bool {
		body["client_id"] == "client-id" && body["secret"] == "sandbox-secret"
	}

	async fn link_token(body: web::Json<Value>) -> HttpResponse {
		if !has_credentials(&body) || body["user"]["client_user_id"] != "user-1" {
			return HttpResponse::BadRequest().json(json!({
				"error_type": "INVALID_REQUEST",
				"error_code": "MISSING_FIELDS",
				"error_message": "missing credentials",
				"request_id": "req-bad",
			}));
		}
		HttpResponse::Ok().json(json!({
			"link_token": "link-sandbox-123",
			"expiration": "2026-10-19T12:00:00Z",
			"request_id": "req-1",
		}))
	}

	async fn exchange(_body: web::Json<Value>) -> HttpResponse {
		HttpResponse::BadRequest().json(json!({
			"error_type": "INVALID_INPUT",
			"error_code": "INVALID_PUBLIC_TOKEN",
			"error_message": "provided public token is in an invalid format",
			"request_id": "req-2",
		}))
	}

	async fn sync(body: web::Json<Value>) -> HttpResponse {
		let cursor = body["cursor"].as_str().unwrap_or("").to_string();
		HttpResponse::Ok().json(json!({
			"added": [{
				"transaction_id": "tx-1",
				"account_id": "acc-1",
				"amount": 12.5,
				"iso_currency_code": "USD",
				"date": "2026-10-01",
				"name": "Coffee",
				"merchant_name": "Bean Bar",
				"pending": true,
				"category": ["Food and Drink", "Coffee"],
				"category_id": "13005043",
				"payment_channel": "in store",
				"location": { "city": "Austin", "region": "TX", "lat": 30.27, "lon": -97.74 },
			}],
			"modified": [],
			"removed": [{ "transaction_id": "tx-0" }],
			"next_cursor": format!("{}next", cursor),
			"has_more": false,
			"request_id": "req-3",
		}))
	}

	fn fake_plaid() -> actix_test::TestServer {
		actix_test::start(|| {
			App::new()
				.route("/link/token/create", web::post().to(link_token))
				.route("/item/public_token/exchange", web::post().to(exchange))
				.route("/transactions/sync", web::post().to(sync))
		})
	}

	#[actix_web::test]
	async fn creates_link_token_with_credentials() {
		let srv = fake_plaid();
		let client = client_for(&srv);
		let res = client
			.create_link_token(&LinkTokenRequest {
				client_user_id: "user-1".to_string(),
				client_name: "Finance API".to_string(),
				products: vec!["transactions".to_string()],
				webhook: None,
			})
			.await
			.unwrap();
		assert_eq!(res.link_token, "link-sandbox-123");
		assert_eq!(res.request_id, "req-1");
	}

	#[actix_web::test]
	async fn surfaces_vendor_error_fields() {
		let srv = fake_plaid();
		let client = client_for(&srv);
		let err = client.exchange_public_token("public-bad").await.unwrap_err();
		assert_eq!(err.status_code(), Some(400));
		assert_eq!(err.error_code(), Some("INVALID_PUBLIC_TOKEN"));
		assert_eq!(err.request_id(), Some("req-2"));
		assert!(err.to_string().contains("provided public token is in an invalid format"));
	}

	#[actix_web::test]
	async fn sync_passes_cursor_through() {
		let srv = fake_plaid();
		let client = client_for(&srv);
		let res = client.sync_transactions("access-1", Some("abc".to_string())).await.unwrap();
		assert_eq!(res.next_cursor, "abcnext");
		assert_eq!(res.added.len(), 1);
		assert_eq!(res.removed[0].transaction_id, "tx-0");

		let first = client.sync_transactions("access-1", None).await.unwrap();
		assert_eq!(first.next_cursor, "next");
	}

	#[test]
	fn converts_vendor_transaction() {
		let tx: PlaidTransaction = serde_json::from_value(json!({
			"transaction_id": "tx-1",
			"account_id": "acc-1",
			"amount": 12.5,
			"date": "2026-10-01",
			"name": "Coffee",
			"pending": false,
			"location": { "lat": 30.27 },
		}))
		.unwrap();
		let account_id = Uuid::new_v4();
		let new_tx = tx.to_new_transaction(account_id, Uuid::new_v4()).unwrap();
		assert_eq!(new_tx.account_id, account_id);
		assert_eq!(new_tx.amount, BigDecimal::from_str("12.5").unwrap());
		assert_eq!(new_tx.latitude, Some(BigDecimal::from_str("30.27").unwrap()));
		assert_eq!(new_tx.longitude, None);
		assert_eq!(new_tx.date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
	}

	#[test]
	fn converts_vendor_account() {
		let account: PlaidAccount = serde_json::from_value(json!({
			"account_id": "acc-1",
			"name": "Plaid Checking",
			"mask": "0000",
			"type": "depository",
			"subtype": "checking",
			"balances": { "available": 100.0, "current": 110.01, "iso_currency_code": "USD" },
		}))
		.unwrap();
		let new_account = account.to_new_account(Uuid::new_v4(), Uuid::new_v4());
		assert_eq!(new_account.account_type, "depository");
		assert_eq!(new_account.current_balance, Some(BigDecimal::from_str("110.01").unwrap()));
		assert_eq!(new_account.currency_code.as_deref(), Some("USD"));
	}

	#[test]
	fn non_finite_amounts_are_dropped() {
		assert!(to_decimal(f64::NAN).is_none());
		assert!(to_decimal(f64::INFINITY).is_none());
	}

	#[test]
	fn redacts_credentials() {
		let body = redact(json!({ "access_token": "access-sandbox-1", "cursor": "c1" }));
		assert_eq!(body["access_token"], "[redacted]");
		assert_eq!(body["cursor"], "c1");
		assert!(body.get("secret").is_none());
	}

	#[test]
	fn webhook_verification_is_permissive() {
		assert!(verify_webhook(None, b"{}"));
		assert!(verify_webhook(Some("eyJhbGciOiJFUzI1NiJ9"), b"{}"));
	}
}
