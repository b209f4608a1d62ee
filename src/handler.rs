use crate::{
	config::AppConfig,
	constants::{
		DEFAULT_PLAID_PRODUCT, MESSAGE_INVALID_CREDENTIALS, MESSAGE_ITEM_NOT_FOUND,
		MESSAGE_USER_NOT_FOUND, PLAID_VERIFICATION_HEADER, SUPPORTED_PLAID_PRODUCTS,
	},
	credentials::{hash_password, verify_password},
	db::{self, DbPool},
	errors::ApiError,
	midware::jwt::{AuthenticatedUser, JWT},
	models::{
		Account, ApiResponse, AuthResponse, CreateLinkTokenRequest, ExchangePublicTokenRequest,
		Item, ItemQuery, ItemStatus, LinkEventRequest, LinkTokenResponse, LinkedItemResponse,
		LoginRequest, MeResponse, NewItem, NewLinkEvent, NewPlaidApiEvent, NewUser, Pagination,
		PlaidWebhook, ProfileUpdate, RefreshRequest, ServiceStatus, SignupRequest,
		SyncSummary, SyncTransactionsRequest, TransactionsRequest, UpdateItemWebhookRequest,
		User, UserChanges,
	},
	plaid::{
		endpoints, redact, verify_webhook, LinkTokenRequest, PlaidError, PlaidGateway,
		PlaidResponse, PlaidTransaction, TransactionsSyncResponse,
	},
	repo::{
		blocking, AccountRepo, EventRepo, ItemRepo, RepoError, TransactionRepo, UserRepo,
	},
};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

fn issue_tokens(jwt: &JWT, user: User) -> Result<AuthResponse, ApiError> {
	let token = jwt.create_jwt(&user)?;
	let refresh_token = jwt.create_refresh_jwt(user.id)?;
	Ok(AuthResponse { token, refresh_token, user })
}

fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

pub struct UserHandler;

impl UserHandler {
	pub async fn signup_handler(
		pool: web::Data<DbPool>,
		jwt: web::Data<JWT>,
		req: web::Json<SignupRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let SignupRequest { email, password, first_name, last_name } = req.into_inner();
		let email = normalize_email(&email);
		log::info!("Signup attempt for email: {}", email);

		let password_hash = web::block(move || hash_password(&password)).await??;
		let user = blocking(&pool, move |pool| {
			UserRepo::new(pool).create(&NewUser::new(
				&email,
				&password_hash,
				Some(first_name.trim()),
				Some(last_name.trim()),
			))
		})
		.await?;

		log::info!("Created user {}", user.id);
		Ok(HttpResponse::Created().json(ApiResponse::success(issue_tokens(&jwt, user)?)))
	}

	pub async fn login_handler(
		pool: web::Data<DbPool>,
		jwt: web::Data<JWT>,
		req: web::Json<LoginRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let LoginRequest { email, password } = req.into_inner();
		let email = normalize_email(&email);

		let lookup = email.clone();
		let user = match blocking(&pool, move |pool| UserRepo::new(pool).find_by_email(&lookup)).await? {
			Some(user) => user,
			None => {
				log::warn!("Login failed, unknown email: {}", email);
				return Err(ApiError::unauthorized(MESSAGE_INVALID_CREDENTIALS));
			},
		};

		let password_hash = user.password_hash.clone();
		if !web::block(move || verify_password(&password, &password_hash)).await? {
			log::warn!("Login failed, wrong password for user {}", user.id);
			return Err(ApiError::unauthorized(MESSAGE_INVALID_CREDENTIALS));
		}

		log::info!("Login successful for user {}", user.id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(issue_tokens(&jwt, user)?)))
	}

	pub async fn refresh_handler(
		pool: web::Data<DbPool>,
		jwt: web::Data<JWT>,
		req: web::Json<RefreshRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let user_id = jwt.verify_refresh_jwt(&req.refresh_token)?.user_id()?;

		let user = blocking(&pool, move |pool| UserRepo::new(pool).find_by_id(user_id))
			.await?
			.ok_or_else(|| ApiError::not_found(MESSAGE_USER_NOT_FOUND))?;

		log::info!("Refreshed tokens for user {}", user.id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(issue_tokens(&jwt, user)?)))
	}

	pub async fn me_handler(
		pool: web::Data<DbPool>,
		auth: AuthenticatedUser,
	) -> Result<HttpResponse, ApiError> {
		let user = blocking(&pool, move |pool| UserRepo::new(pool).find_by_id(auth.id))
			.await?
			.ok_or_else(|| ApiError::not_found(MESSAGE_USER_NOT_FOUND))?;
		Ok(HttpResponse::Ok().json(ApiResponse::success(MeResponse { user })))
	}

	pub async fn update_profile_handler(
		pool: web::Data<DbPool>,
		auth: AuthenticatedUser,
		req: web::Json<ProfileUpdate>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let ProfileUpdate { first_name, last_name, email } = req.into_inner();
		let email = email.as_deref().map(normalize_email);

		let user = blocking(&pool, move |pool| {
			UserRepo::new(pool).update_profile(
				auth.id,
				&UserChanges {
					email: email.as_deref(),
					first_name: first_name.as_deref().map(str::trim),
					last_name: last_name.as_deref().map(str::trim),
					updated_at: Utc::now(),
				},
			)
		})
		.await?
		.ok_or_else(|| ApiError::not_found(MESSAGE_USER_NOT_FOUND))?;

		log::info!("Updated profile for user {}", user.id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(MeResponse { user })))
	}
}

/// Loads an item, hiding other users' items behind the same 404.
async fn owned_item(
	pool: &web::Data<DbPool>,
	item_id: Uuid,
	user_id: Uuid,
) -> Result<Item, ApiError> {
	blocking(pool, move |pool| ItemRepo::new(pool).find_by_id(item_id))
		.await?
		.filter(|item| item.user_id == user_id)
		.ok_or_else(|| ApiError::not_found(MESSAGE_ITEM_NOT_FOUND))
}

/// Appends the outcome of a vendor call to the audit log. Losing an audit
/// row never fails the request.
async fn record_call<T>(
	pool: &web::Data<DbPool>,
	event: NewPlaidApiEvent,
	result: &Result<T, PlaidError>,
) where
	T: PlaidResponse + Serialize,
{
	let event = match result {
		Ok(res) => event.finish(
			Some(200),
			serde_json::to_value(res).ok().map(redact),
			Some(res.request_id().to_string()),
			None,
			None,
		),
		Err(e) => event.finish(
			e.status_code(),
			None,
			e.request_id().map(str::to_string),
			e.error_code().map(str::to_string),
			Some(e.to_string()),
		),
	};
	let endpoint = event.endpoint.clone();
	if let Err(e) = blocking(pool, move |pool| EventRepo::new(pool).create_api_event(&event)).await {
		log::error!("Failed to record Plaid call to {}: {}", endpoint, e);
	}
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.map_err(|_| ApiError::bad_request(format!("Invalid {} format. Use YYYY-MM-DD", field)))
}

fn store_transaction(
	repo: &TransactionRepo,
	accounts: &HashMap<String, Uuid>,
	user_id: Uuid,
	tx: &PlaidTransaction,
) -> Result<bool, RepoError> {
	let Some(account_id) = accounts.get(&tx.account_id) else {
		log::debug!("Skipping transaction {} for unknown account {}", tx.transaction_id, tx.account_id);
		return Ok(false);
	};
	match tx.to_new_transaction(*account_id, user_id) {
		Some(new_tx) => repo.upsert(&new_tx).map(|_| true),
		None => {
			log::warn!("Skipping transaction {} with unusable amount", tx.transaction_id);
			Ok(false)
		},
	}
}

/// Applies one page of vendor sync results and stores the next cursor.
pub fn persist_sync(
	pool: &DbPool,
	item: &Item,
	sync: &TransactionsSyncResponse,
) -> Result<SyncSummary, RepoError> {
	let accounts: HashMap<String, Uuid> = AccountRepo::new(pool)
		.list_by_item(item.id)?
		.into_iter()
		.map(|account| (account.plaid_account_id, account.id))
		.collect();
	let repo = TransactionRepo::new(pool);
	let mut summary = SyncSummary {
		next_cursor: sync.next_cursor.clone(),
		has_more: sync.has_more,
		..Default::default()
	};

	for tx in &sync.added {
		if store_transaction(&repo, &accounts, item.user_id, tx)? {
			summary.added += 1;
		} else {
			summary.skipped += 1;
		}
	}
	for tx in &sync.modified {
		if store_transaction(&repo, &accounts, item.user_id, tx)? {
			summary.modified += 1;
		} else {
			summary.skipped += 1;
		}
	}
	for removed in &sync.removed {
		summary.removed += repo.delete_by_plaid_transaction_id(&removed.transaction_id)?;
	}

	ItemRepo::new(pool).update_transaction_cursor(item.id, &sync.next_cursor)?;
	Ok(summary)
}

/// Status an item moves to for an ITEM webhook, if any.
pub fn item_status_for(webhook: &PlaidWebhook) -> Option<ItemStatus> {
	if webhook.webhook_type != "ITEM" {
		return None;
	}
	match webhook.webhook_code.as_str() {
		"ERROR" => {
			let login_required = webhook
				.error
				.as_ref()
				.and_then(|e| e.error_code.as_deref())
				.is_some_and(|code| code == "ITEM_LOGIN_REQUIRED");
			Some(if login_required { ItemStatus::LoginRequired } else { ItemStatus::Errored })
		},
		"PENDING_EXPIRATION" => Some(ItemStatus::PendingExpiration),
		"USER_PERMISSION_REVOKED" => Some(ItemStatus::Revoked),
		"LOGIN_REPAIRED" => Some(ItemStatus::Active),
		_ => None,
	}
}

pub struct PlaidHandler;

impl PlaidHandler {
	pub async fn create_link_token_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		config: web::Data<AppConfig>,
		auth: AuthenticatedUser,
		req: web::Json<CreateLinkTokenRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let CreateLinkTokenRequest { client_name, products } = req.into_inner();

		let products = if products.is_empty() {
			vec![DEFAULT_PLAID_PRODUCT.to_string()]
		} else {
			products
		};
		if let Some(unknown) = products.iter().find(|p| !SUPPORTED_PLAID_PRODUCTS.contains(&p.as_str()))
		{
			return Err(ApiError::bad_request(format!("Invalid product: {}", unknown)));
		}

		let request = LinkTokenRequest {
			client_user_id: auth.id.to_string(),
			client_name: client_name.unwrap_or_else(|| config.plaid.client_name.clone()),
			products,
			webhook: config.plaid.webhook_url.clone(),
		};
		let event = NewPlaidApiEvent::started(
			auth.id,
			None,
			endpoints::LINK_TOKEN_CREATE,
			serde_json::to_value(&request).unwrap_or(Value::Null),
		);
		let result = gateway.create_link_token(&request).await;
		record_call(&pool, event, &result).await;
		let res = result?;

		log::info!("Created link token for user {}", auth.id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(LinkTokenResponse {
			link_token: res.link_token,
			expiration: res.expiration,
		})))
	}

	pub async fn exchange_public_token_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		config: web::Data<AppConfig>,
		auth: AuthenticatedUser,
		req: web::Json<ExchangePublicTokenRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let ExchangePublicTokenRequest { public_token, institution_id, institution_name } =
			req.into_inner();

		let event = NewPlaidApiEvent::started(
			auth.id,
			None,
			endpoints::PUBLIC_TOKEN_EXCHANGE,
			redact(json!({ "public_token": public_token })),
		);
		let result = gateway.exchange_public_token(&public_token).await;
		record_call(&pool, event, &result).await;
		let exchange = result?;

		let access_token = exchange.access_token.clone();
		let webhook_url = config.plaid.webhook_url.clone();
		let item = blocking(&pool, move |pool| {
			let mut new_item = NewItem::new(auth.id, &exchange.item_id, &exchange.access_token);
			new_item.institution_id = institution_id.as_deref();
			new_item.institution_name = institution_name.as_deref();
			new_item.webhook_url = webhook_url.as_deref();
			ItemRepo::new(pool).create(&new_item)
		})
		.await?;
		log::info!("Linked item {} for user {}", item.id, auth.id);

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::ACCOUNTS_GET,
			redact(json!({ "access_token": access_token })),
		);
		let result = gateway.get_accounts(&access_token).await;
		record_call(&pool, event, &result).await;

		// The item is usable without its accounts; /accounts fills them in later.
		let accounts = match result {
			Ok(res) => {
				let (item_id, user_id) = (item.id, item.user_id);
				blocking(&pool, move |pool| {
					let repo = AccountRepo::new(pool);
					res.accounts
						.iter()
						.map(|account| repo.upsert(&account.to_new_account(item_id, user_id)))
						.collect::<Result<Vec<Account>, RepoError>>()
				})
				.await?
			},
			Err(e) => {
				log::error!("Fetching accounts for new item {} failed: {}", item.id, e);
				Vec::new()
			},
		};

		Ok(HttpResponse::Created().json(ApiResponse::success(LinkedItemResponse { item, accounts })))
	}

	pub async fn list_items_handler(
		pool: web::Data<DbPool>,
		auth: AuthenticatedUser,
		page: web::Query<Pagination>,
	) -> Result<HttpResponse, ApiError> {
		let page = page.into_inner();
		let items = blocking(&pool, move |pool| ItemRepo::new(pool).list_by_user(auth.id, page)).await?;
		Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
	}

	pub async fn get_accounts_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		auth: AuthenticatedUser,
		query: web::Query<ItemQuery>,
	) -> Result<HttpResponse, ApiError> {
		let item = owned_item(&pool, query.item_id, auth.id).await?;

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::ACCOUNTS_GET,
			redact(json!({ "access_token": item.access_token })),
		);
		let result = gateway.get_accounts(&item.access_token).await;
		record_call(&pool, event, &result).await;
		let res = result?;

		let (item_id, user_id) = (item.id, item.user_id);
		let accounts = blocking(&pool, move |pool| {
			let repo = AccountRepo::new(pool);
			res.accounts
				.iter()
				.map(|account| repo.upsert(&account.to_new_account(item_id, user_id)))
				.collect::<Result<Vec<Account>, RepoError>>()
		})
		.await?;

		log::info!("Refreshed {} accounts for item {}", accounts.len(), item_id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(accounts)))
	}

	pub async fn get_transactions_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		auth: AuthenticatedUser,
		req: web::Json<TransactionsRequest>,
	) -> Result<HttpResponse, ApiError> {
		let start_date = parse_date(&req.start_date, "start_date")?;
		let end_date = parse_date(&req.end_date, "end_date")?;
		req.validate()?;
		if start_date > end_date {
			return Err(ApiError::bad_request("start_date must not be after end_date"));
		}
		let item = owned_item(&pool, req.item_id, auth.id).await?;

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::TRANSACTIONS_GET,
			redact(json!({
				"access_token": item.access_token,
				"start_date": req.start_date,
				"end_date": req.end_date,
				"count": req.count,
				"offset": req.offset,
			})),
		);
		let result = gateway
			.get_transactions(&item.access_token, start_date, end_date, req.count, req.offset)
			.await;
		record_call(&pool, event, &result).await;

		Ok(HttpResponse::Ok().json(ApiResponse::success(result?)))
	}

	pub async fn sync_transactions_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		auth: AuthenticatedUser,
		req: web::Json<SyncTransactionsRequest>,
	) -> Result<HttpResponse, ApiError> {
		let SyncTransactionsRequest { item_id, cursor } = req.into_inner();
		let item = owned_item(&pool, item_id, auth.id).await?;
		let cursor = cursor.or_else(|| item.transaction_cursor.clone());

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::TRANSACTIONS_SYNC,
			redact(json!({ "access_token": item.access_token, "cursor": cursor })),
		);
		let result = gateway.sync_transactions(&item.access_token, cursor).await;
		record_call(&pool, event, &result).await;
		let sync = result?;

		let summary = blocking(&pool, move |pool| persist_sync(pool, &item, &sync)).await?;
		log::info!(
			"Synced item {}: {} added, {} modified, {} removed",
			item_id,
			summary.added,
			summary.modified,
			summary.removed
		);
		Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
	}

	pub async fn get_item_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		auth: AuthenticatedUser,
		query: web::Query<ItemQuery>,
	) -> Result<HttpResponse, ApiError> {
		let item = owned_item(&pool, query.item_id, auth.id).await?;

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::ITEM_GET,
			redact(json!({ "access_token": item.access_token })),
		);
		let result = gateway.get_item(&item.access_token).await;
		record_call(&pool, event, &result).await;

		Ok(HttpResponse::Ok().json(ApiResponse::success(result?)))
	}

	pub async fn delete_item_handler(
		pool: web::Data<DbPool>,
		auth: AuthenticatedUser,
		query: web::Query<ItemQuery>,
	) -> Result<HttpResponse, ApiError> {
		let item = owned_item(&pool, query.item_id, auth.id).await?;
		let item_id = item.id;
		blocking(&pool, move |pool| ItemRepo::new(pool).delete(item_id)).await?;

		log::info!("Deleted item {} for user {}", item_id, auth.id);
		Ok(HttpResponse::Ok().json(ApiResponse::success("Item deleted")))
	}

	pub async fn update_item_webhook_handler(
		pool: web::Data<DbPool>,
		gateway: web::Data<dyn PlaidGateway>,
		auth: AuthenticatedUser,
		req: web::Json<UpdateItemWebhookRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let UpdateItemWebhookRequest { item_id, webhook_url } = req.into_inner();
		let item = owned_item(&pool, item_id, auth.id).await?;

		let event = NewPlaidApiEvent::started(
			auth.id,
			Some(item.id),
			endpoints::ITEM_WEBHOOK_UPDATE,
			redact(json!({ "access_token": item.access_token, "webhook": webhook_url })),
		);
		let result = gateway.update_item_webhook(&item.access_token, &webhook_url).await;
		record_call(&pool, event, &result).await;
		let res = result?;

		blocking(&pool, move |pool| ItemRepo::new(pool).update_webhook(item_id, &webhook_url))
			.await?;
		log::info!("Updated webhook for item {}", item_id);
		Ok(HttpResponse::Ok().json(ApiResponse::success(res.item)))
	}

	pub async fn link_event_handler(
		pool: web::Data<DbPool>,
		auth: AuthenticatedUser,
		req: web::Json<LinkEventRequest>,
	) -> Result<HttpResponse, ApiError> {
		req.validate()?;
		let req = req.into_inner();
		if let Some(item_id) = req.item_id {
			owned_item(&pool, item_id, auth.id).await?;
		}

		let now = Utc::now();
		let event = NewLinkEvent {
			id: Uuid::new_v4(),
			user_id: auth.id,
			item_id: req.item_id,
			event_name: req.event_name,
			event_metadata: req.metadata,
			link_session_id: req.link_session_id,
			request_id: req.request_id,
			error_code: req.error_code,
			error_message: req.error_message,
			status: req.status.unwrap_or_else(|| "success".to_string()),
			institution_id: req.institution_id,
			institution_name: req.institution_name,
			timestamp: req.timestamp.unwrap_or(now),
			created_at: now,
		};
		let event = blocking(&pool, move |pool| EventRepo::new(pool).create_link_event(&event)).await?;

		log::info!("Recorded link event {} for session {}", event.event_name, event.link_session_id);
		Ok(HttpResponse::Created().json(ApiResponse::success(event)))
	}

	/// Vendor-originated. Always acknowledged once parsed so the vendor does
	/// not retry for items this service no longer knows.
	pub async fn webhook_handler(
		pool: web::Data<DbPool>,
		req: HttpRequest,
		body: web::Bytes,
	) -> Result<HttpResponse, ApiError> {
		let verification = req
			.headers()
			.get(PLAID_VERIFICATION_HEADER)
			.and_then(|value| value.to_str().ok());
		if !verify_webhook(verification, &body) {
			return Err(ApiError::unauthorized("Invalid webhook"));
		}

		let webhook: PlaidWebhook = serde_json::from_slice(&body)
			.map_err(|e| ApiError::bad_request(format!("Invalid webhook data: {}", e)))?;
		log::info!("Received Plaid webhook {}/{}", webhook.webhook_type, webhook.webhook_code);

		if webhook.webhook_type == "TRANSACTIONS" {
			log::info!(
				"Transactions update {} for item {}",
				webhook.webhook_code,
				webhook.item_id.as_deref().unwrap_or("-")
			);
		}

		if let (Some(status), Some(plaid_item_id)) = (item_status_for(&webhook), webhook.item_id.clone())
		{
			let error = webhook.error.as_ref().and_then(|e| e.error_message.clone());
			let updated = blocking(&pool, move |pool| {
				let repo = ItemRepo::new(pool);
				match repo.find_by_plaid_item_id(&plaid_item_id)? {
					Some(item) => repo.update_status(item.id, status, error.as_deref()),
					None => Ok(false),
				}
			})
			.await?;
			if updated {
				log::info!("Item status set to {}", status.as_str());
			} else {
				log::warn!("Webhook for unknown item {}", webhook.item_id.as_deref().unwrap_or("-"));
			}
		}

		Ok(HttpResponse::Ok().json(ApiResponse::success("webhook received")))
	}
}

pub async fn health_handler() -> HttpResponse {
	HttpResponse::Ok().json(ApiResponse::success("ok"))
}

pub async fn status_handler(
	pool: web::Data<DbPool>,
	config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
	let pool = pool.clone();
	let database_up = web::block(move || db::ping(&pool)).await?;
	Ok(HttpResponse::Ok().json(ApiResponse::success(ServiceStatus {
		environment: config.plaid.environment.to_string(),
		database: if database_up { "up" } else { "down" }.to_string(),
	})))
}
