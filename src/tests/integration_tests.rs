use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use crate::{
	models::{ApiResponse, AuthResponse, MeResponse, SyncSummary},
	plaid::MockPlaidGateway,
	repo::ItemRepo,
	tests::{
		fixtures::TestFixtures,
		test_utils::{bearer, create_user, db_pool, generate_test_token, test_app, TEST_PASSWORD},
	},
};

#[actix_web::test]
async fn test_signup_then_duplicate_is_conflict() {
	let Some(pool) = db_pool() else { return };
	let app = test_app!(pool, MockPlaidGateway::new());
	let request = TestFixtures::signup_request();

	let resp = test::TestRequest::post()
		.uri("/api/auth/signup")
		.set_json(&request)
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::CREATED);
	let body: ApiResponse<AuthResponse> = test::read_body_json(resp).await;
	let auth = body.data.expect("signup returns tokens");
	assert!(!auth.token.is_empty());
	assert!(!auth.refresh_token.is_empty());
	assert_eq!(auth.user.email, request.email);

	let resp = test::TestRequest::post()
		.uri("/api/auth/signup")
		.set_json(&request)
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_complete_user_flow() {
	let Some(pool) = db_pool() else { return };
	let app = test_app!(pool, MockPlaidGateway::new());
	let request = TestFixtures::signup_request();

	// Step 1: Sign up
	let resp = test::TestRequest::post()
		.uri("/api/auth/signup")
		.set_json(&request)
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::CREATED);

	// Step 2: Wrong password, then the right one
	let resp = test::TestRequest::post()
		.uri("/api/auth/login")
		.set_json(json!({ "email": request.email, "password": "not-the-password" }))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	let resp = test::TestRequest::post()
		.uri("/api/auth/login")
		.set_json(json!({ "email": request.email.to_uppercase(), "password": TEST_PASSWORD }))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body: ApiResponse<AuthResponse> = test::read_body_json(resp).await;
	let auth = body.data.expect("login returns tokens");

	// Step 3: Current user, never exposing the hash
	let resp = test::TestRequest::get()
		.uri("/api/auth/me")
		.insert_header(bearer(&auth.token))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body: Value = test::read_body_json(resp).await;
	assert_eq!(body["data"]["user"]["email"], request.email.as_str());
	assert!(body["data"]["user"].get("password_hash").is_none());

	// Step 4: Profile update
	let resp = test::TestRequest::put()
		.uri("/api/auth/me")
		.insert_header(bearer(&auth.token))
		.set_json(json!({ "last_name": "Smith" }))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body: ApiResponse<MeResponse> = test::read_body_json(resp).await;
	assert_eq!(body.data.unwrap().user.last_name.as_deref(), Some("Smith"));

	// Step 5: Refresh
	let resp = test::TestRequest::post()
		.uri("/api/auth/refresh")
		.set_json(json!({ "refresh_token": auth.refresh_token }))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_link_sync_and_unlink_item() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let token = generate_test_token(&user);
	let plaid_item_id = format!("item-{}", uuid::Uuid::new_v4());
	let plaid_account_id = format!("acc-{}", uuid::Uuid::new_v4());
	let plaid_tx_id = format!("tx-{}", uuid::Uuid::new_v4());

	let mut gateway = MockPlaidGateway::new();
	let exchanged = TestFixtures::exchange_response(&plaid_item_id);
	gateway
		.expect_exchange_public_token()
		.withf(|public_token: &str| public_token == "public-sandbox-1")
		.times(2)
		.returning(move |_| Ok(exchanged.clone()));
	let account = TestFixtures::plaid_account(&plaid_account_id, 110.0);
	gateway
		.expect_get_accounts()
		.times(1)
		.returning(move |_| Ok(TestFixtures::accounts_response(vec![account.clone()])));
	let sync = TestFixtures::sync_response(
		vec![TestFixtures::plaid_transaction(&plaid_tx_id, &plaid_account_id, 6.33, true)],
		vec![],
		&[],
		"cursor-1",
	);
	gateway
		.expect_sync_transactions()
		.withf(|_, cursor| cursor.is_none())
		.times(1)
		.returning(move |_, _| Ok(sync.clone()));
	let app = test_app!(pool.clone(), gateway);

	// Exchange creates the item and its accounts
	let exchange = json!({
		"public_token": "public-sandbox-1",
		"institution_id": "ins_109508",
		"institution_name": "First Platypus Bank",
	});
	let resp = test::TestRequest::post()
		.uri("/api/plaid/exchange_public_token")
		.insert_header(bearer(&token))
		.set_json(&exchange)
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::CREATED);
	let body: Value = test::read_body_json(resp).await;
	assert!(body["data"]["item"].get("access_token").is_none());
	let item_id: uuid::Uuid = body["data"]["item"]["id"].as_str().unwrap().parse().unwrap();
	assert_eq!(body["data"]["item"]["institution_name"], "First Platypus Bank");
	assert_eq!(body["data"]["item"]["status"], "active");
	assert_eq!(body["data"]["accounts"].as_array().map(Vec::len), Some(1));
	assert_eq!(body["data"]["accounts"][0]["type"], "depository");

	// Linking the same vendor item again conflicts
	let resp = test::TestRequest::post()
		.uri("/api/plaid/exchange_public_token")
		.insert_header(bearer(&token))
		.set_json(&exchange)
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::CONFLICT);

	// Sync persists the new transaction and stores the cursor
	let resp = test::TestRequest::post()
		.uri("/api/plaid/transactions/sync")
		.insert_header(bearer(&token))
		.set_json(json!({ "item_id": item_id }))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body: ApiResponse<SyncSummary> = test::read_body_json(resp).await;
	let summary = body.data.unwrap();
	assert_eq!(summary.added, 1);
	assert_eq!(summary.next_cursor, "cursor-1");

	// Item webhooks drive the status
	let resp = test::TestRequest::post()
		.uri("/api/plaid/webhook")
		.set_json(json!({
			"webhook_type": "ITEM",
			"webhook_code": "ERROR",
			"item_id": plaid_item_id,
			"error": { "error_code": "ITEM_LOGIN_REQUIRED", "error_message": "the login details have changed" },
		}))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let item = ItemRepo::new(&pool).find_by_id(item_id).unwrap().unwrap();
	assert_eq!(item.status, "login_required");

	// Other users cannot see the item
	let stranger = generate_test_token(&create_user(&pool));
	let resp = test::TestRequest::delete()
		.uri(&format!("/api/plaid/item?item_id={}", item.id))
		.insert_header(bearer(&stranger))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::NOT_FOUND);

	// The owner can delete it
	let resp = test::TestRequest::delete()
		.uri(&format!("/api/plaid/item?item_id={}", item.id))
		.insert_header(bearer(&token))
		.send_request(&app)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	assert!(ItemRepo::new(&pool).find_by_id(item.id).unwrap().is_none());
}

#[actix_web::test]
async fn test_webhook_for_unknown_item_is_acknowledged() {
	let Some(pool) = db_pool() else { return };
	let app = test_app!(pool, MockPlaidGateway::new());

	let resp = test::TestRequest::post()
		.uri("/api/plaid/webhook")
		.set_json(json!({
			"webhook_type": "ITEM",
			"webhook_code": "USER_PERMISSION_REVOKED",
			"item_id": "item-that-does-not-exist",
		}))
		.send_request(&app)
		.await;

	assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_items_are_listed_per_user() {
	let Some(pool) = db_pool() else { return };
	let user = create_user(&pool);
	let app = test_app!(pool, MockPlaidGateway::new());

	let resp = test::TestRequest::get()
		.uri("/api/plaid/items?limit=10")
		.insert_header(bearer(&generate_test_token(&user)))
		.send_request(&app)
		.await;

	assert_eq!(resp.status(), StatusCode::OK);
	let body: ApiResponse<Vec<Value>> = test::read_body_json(resp).await;
	assert!(body.data.unwrap().is_empty());
}
