use crate::handler::PlaidHandler;
use actix_web::web;

pub fn init(cfg: &mut web::ServiceConfig) {
	cfg.service(
		web::scope("/api/plaid")
			// Link flow
			.route("/create_link_token", web::post().to(PlaidHandler::create_link_token_handler))
			.route(
				"/exchange_public_token",
				web::post().to(PlaidHandler::exchange_public_token_handler),
			)
			.route("/link_event", web::post().to(PlaidHandler::link_event_handler))
			// Items and their data
			.route("/items", web::get().to(PlaidHandler::list_items_handler))
			.route("/accounts", web::get().to(PlaidHandler::get_accounts_handler))
			.route("/transactions", web::post().to(PlaidHandler::get_transactions_handler))
			.route("/transactions/sync", web::post().to(PlaidHandler::sync_transactions_handler))
			.route("/item", web::get().to(PlaidHandler::get_item_handler))
			.route("/item", web::delete().to(PlaidHandler::delete_item_handler))
			.route("/item/webhook", web::post().to(PlaidHandler::update_item_webhook_handler))
			// Vendor callbacks
			.route("/webhook", web::post().to(PlaidHandler::webhook_handler)),
	);
}
