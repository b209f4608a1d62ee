mod config;
mod constants;
mod credentials;
mod db;
mod errors;
mod handler;
mod midware;
mod models;
mod plaid;
mod plaid_routes;
mod repo;
mod schema;
#[cfg(test)]
mod tests;
mod user_routes;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use config::AppConfig;
use env_logger::Env;
use midware::jwt::{Authentication, JWT};
use plaid::{PlaidClient, PlaidGateway};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
	env_logger::init_from_env(Env::default().default_filter_or("info"));
	let config = AppConfig::load();

	let pool = db::get_db_pool(&config.database).context("Unable to create the database pool")?;
	db::init(&pool).context("Unable to initialize the db")?;

	let jwt = Arc::new(JWT::new(&config.jwt));
	let gateway: Arc<dyn PlaidGateway> = Arc::new(PlaidClient::new(&config.plaid));
	let port = config.port;
	log::info!("Plaid environment: {}", config.plaid.environment);
	log::info!("Listening on: 0.0.0.0:{}..", port);

	let config = web::Data::new(config);
	HttpServer::new(move || {
		App::new()
			.app_data(web::Data::new(pool.clone()))
			.app_data(web::Data::from(jwt.clone()))
			.app_data(web::Data::from(gateway.clone()))
			.app_data(config.clone())
			.app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
			.app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
			.wrap(Authentication::new(jwt.clone()))
			.wrap(
				Cors::default()
					.allow_any_origin()
					.allow_any_method()
					.allow_any_header()
					.expose_headers(vec![header::CONTENT_LENGTH])
					.max_age(3600),
			)
			.wrap(actix_web::middleware::Logger::default())
			.route("/health", web::get().to(handler::health_handler))
			.route("/api/status", web::get().to(handler::status_handler))
			.configure(user_routes::init)
			.configure(plaid_routes::init)
	})
	.workers(num_cpus::get())
	.bind(("0.0.0.0", port))?
	.run()
	.await?;

	Ok(())
}
