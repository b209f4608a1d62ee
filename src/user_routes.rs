use crate::handler::UserHandler;
use actix_web::web;

pub fn init(cfg: &mut web::ServiceConfig) {
	cfg.service(
		web::scope("/api/auth")
			.route("/signup", web::post().to(UserHandler::signup_handler))
			.route("/login", web::post().to(UserHandler::login_handler))
			.route("/refresh", web::post().to(UserHandler::refresh_handler))
			// current user
			.route("/me", web::get().to(UserHandler::me_handler))
			.route("/me", web::put().to(UserHandler::update_profile_handler)),
	);
}
