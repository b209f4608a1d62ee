use crate::{
	config::JwtConfig,
	constants::{IGNORE_ROUTES, MESSAGE_INVALID_TOKEN, MESSAGE_MISSING_TOKEN, ONE_WEEK},
	errors::ApiError,
	models::{ApiResponse, User},
};
use actix_service::forward_ready;
use actix_web::{
	body::EitherBody,
	dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
	http::{header::Header, Method},
	Error as AxError, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use jsonwebtoken::{
	decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader,
	Validation,
};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{rc::Rc, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

/// Session token payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
	pub user_id: Uuid,
	pub email: String,
	pub sub: String,
	pub iss: String,
	pub iat: u64,
	pub nbf: u64,
	pub exp: u64,
}

/// Refresh token payload. Carries no email, so it never parses as [`Claims`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
	pub sub: String,
	pub jti: Uuid,
	pub iss: String,
	pub iat: u64,
	pub nbf: u64,
	pub exp: u64,
}

impl RefreshClaims {
	pub fn user_id(&self) -> Result<Uuid, AuthError> {
		Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
	}
}

#[derive(Debug, Error)]
pub enum AuthError {
	/// Bad signature, wrong algorithm, expired, not yet valid, wrong issuer or malformed.
	#[error("invalid token")]
	InvalidToken,

	#[error("failed to sign token: {0}")]
	Signing(jsonwebtoken::errors::Error),
}

pub struct JWT {
	secret: String,
	issuer: String,
	expiration: u64,
}

impl JWT {
	pub fn new(config: &JwtConfig) -> Self {
		Self {
			secret: config.secret.clone(),
			issuer: config.issuer.clone(),
			expiration: config.expiration.as_secs(),
		}
	}

	pub fn create_jwt(&self, user: &User) -> Result<String, AuthError> {
		let now = get_current_timestamp();
		let claims = Claims {
			user_id: user.id,
			email: user.email.clone(),
			sub: user.id.to_string(),
			iss: self.issuer.clone(),
			iat: now,
			nbf: now,
			exp: now + self.expiration,
		};
		self.sign(&claims)
	}

	pub fn create_refresh_jwt(&self, user_id: Uuid) -> Result<String, AuthError> {
		let now = get_current_timestamp();
		let claims = RefreshClaims {
			sub: user_id.to_string(),
			jti: Uuid::new_v4(),
			iss: self.issuer.clone(),
			iat: now,
			nbf: now,
			exp: now + ONE_WEEK,
		};
		self.sign(&claims)
	}

	pub fn verify_jwt(&self, token: &str) -> Result<Claims, AuthError> {
		self.verify(token)
	}

	pub fn verify_refresh_jwt(&self, token: &str) -> Result<RefreshClaims, AuthError> {
		self.verify(token)
	}

	fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
		encode(
			&JwtHeader::new(Algorithm::HS256),
			claims,
			&EncodingKey::from_secret(self.secret.as_bytes()),
		)
		.map_err(AuthError::Signing)
	}

	fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
		decode::<T>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &self.validation())
			.map(|data| data.claims)
			.map_err(|e| {
				debug!("Token rejected: {}", e);
				AuthError::InvalidToken
			})
	}

	fn validation(&self) -> Validation {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
		validation.set_issuer(&[&self.issuer]);
		validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
		validation.validate_nbf = true;
		validation.leeway = 0;
		validation
	}
}

/// Rejects requests without a valid bearer token, except for OPTIONS and
/// the public routes.
pub struct Authentication {
	jwt: Arc<JWT>,
}

impl Authentication {
	pub fn new(jwt: Arc<JWT>) -> Self {
		Self { jwt }
	}
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = AxError> + 'static,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<EitherBody<B>>;
	type Error = AxError;
	type InitError = ();
	type Transform = AuthenticationMiddleware<S>;
	type Future = Ready<Result<Self::Transform, Self::InitError>>;

	fn new_transform(&self, service: S) -> Self::Future {
		ok(AuthenticationMiddleware { jwt: self.jwt.clone(), service: Rc::new(service) })
	}
}

pub struct AuthenticationMiddleware<S> {
	jwt: Arc<JWT>,
	service: Rc<S>,
}

impl<S> AuthenticationMiddleware<S> {
	fn authenticate(&self, req: &ServiceRequest) -> Result<Claims, &'static str> {
		let bearer =
			Authorization::<Bearer>::parse(req).map_err(|_| MESSAGE_MISSING_TOKEN)?.into_scheme();
		self.jwt.verify_jwt(bearer.token()).map_err(|_| MESSAGE_INVALID_TOKEN)
	}
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = AxError> + 'static,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<EitherBody<B>>;
	type Error = AxError;
	type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

	forward_ready!(service);

	fn call(&self, req: ServiceRequest) -> Self::Future {
		let public = Method::OPTIONS == *req.method() || IGNORE_ROUTES.contains(&req.path());

		if !public {
			match self.authenticate(&req) {
				Ok(claims) => {
					req.extensions_mut().insert(claims);
				},
				Err(message) => {
					warn!("Unauthorized {} {}: {}", req.method(), req.path(), message);
					let (request, _pl) = req.into_parts();
					let response = HttpResponse::Unauthorized()
						.json(ApiResponse::<()>::error(message))
						.map_into_right_body();
					return Box::pin(async { Ok(ServiceResponse::new(request, response)) });
				},
			}
		}

		let service = self.service.clone();
		Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
	}
}

/// Identity of the caller, taken from the claims the middleware validated.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
	pub id: Uuid,
	pub email: String,
}

impl FromRequest for AuthenticatedUser {
	type Error = ApiError;
	type Future = Ready<Result<Self, Self::Error>>;

	fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
		let user = req
			.extensions()
			.get::<Claims>()
			.map(|claims| AuthenticatedUser { id: claims.user_id, email: claims.email.clone() })
			.ok_or_else(|| ApiError::unauthorized(MESSAGE_MISSING_TOKEN));
		ready(user)
	}
}
