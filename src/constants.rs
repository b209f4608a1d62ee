// Messages
pub const MESSAGE_INVALID_TOKEN: &str = "Invalid or expired token";
pub const MESSAGE_MISSING_TOKEN: &str = "Authorization header must be in format: Bearer {token}";
pub const MESSAGE_INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const MESSAGE_INTERNAL_ERROR: &str = "Internal server error";
pub const MESSAGE_USER_NOT_FOUND: &str = "User not found";
pub const MESSAGE_ITEM_NOT_FOUND: &str = "Item not found";

// Token lifetimes, in seconds
pub const ONE_MINUTE: u64 = 60;
pub const ONE_WEEK: u64 = 7 * 24 * 60 * ONE_MINUTE;

pub const DEFAULT_JWT_ISSUER: &str = "finance-api";

// bcrypt only reads the first 72 bytes of a password
pub const MAX_PASSWORD_BYTES: usize = 72;

// Routes reachable without a bearer token
pub const IGNORE_ROUTES: [&str; 6] = [
	"/health",
	"/api/status",
	"/api/auth/signup",
	"/api/auth/login",
	"/api/auth/refresh",
	"/api/plaid/webhook",
];

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

pub const SUPPORTED_PLAID_PRODUCTS: [&str; 6] =
	["auth", "transactions", "identity", "investments", "liabilities", "assets"];

pub const DEFAULT_PLAID_PRODUCT: &str = "transactions";
pub const PLAID_VERIFICATION_HEADER: &str = "Plaid-Verification";
