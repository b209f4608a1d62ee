use crate::config::DatabaseConfig;
use diesel::{
	prelude::*,
	r2d2::{self, ConnectionManager},
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn get_db_pool(config: &DatabaseConfig) -> Result<DbPool, r2d2::PoolError> {
	r2d2::Pool::builder()
		.max_size(config.max_connections)
		.min_idle(Some(config.min_idle))
		.max_lifetime(Some(config.max_lifetime))
		.build(ConnectionManager::<PgConnection>::new(&config.url))
}

pub fn init(pool: &DbPool) -> anyhow::Result<()> {
	let mut conn = pool.get()?;
	let applied = conn
		.run_pending_migrations(MIGRATIONS)
		.map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
	for version in applied {
		log::info!("Applied migration {}", version);
	}
	Ok(())
}

pub fn ping(pool: &DbPool) -> bool {
	match pool.get() {
		Ok(mut conn) => diesel::sql_query("SELECT 1").execute(&mut conn).is_ok(),
		Err(e) => {
			log::warn!("Database ping failed: {:?}", e);
			false
		},
	}
}
