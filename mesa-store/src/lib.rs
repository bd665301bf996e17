pub mod app_config;
pub mod database;
pub mod company_repo;
pub mod odoo;
pub mod webhook;
pub mod date_oracle;
pub mod redis_repo;

pub use company_repo::PgCompanyRepository;
pub use database::DbClient;
pub use date_oracle::OpenAiDateOracle;
pub use odoo::{OdooClient, OdooConnector};
pub use redis_repo::RedisClient;
pub use webhook::WhatsAppWebhookNotifier;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
