use async_trait::async_trait;
use mesa_core::company::{DEFAULT_APPOINTMENT_STATUS, DEFAULT_TIMEZONE};
use mesa_core::repository::CompanyRepository;
use mesa_core::{Company, CompanyKey, OdooCredentials};
use mesa_shared::Masked;
use sqlx::PgPool;

use crate::StoreError;

const COMPANY_COLUMNS: &str = "id, name, slug, api_token, odoo_database, odoo_host, odoo_username, \
     odoo_password, timezone, whatsapp_webhook_url, assigned_phone_number, appointment_status";

pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: i64,
    name: String,
    slug: Option<String>,
    api_token: Option<String>,
    odoo_database: String,
    odoo_host: String,
    odoo_username: String,
    odoo_password: String,
    timezone: Option<String>,
    whatsapp_webhook_url: Option<String>,
    assigned_phone_number: Option<String>,
    appointment_status: Option<String>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            slug: row.slug,
            api_token: row.api_token.map(Masked),
            odoo: OdooCredentials {
                host: row.odoo_host,
                database: row.odoo_database,
                username: row.odoo_username,
                password: Masked(row.odoo_password),
            },
            timezone: non_blank(row.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            whatsapp_webhook_url: non_blank(row.whatsapp_webhook_url),
            assigned_phone_number: non_blank(row.assigned_phone_number),
            appointment_status: non_blank(row.appointment_status)
                .unwrap_or_else(|| DEFAULT_APPOINTMENT_STATUS.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn find(
        &self,
        key: &CompanyKey,
    ) -> Result<Option<Company>, Box<dyn std::error::Error + Send + Sync>> {
        let row = match key {
            CompanyKey::Id(id) => {
                sqlx::query_as::<_, CompanyRow>(&format!(
                    "SELECT {} FROM companies WHERE id = $1",
                    COMPANY_COLUMNS
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)?
            }
            CompanyKey::Slug(slug) => {
                sqlx::query_as::<_, CompanyRow>(&format!(
                    "SELECT {} FROM companies WHERE slug = $1",
                    COMPANY_COLUMNS
                ))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)?
            }
        };

        Ok(row.map(Company::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CompanyRow {
        CompanyRow {
            id: 12,
            name: "Bodega Norte".to_string(),
            slug: Some("bodega-norte".to_string()),
            api_token: Some("tok".to_string()),
            odoo_database: "norte".to_string(),
            odoo_host: "https://norte.odoo.com".to_string(),
            odoo_username: "bot".to_string(),
            odoo_password: "secret".to_string(),
            timezone: None,
            whatsapp_webhook_url: Some("  ".to_string()),
            assigned_phone_number: None,
            appointment_status: None,
        }
    }

    #[test]
    fn test_row_defaults_blank_columns() {
        let company = Company::from(row());

        assert_eq!(company.timezone, DEFAULT_TIMEZONE);
        assert_eq!(company.appointment_status, DEFAULT_APPOINTMENT_STATUS);
        assert!(company.whatsapp_webhook_url.is_none());
        assert!(company.verify_api_key("tok"));
        assert_eq!(company.odoo.password.expose(), "secret");
    }
}
