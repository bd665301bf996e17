use chrono_tz::Tz;
use mesa_shared::Masked;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

pub const DEFAULT_TIMEZONE: &str = "Atlantic/Canary";
pub const DEFAULT_APPOINTMENT_STATUS: &str = "request";

/// Connection settings for a tenant's Odoo instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdooCredentials {
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: Masked<String>,
}

/// A tenant: one restaurant with its own back office, timezone and messaging hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub api_token: Option<Masked<String>>,
    pub odoo: OdooCredentials,
    pub timezone: String,
    pub whatsapp_webhook_url: Option<String>,
    pub assigned_phone_number: Option<String>,
    pub appointment_status: String,
}

impl Company {
    /// Constant-time check of a presented `X-API-Key` against the tenant token.
    /// A tenant without a token (or with an empty one) never authenticates.
    pub fn verify_api_key(&self, presented: &str) -> bool {
        match &self.api_token {
            Some(token) if !token.expose().is_empty() && !presented.is_empty() => {
                token.expose().as_bytes().ct_eq(presented.as_bytes()).into()
            }
            _ => false,
        }
    }

    /// Tenant timezone, or `fallback` when the stored name is not a known IANA zone.
    pub fn tz(&self, fallback: Tz) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(
                    company_id = self.id,
                    timezone = %self.timezone,
                    fallback = %fallback,
                    "Unknown company timezone, using fallback"
                );
                fallback
            }
        }
    }
}

/// How a tenant is addressed in the URL: numeric id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyKey {
    Id(i64),
    Slug(String),
}

impl CompanyKey {
    pub fn parse(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = segment.parse::<i64>() {
                return CompanyKey::Id(id);
            }
        }
        CompanyKey::Slug(segment.to_string())
    }
}

impl std::fmt::Display for CompanyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompanyKey::Id(id) => write!(f, "{}", id),
            CompanyKey::Slug(slug) => write!(f, "{}", slug),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::company;
    use super::*;

    #[test]
    fn test_api_key_must_match() {
        let c = company(Some("key-123"));
        assert!(c.verify_api_key("key-123"));
        assert!(!c.verify_api_key("key-124"));
        assert!(!c.verify_api_key(""));
    }

    #[test]
    fn test_missing_or_empty_token_never_authenticates() {
        assert!(!company(None).verify_api_key("anything"));
        assert!(!company(Some("")).verify_api_key(""));
    }

    #[test]
    fn test_timezone_fallback() {
        let mut c = company(None);
        assert_eq!(c.tz(Tz::UTC), chrono_tz::Atlantic::Canary);

        c.timezone = "Mars/Olympus".to_string();
        assert_eq!(c.tz(Tz::UTC), Tz::UTC);
    }

    #[test]
    fn test_company_key_parsing() {
        assert_eq!(CompanyKey::parse("42"), CompanyKey::Id(42));
        assert_eq!(CompanyKey::parse("la-tasca"), CompanyKey::Slug("la-tasca".to_string()));
        assert_eq!(CompanyKey::parse("4a"), CompanyKey::Slug("4a".to_string()));
    }
}
