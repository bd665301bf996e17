use mesa_core::ReservationPolicy;
use mesa_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub odoo: OdooConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub business_rules: ReservationPolicy,
    #[serde(default)]
    pub resiliency: ResiliencyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Zone used when a company's timezone cannot be parsed.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

fn default_timezone() -> String { "UTC".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_window: 100, window_seconds: 60 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OdooConfig {
    pub timeout_seconds: u64,
    pub event_appointment_type_id: i64,
    pub booking_line_appointment_type_id: i64,
}

impl Default for OdooConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            event_appointment_type_id: 1,
            booking_line_appointment_type_id: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Masked<String>,
    #[serde(default = "default_openai_url")]
    pub api_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_timeout() -> u64 { 20 }

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Masked::default(),
            api_url: default_openai_url(),
            model: default_openai_model(),
            timeout_seconds: default_openai_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationsConfig {
    /// Post to `{url}-test` instead of the production webhook.
    #[serde(default)]
    pub test_suffix: bool,
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default = "default_notify_timeout")]
    pub timeout_seconds: u64,
}

fn default_country_code() -> String { "+34".to_string() }
fn default_notify_timeout() -> u64 { 10 }

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            test_suffix: false,
            default_country_code: default_country_code(),
            timeout_seconds: default_notify_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResiliencyConfig {
    pub failure_threshold: usize,
    pub reset_timeout_seconds: u64,
}

impl Default for ResiliencyConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, reset_timeout_seconds: 30 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `MESA__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("MESA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
