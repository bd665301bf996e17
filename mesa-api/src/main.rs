use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use mesa_api::{app, middleware::CircuitBreakers, AppState};
use mesa_core::SystemClock;
use mesa_reservation::{AvailabilityService, EventSettings, HumanDateService, ReservationOrchestrator};
use mesa_store::{
    app_config::Config, DbClient, OdooConnector, OpenAiDateOracle, PgCompanyRepository, RedisClient,
    WhatsAppWebhookNotifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mesa_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Mesa API on port {}", config.server.port);

    let default_timezone: Tz = config
        .server
        .default_timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server.default_timezone: {}", e))?;

    // Postgres
    let db = DbClient::connect(&config.database)
        .await
        .context("Failed to prepare Postgres")?;

    // Redis (optional)
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?,
        )),
        None => {
            tracing::info!("No Redis configured, rate limiting disabled");
            None
        }
    };

    // Upstream adapters
    let connector = OdooConnector::new(Duration::from_secs(config.odoo.timeout_seconds))?;
    let notifier = WhatsAppWebhookNotifier::new(
        Duration::from_secs(config.notifications.timeout_seconds),
        config.notifications.default_country_code.clone(),
        config.notifications.test_suffix,
    )?;
    let oracle = OpenAiDateOracle::new(
        config.openai.api_key.clone(),
        config.openai.api_url.clone(),
        config.openai.model.clone(),
        Duration::from_secs(config.openai.timeout_seconds),
    )?;

    let settings = EventSettings {
        event_appointment_type_id: config.odoo.event_appointment_type_id,
        booking_line_appointment_type_id: config.odoo.booking_line_appointment_type_id,
    };

    let app_state = AppState {
        companies: Arc::new(PgCompanyRepository::new(db.pool.clone())),
        backoffice: Arc::new(connector),
        availability: Arc::new(AvailabilityService::new(config.business_rules.clone())),
        reservations: Arc::new(ReservationOrchestrator::new(
            config.business_rules.clone(),
            settings,
            Arc::new(notifier),
        )),
        human_dates: Arc::new(HumanDateService::new(Arc::new(oracle))),
        clock: Arc::new(SystemClock),
        default_timezone,
        redis,
        rate_limit: config.rate_limit.clone(),
        resiliency: Arc::new(CircuitBreakers::new(
            config.resiliency.failure_threshold,
            Duration::from_secs(config.resiliency.reset_timeout_seconds),
        )),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
