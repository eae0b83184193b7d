use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gavobord::{
    api,
    config::Settings,
    payments::{CardSessionBuilder, PaymentGateway, StripeGateway},
    repository::{
        SqliteContributionRepository, SqliteGiftRepository, SqlitePaymentSettingsRepository,
    },
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gavobord=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting gavobord server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Initialize repositories
    let gift_repo = Arc::new(SqliteGiftRepository::new(db_pool.clone()));
    let contribution_repo = Arc::new(SqliteContributionRepository::new(db_pool.clone()));
    let settings_repo = Arc::new(SqlitePaymentSettingsRepository::new(db_pool.clone()));

    // Initialize the card rail if Stripe is configured
    let card_builder = if settings.stripe.enabled {
        if let Some(api_key) = settings.stripe.secret_key.clone() {
            tracing::info!(
                fee_version = settings.stripe.fee.version,
                "Card payments enabled"
            );
            let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
                api_key,
                Duration::from_secs(settings.stripe.request_timeout_secs),
            ));
            Some(CardSessionBuilder::new(
                gateway,
                settings.stripe.fee.clone(),
                settings.stripe.currency.clone(),
            ))
        } else {
            tracing::warn!("Stripe enabled but missing secret key");
            None
        }
    } else {
        tracing::info!("Card payments disabled; Swish rail only");
        None
    };

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        gift_repo,
        contribution_repo,
        settings_repo,
        card_builder,
        db_pool.clone(),
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
