use std::{sync::Arc, time::Duration};

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teketeke::{
    api::{self, state::AppState},
    config::Settings,
    notifications::{EmailNotifier, LogNotifier, Notifier},
    payments::{CallbackReconciler, DarajaClient, StkPushService},
    service::{activation_service::ActivationService, ServiceContext},
};

const DEFAULT_ADMIN_TOKEN: &str = "change-me-in-production";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teketeke=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    if settings.auth.admin_token == DEFAULT_ADMIN_TOKEN {
        tracing::warn!("auth.admin_token is the default value; set TEKETEKE__AUTH__ADMIN_TOKEN");
    }

    tracing::info!("Starting Teke Teke server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let notifier: Arc<dyn Notifier> = match &settings.email {
        Some(email) => match EmailNotifier::new(email) {
            Ok(notifier) => {
                tracing::info!("Email reminders enabled via {}", email.smtp_host);
                Arc::new(notifier)
            }
            Err(e) => {
                tracing::warn!("Email transport unavailable: {}. Reminders will be logged only.", e);
                Arc::new(LogNotifier)
            }
        },
        None => {
            tracing::info!("Email not configured, reminders will be logged only");
            Arc::new(LogNotifier)
        }
    };

    let service_context = Arc::new(ServiceContext::with_sqlite(db_pool, notifier, &settings));

    // Missing credentials are reported per request, so the server still starts.
    let gateway = Arc::new(DarajaClient::new(&settings.mpesa)?);
    let stk_push = Arc::new(StkPushService::new(
        gateway,
        service_context.payment_repo.clone(),
        service_context.shop_repo.clone(),
        settings.mpesa.clone(),
    ));
    let reconciler = Arc::new(CallbackReconciler::new(
        service_context.payment_repo.clone(),
        service_context.activation_service.clone(),
    ));

    if settings.billing.sweep_interval_secs > 0 {
        spawn_sweep(
            service_context.activation_service.clone(),
            Duration::from_secs(settings.billing.sweep_interval_secs),
        );
    } else {
        tracing::info!("Periodic billing sweep disabled");
    }

    let app_state = AppState::new(
        service_context,
        stk_push,
        reconciler,
        Arc::new(settings.clone()),
    );
    let app = api::create_app(app_state);

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_sweep(activation: Arc<ActivationService>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = activation.sweep(Utc::now(), false).await {
                tracing::error!("Billing sweep failed: {}", e);
            }
        }
    });
}
