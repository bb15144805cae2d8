use {
    box_office::{
        AppState,
        adapters::{
            notifier::LogNotifier, stripe_client::StripeGateway, ticket_codes::FsTicketCodeStore,
        },
        config::AppConfig,
        infra::postgres::PgStore,
        services::{
            cancellation::CancellationService, checkout::CheckoutService,
            confirmation::ConfirmationService, sweeper::run_reservation_sweeper,
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower::ServiceBuilder,
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<PgStore> = Arc::new(PgStore::new(pool));
    let gateway = Arc::new(StripeGateway::new(&config.stripe_secret_key));
    let codes = Arc::new(FsTicketCodeStore::new(
        &config.ticket_code_dir,
        config.ticket_code_base_url.clone(),
        config.ticket_code_secret.as_bytes(),
    ));

    let state = AppState {
        store: store.clone(),
        checkout: Arc::new(CheckoutService::new(
            store.clone(),
            gateway.clone(),
            config.checkout(),
        )),
        confirmation: Arc::new(ConfirmationService::new(
            store.clone(),
            gateway.clone(),
            codes,
            Arc::new(LogNotifier),
            config.loyalty,
            config.gateway_timeout(),
        )),
        cancellation: Arc::new(CancellationService::new(
            store.clone(),
            gateway,
            config.gateway_timeout(),
        )),
        stripe_webhook_secret: config.stripe_webhook_secret.clone().into(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_reservation_sweeper(
        store,
        config.sweep_interval(),
        shutdown_rx,
    ));

    let app = box_office::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.request_timeout())),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "sweeper task panicked");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
