use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use premium_server::config::Config;
use premium_server::gateway::{PaymentGateway, SnapClient};
use premium_server::mail::{NotificationDispatcher, SmtpMailer};
use premium_server::routes::create_routes;
use premium_server::services::{
    IdentifierAllocator, NotificationProcessor, SignatureVerifier, TransactionService,
};
use premium_server::state::AppState;
use premium_server::store::{PgTransactionStore, TransactionStoreBox};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store: TransactionStoreBox = Arc::new(PgTransactionStore::new(pool));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        match config.gateway.snap_url.clone() {
            Some(url) => SnapClient::with_base_url(
                url,
                config.gateway.server_key.clone(),
                config.gateway.timeout,
            ),
            None => SnapClient::new(
                config.gateway.environment,
                config.gateway.server_key.clone(),
                config.gateway.timeout,
            ),
        }
        .expect("Failed to build payment gateway client"),
    );

    let mailer = SmtpMailer::new(&config.mail).expect("Failed to configure mail relay");
    let dispatcher = NotificationDispatcher::new(Arc::new(mailer), config.billing.product_name.clone());

    let verifier = if config.verify_webhook_signature {
        Some(SignatureVerifier::new(config.gateway.server_key.clone()))
    } else {
        tracing::warn!("Webhook signature verification is disabled");
        None
    };

    let transactions = TransactionService::new(
        store.clone(),
        gateway,
        IdentifierAllocator::new(config.billing.max_id_attempts),
        config.billing.clone(),
    );
    let notifications = NotificationProcessor::new(store, dispatcher, verifier);

    let app: Router = create_routes(AppState::new(transactions, notifications));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
