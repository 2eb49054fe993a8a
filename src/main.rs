mod api;
mod config;
mod domain;
mod gateway;
mod infrastructure;
mod orchestrator;
mod validation;
mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use api::handlers::{signup, webhooks};
use api::state::AppState;
use config::Config;
use gateway::plaid::PlaidClient;
use gateway::stripe::StripeClient;
use gateway::ProviderGateway;
use infrastructure::repositories::{
    PostgresCompanyRepository, PostgresPaymentRepository, PostgresUserRepository,
};
use orchestrator::SignupOrchestrator;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            tracing::error!("configuration error: {}", err);
            std::process::exit(1);
        }
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database connected successfully");

    // Provider clients are constructed once per process and injected
    let stripe = StripeClient::new(config.stripe_secret_key.clone())
        .expect("Failed to build Stripe client");
    let plaid = PlaidClient::new(
        config.plaid_client_id.clone(),
        config.plaid_secret.clone(),
        &config.plaid_env,
    )
    .expect("Failed to build Plaid client");
    let provider_gateway = Arc::new(ProviderGateway::new(stripe, plaid));

    let orchestrator = Arc::new(SignupOrchestrator::new(
        provider_gateway,
        Arc::new(PostgresCompanyRepository::new(pool.clone())),
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresPaymentRepository::new(pool)),
    ));

    let state = AppState::new(orchestrator, config.clone());

    // Public signup API: no session auth, trust comes from the webhook
    // signature and server-held provider keys
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(signup::health_check))
        // Signup funnel
        .route("/api/signup/link-token", post(signup::create_link_token))
        .route("/api/signup", post(signup::initiate_signup))
        .route("/api/signup/complete", post(signup::complete_signup))
        // Provider webhooks
        .route("/api/webhooks/transfers", post(webhooks::transfers))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed");
}
