use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use my_travel::{app, config::Config, db, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "my_travel=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::load();
  tracing::info!("Environment: {:?}", config.environment);

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");
  let state = AppState::new(pool, config);

  let bind_addr = state.config.bind_addr();
  let port = state.config.port;
  let app = app::router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}; press Ctrl-C to terminate.", port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
