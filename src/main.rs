use axum::routing::{get, post};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use medrec_api::handlers::{attendances, health_units, system, users};
use medrec_api::middleware::credentials_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up POSTGRES_URL, API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Force the config singleton early so misconfiguration surfaces at boot
    let _ = medrec_api::config::config();

    // Startup keeps going without a database; the health endpoint reports
    // degraded until it comes up and the bootstrap endpoint can be retried.
    match medrec_api::bootstrap::ensure_root_user().await {
        Ok(true) => tracing::info!("Root user bootstrapped"),
        Ok(false) => tracing::info!("Root user already present"),
        Err(e) => tracing::warn!("Root user bootstrap skipped: {}", e),
    }

    let app = app();

    let port = std::env::var("MEDREC_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Medrec API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        .merge(system_routes())
        .merge(user_routes())
        .merge(health_unit_routes())
        .merge(attendance_routes())
        // The credential gate runs before any handler; CORS and tracing wrap
        // the gate so rejections are logged and preflights still work.
        .layer(axum::middleware::from_fn(credentials_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn system_routes() -> Router {
    Router::new()
        .route("/api/health", get(system::health))
        .route("/api/ensure-root", post(system::ensure_root))
}

fn user_routes() -> Router {
    Router::new()
        .route("/api/users", get(users::get_users).post(users::add_user))
        .route("/api/users/login", post(users::login))
        .route("/api/users/administrators/list", get(users::get_administrators))
        .route("/api/users/professionals/list", get(users::get_professionals))
        .route(
            "/api/users/:id",
            get(users::get_user_by_id)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

fn health_unit_routes() -> Router {
    Router::new()
        .route(
            "/api/health-units",
            get(health_units::get_health_units).post(health_units::add_health_unit),
        )
        .route(
            "/api/health-units/:id",
            get(health_units::get_health_unit_by_id)
                .put(health_units::update_health_unit)
                .delete(health_units::delete_health_unit),
        )
}

fn attendance_routes() -> Router {
    Router::new()
        .route(
            "/api/attendances",
            get(attendances::get_attendances).post(attendances::add_attendance),
        )
        .route(
            "/api/attendances/statistics/summary",
            get(attendances::get_statistics),
        )
        .route(
            "/api/attendances/:id",
            get(attendances::get_attendance_by_id)
                .put(attendances::update_attendance)
                .delete(attendances::delete_attendance),
        )
}
