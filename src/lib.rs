pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod types;

use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::database::manager::DatabaseManager;
use crate::middleware::auth::jwt_auth_middleware;
use crate::middleware::response::ApiResponse;

/// Build the full application router.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/login", post(handlers::auth::login_post))
        // Protected API
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    Router::new()
        .merge(pendataan_routes())
        .merge(zkup_routes())
        .merge(data_mustahik_routes())
        .merge(grafik_routes())
        .merge(laporan_routes())
        .merge(verifikasi_routes())
        .merge(users_routes())
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware))
}

fn pendataan_routes() -> Router {
    use handlers::records::pendataan;

    Router::new()
        .route(
            "/api/pendataan",
            get(pendataan::list).post(pendataan::create),
        )
        .route(
            "/api/pendataan/:id",
            get(pendataan::get)
                .put(pendataan::update)
                .delete(pendataan::delete),
        )
}

fn zkup_routes() -> Router {
    use handlers::records::zkup;

    Router::new()
        .route("/api/zkup", get(zkup::list).post(zkup::create))
        .route(
            "/api/zkup/:id",
            get(zkup::get).put(zkup::update).delete(zkup::delete),
        )
}

fn data_mustahik_routes() -> Router {
    use handlers::data_mustahik;

    Router::new()
        .route("/api/data-mustahik/pendataan", get(data_mustahik::pendataan))
        .route("/api/data-mustahik/zkup", get(data_mustahik::zkup))
}

fn grafik_routes() -> Router {
    use handlers::grafik;

    Router::new()
        .route("/api/grafik/summary", get(grafik::summary))
        .route("/api/grafik/perKabupaten", get(grafik::per_kabupaten))
        .route("/api/grafik/perTahun", get(grafik::per_tahun))
        .route("/api/grafik/perStatus", get(grafik::per_status))
        .route("/api/grafik/perPengusul", get(grafik::per_pengusul))
}

fn laporan_routes() -> Router {
    use handlers::laporan;

    Router::new()
        .route("/api/laporan/pendataan", get(laporan::pendataan))
        .route("/api/laporan/zkup", get(laporan::zkup))
        .route("/api/laporan/combined", get(laporan::combined))
}

fn verifikasi_routes() -> Router {
    use handlers::verifikasi;

    Router::new()
        .route("/api/verifikasi/menunggu", get(verifikasi::menunggu))
        .route(
            "/api/verifikasi/update-status",
            patch(verifikasi::update_status),
        )
}

fn users_routes() -> Router {
    use handlers::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}

async fn root() -> ApiResponse<Value> {
    let version = env!("CARGO_PKG_VERSION");

    ApiResponse::success(json!({
        "name": "Mustahik API",
        "version": version,
        "description": "Role-scoped welfare record tracking with approval workflow and reporting",
        "endpoints": {
            "login": "POST /api/auth/login (public)",
            "pendataan": "/api/pendataan[/:id] (protected)",
            "zkup": "/api/zkup[/:id] (protected)",
            "data_mustahik": "/api/data-mustahik/{pendataan,zkup} (protected)",
            "grafik": "/api/grafik/{summary,perKabupaten,perTahun,perStatus,perPengusul} (protected)",
            "laporan": "/api/laporan/{pendataan,zkup,combined} (protected)",
            "verifikasi": "/api/verifikasi/{menunggu,update-status} (protected)",
            "users": "/api/users[/:id] (protected, admin only)",
        },
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    use axum::response::IntoResponse;

    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok",
        }))
        .into_response(),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string(),
                },
                "errorMessage": "database unavailable",
                "isSuccess": false,
            })),
        )
            .into_response(),
    }
}
