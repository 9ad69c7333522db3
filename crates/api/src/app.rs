use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::MailDispatcher;
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::user_auth::UserAuth;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_staff, resolve_principal,
    security_headers_middleware, trace_id,
};
use crate::routes::{admin_fields, admin_forms, forms, health};
use crate::services::EmailService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Token verifier; `None` when no public key is configured.
    pub jwt: Option<Arc<JwtConfig>>,
    pub mailer: Arc<dyn MailDispatcher>,
}

/// Builds the router with the email service chosen by configuration.
pub fn create_app(config: Config, pool: PgPool) -> Router {
    let mailer = Arc::new(EmailService::new(config.email.clone()));
    create_app_with_mailer(config, pool, mailer)
}

/// Builds the router with the given mail dispatcher.
pub fn create_app_with_mailer(
    config: Config,
    pool: PgPool,
    mailer: Arc<dyn MailDispatcher>,
) -> Router {
    let config = Arc::new(config);

    let jwt = match UserAuth::create_jwt_config(&config.jwt) {
        Ok(Some(jwt)) => Some(Arc::new(jwt)),
        Ok(None) => {
            tracing::warn!("No JWT public key configured, all requests are anonymous");
            None
        }
        Err(e) => {
            tracing::error!("{}, all requests are anonymous", e);
            None
        }
    };

    let state = AppState {
        pool,
        config: config.clone(),
        jwt,
        mailer,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public form routes; the principal may be anonymous
    let form_routes = Router::new()
        .route("/api/v1/forms", get(forms::list_forms))
        .route("/api/v1/forms/:slug", get(forms::get_form))
        .route("/api/v1/forms/:slug/entries", post(forms::submit_entry))
        .route("/api/v1/forms/:slug/responses", get(forms::get_responses));

    // Staff routes
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/forms",
            get(admin_forms::list_forms).post(admin_forms::create_form),
        )
        .route(
            "/api/v1/admin/forms/:form_id",
            get(admin_forms::get_form)
                .put(admin_forms::update_form)
                .delete(admin_forms::delete_form),
        )
        .route(
            "/api/v1/admin/forms/:form_id/fields",
            get(admin_fields::list_fields).post(admin_fields::create_field),
        )
        .route(
            "/api/v1/admin/forms/:form_id/fields/:field_id",
            put(admin_fields::update_field).delete(admin_fields::delete_field),
        )
        .route(
            "/api/v1/admin/forms/:form_id/entries",
            get(admin_forms::list_entries),
        )
        .route(
            "/api/v1/admin/forms/:form_id/entries/export",
            get(admin_forms::export_entries),
        )
        .route_layer(middleware::from_fn(require_staff));

    // Authenticated or not, every API request gets a principal
    let api_routes = Router::new()
        .merge(form_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_principal,
        ));

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
