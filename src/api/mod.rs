pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use state::AppState;

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Payment routes, including the gateway webhook (no auth)
        .nest("/api", api_routes())

        // Public routes (storefront listing)
        .nest("/public", public_routes())

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payments/stk-push",
            post(handlers::payments::stk_push).put(handlers::payments::stk_callback),
        )
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/shops", get(handlers::shops::list_public))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sweep", post(handlers::admin::sweep))
        .route(
            "/settings/billing",
            get(handlers::admin::get_billing_settings).put(handlers::admin::update_billing_settings),
        )
        .nest("/payments", payment_routes())
        .nest("/shops", shop_routes())
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::payments::list).post(handlers::payments::create))
        .route(
            "/:id",
            get(handlers::payments::get)
                .put(handlers::payments::update)
                .delete(handlers::payments::delete),
        )
        .route("/:id/mark-paid", post(handlers::payments::mark_paid))
}

fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::shops::list).post(handlers::shops::create))
        .route(
            "/:id",
            get(handlers::shops::get)
                .put(handlers::shops::update)
                .delete(handlers::shops::delete),
        )
        .route("/:id/approve", post(handlers::shops::approve))
        .route("/:id/reject", post(handlers::shops::reject))
        .route("/:id/payments", get(handlers::payments::list_by_shop))
        .route("/:id/send-reminder", post(handlers::shops::send_reminder))
        .route("/:id/reminders", get(handlers::shops::reminder_history))
}
