//! # iv-api
//!
//! The web routing and orchestration layer for IdeaVault.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the JSON API routes.
///
/// # Developer Note
/// We use a scoped configuration so the main binary can mount the API
/// under a different prefix if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Sessions
            .route("/auth/sign-in", web::post().to(handlers::sign_in))
            .route("/auth/sign-out", web::post().to(handlers::sign_out))
            // The idea collection (list view + mutations)
            .route("/ideas", web::get().to(handlers::list_ideas))
            .route("/ideas", web::post().to(handlers::create_idea))
            .route("/ideas/{id}", web::put().to(handlers::update_idea))
            .route("/ideas/{id}", web::delete().to(handlers::delete_idea))
            // Image uploads (must land before the idea that references them)
            .route("/uploads", web::post().to(handlers::upload_image))
            // Derived views
            .route("/calendar/{year}/{month}", web::get().to(handlers::calendar_month))
            .route("/dashboard", web::get().to(handlers::dashboard)),
    );
}
