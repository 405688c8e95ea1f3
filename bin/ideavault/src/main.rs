//! # IdeaVault Binary
//!
//! The entry point that assembles the application based on compile-time
//! features: a repo, a media store, and an auth provider behind the
//! `iv-core` ports, served through the `iv-api` routes.

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use iv_api::handlers::AppState;
use iv_api::middleware;

// Feature-gated imports select the plugin set at compile time.
#[cfg(feature = "db-sqlite")]
use iv_db_sqlite::SqliteIdeaRepo;

#[cfg(feature = "storage-local")]
use iv_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use iv_auth_simple::SimpleAuthProvider;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let bind = env_or("IDEAVAULT_BIND", "127.0.0.1:8080");
    let db_url = env_or("IDEAVAULT_DB", "sqlite:ideavault.db");
    let upload_root = env_or("IDEAVAULT_UPLOADS", "./data/uploads");
    let upload_prefix = "/static/uploads";

    // 1. Database implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteIdeaRepo::new(&db_url)
        .await
        .with_context(|| format!("opening idea store at {db_url}"))?;

    // 2. Storage implementation
    #[cfg(feature = "storage-local")]
    let store = LocalMediaStore::new(upload_root.clone().into(), upload_prefix.to_string());

    // 3. Auth implementation, seeded with one account from the env
    #[cfg(feature = "auth-simple")]
    let auth = {
        let username = env_or("IDEAVAULT_USER", "demo");
        let password = env_or("IDEAVAULT_PASSWORD", "demo");
        let salt = env_or("IDEAVAULT_SESSION_SALT", "ideavault-dev-salt");
        let hash = SimpleAuthProvider::hash_password(&password)
            .context("hashing the seeded account password")?;
        SimpleAuthProvider::new(&salt).with_account(&username, &format!("user-{username}"), &hash)
    };

    // 4. Wrap in AppState (dynamic dispatch behind the ports)
    let state = web::Data::new(AppState {
        repo: Box::new(repo),
        store: Box::new(store),
        auth: Box::new(auth),
    });

    log::info!("IdeaVault starting on http://{bind}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::standard_middleware())
            .wrap(middleware::cors_policy())
            .configure(iv_api::configure_routes)
            .service(Files::new(upload_prefix, upload_root.clone()))
    })
    .bind(&bind)
    .with_context(|| format!("binding {bind}"))?
    .run()
    .await?;

    Ok(())
}
