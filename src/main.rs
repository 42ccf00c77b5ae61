#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod models;
mod telemetry;
#[cfg(test)]
mod test;

use std::sync::Arc;

use api::{
    api_add_record, api_delete_record, api_get_records, api_github_callback, api_github_login,
    api_login, api_logout, api_signup, api_update_record, health,
};
use auth::GitHubOauth;
use auth::authentication::unauthorized_api;
use auth::session::{DbSessionStore, SessionStore};
use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing};
use tracing::{error, info};

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }
    init_tracing();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    let sessions: Arc<dyn SessionStore> = Arc::new(DbSessionStore::new(pool.clone()));

    let cleanup_sessions = sessions.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match cleanup_sessions.purge_expired().await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    init_rocket(pool, sessions).await
}

pub async fn init_rocket(pool: SqlitePool, sessions: Arc<dyn SessionStore>) -> Rocket<Build> {
    info!("Starting practice tracker");

    rocket::build()
        .manage(pool)
        .manage(sessions)
        .manage(GitHubOauth::from_env())
        .mount(
            "/api",
            routes![
                api_signup,
                api_login,
                api_logout,
                api_github_login,
                api_github_callback,
                api_get_records,
                api_add_record,
                api_update_record,
                api_delete_record,
                health,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .attach(TelemetryFairing)
}
