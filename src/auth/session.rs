use chrono::{NaiveDateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use rocket::http::{Cookie, CookieJar, SameSite};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session_token";

/// Fixed absolute session lifetime. There is no sliding expiration: a session
/// dies 24 hours after login regardless of activity.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now().naive_utc()
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSession {
    pub user_id: Option<i64>,
    pub token: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<DbSession> for Session {
    fn from(session: DbSession) -> Self {
        Self {
            user_id: session.user_id.unwrap_or_default(),
            token: session.token.unwrap_or_default(),
            expires_at: session.expires_at.unwrap_or_default(),
        }
    }
}

/// Server-side session state keyed by an opaque token. The backing store is
/// swappable without touching the auth contract.
#[rocket::async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session for the user and returns it, token included.
    async fn create(&self, user_id: i64, expires_at: NaiveDateTime) -> Result<Session, AppError>;

    /// Resolves a token to a live session. Unknown and expired tokens both
    /// fail with an authentication error.
    async fn validate(&self, token: &str) -> Result<Session, AppError>;

    /// Tears down the session for the token. Destroying an unknown token is
    /// not an error.
    async fn destroy(&self, token: &str) -> Result<(), AppError>;

    /// Removes expired sessions, returning how many were dropped.
    async fn purge_expired(&self) -> Result<u64, AppError>;
}

pub struct DbSessionStore {
    pool: SqlitePool,
}

impl DbSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl SessionStore for DbSessionStore {
    #[instrument(skip(self))]
    async fn create(&self, user_id: i64, expires_at: NaiveDateTime) -> Result<Session, AppError> {
        info!("Creating user session");

        let token = Session::generate_token();

        sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(&token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(Session {
            user_id,
            token,
            expires_at,
        })
    }

    #[instrument(skip_all)]
    async fn validate(&self, token: &str) -> Result<Session, AppError> {
        let row = sqlx::query_as::<_, DbSession>(
            "SELECT user_id, token, expires_at FROM user_sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let session = match row {
            Some(row) => Session::from(row),
            _ => return Err(AppError::Authentication("Invalid session token".to_string())),
        };

        if !session.is_valid() {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        Ok(session)
    }

    #[instrument(skip_all)]
    async fn destroy(&self, token: &str) -> Result<(), AppError> {
        info!("Invalidating session");

        sqlx::query("DELETE FROM user_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Binds a freshly created session to the client. HTTP-only and Lax always;
/// transport-secure only under the production profile.
pub fn add_session_cookie(cookies: &CookieJar<'_>, token: String) {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(is_production())
        .max_age(rocket::time::Duration::hours(SESSION_TTL_HOURS));

    cookies.add_private(cookie);
}

pub fn remove_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::build(SESSION_COOKIE));
}

fn is_production() -> bool {
    dotenvy::var("ROCKET_PROFILE").unwrap_or_default() == "production"
}
