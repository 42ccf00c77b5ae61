use std::sync::Arc;

use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::auth::SESSION_COOKIE;
use crate::auth::session::SessionStore;
use crate::db::get_user;

use super::User;

/// Session guard for every data-access endpoint: resolves the session cookie
/// to a known user or short-circuits with 401 before any store operation.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("session_guard");
        let _guard = auth_span.enter();

        let token = request
            .cookies()
            .get_private(SESSION_COOKIE)
            .map(|c| c.value().to_string());

        let token = match token {
            Some(token) => token,
            _ => return Outcome::Error((Status::Unauthorized, ())),
        };

        let sessions = match request.rocket().state::<Arc<dyn SessionStore>>() {
            Some(sessions) => sessions,
            _ => {
                tracing::error!("Session store not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let db = match request.rocket().state::<SqlitePool>() {
            Some(pool) => pool,
            _ => {
                tracing::error!("Database pool not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let session = match sessions.validate(&token).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = ?err, "Rejected session token");
                return Outcome::Error((Status::Unauthorized, ()));
            }
        };

        match get_user(db, session.user_id).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "User authenticated via session token");
                Outcome::Success(user)
            }
            Err(err) => {
                tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::Unauthorized,
        Json(json!({ "message": "Not authenticated" })),
    )
}
