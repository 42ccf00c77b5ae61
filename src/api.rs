use std::sync::Arc;

use chrono::Utc;
use rocket::State;
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;
use validator::Validate;

use crate::auth::session::SessionStore;
use crate::auth::{
    GitHubOauth, SESSION_COOKIE, SESSION_TTL_HOURS, User, add_session_cookie,
    remove_session_cookie, store_csrf_cookie, take_csrf_cookie,
};
use crate::db::{
    authenticate_user, create_record, create_user, delete_record, find_or_create_github_user,
    get_records_for_user, update_record,
};
use crate::error::AppError;
use crate::models::{PracticeRecord, RecordRequest};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserSummary,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub username: String,
    pub id: i64,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            id: user.id,
        }
    }
}

/// Registers a local account. Does not log the new user in.
#[post("/signup", data = "<signup>")]
pub async fn api_signup(
    signup: Json<SignupRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SignupResponse>, AppError> {
    let (username, password) = match (&signup.username, &signup.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username, password)
        }
        _ => {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }
    };

    create_user(db, username, password).await?;

    Ok(Json(SignupResponse {
        success: true,
        message: "User created successfully".to_string(),
    }))
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    sessions: &State<Arc<dyn SessionStore>>,
) -> Result<Json<LoginResponse>, AppError> {
    info!(username = %login.username, "Login attempt");

    let user = authenticate_user(db, &login.username, &login.password).await?;

    establish_session(sessions.inner().as_ref(), cookies, user.id).await?;

    Ok(Json(LoginResponse {
        success: true,
        user: UserSummary::from(user),
    }))
}

/// Destroys the server-side session named by the cookie, if there is one.
/// Safe to call again after the session is gone.
#[get("/logout")]
pub async fn api_logout(
    cookies: &CookieJar<'_>,
    sessions: &State<Arc<dyn SessionStore>>,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE) {
        sessions.destroy(cookie.value()).await?;
        remove_session_cookie(cookies);
    }

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// First leg of the OAuth flow: park the CSRF state in a cookie and hand the
/// client to GitHub's consent page.
#[get("/auth/github")]
pub async fn api_github_login(
    cookies: &CookieJar<'_>,
    github: &State<GitHubOauth>,
) -> Result<Redirect, AppError> {
    let (url, csrf_token) = github.authorize_url()?;

    store_csrf_cookie(cookies, &csrf_token);

    info!("Dispatching GitHub OAuth redirect");
    Ok(Redirect::to(url.to_string()))
}

/// Provider callback. Every failure path lands the client back on the
/// unauthenticated root; only a fully established session redirects onward.
#[get("/auth/github/callback?<code>&<state>")]
pub async fn api_github_callback(
    code: Option<String>,
    state: Option<String>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    sessions: &State<Arc<dyn SessionStore>>,
    github: &State<GitHubOauth>,
) -> Redirect {
    let result = complete_github_login(
        code,
        state,
        cookies,
        db,
        sessions.inner().as_ref(),
        github,
    )
    .await;

    match result {
        Ok(user) => {
            info!(username = %user.username, "GitHub login established session");
            Redirect::to("/InputSection")
        }
        Err(err) => {
            err.log_and_record("GitHub OAuth callback");
            Redirect::to("/")
        }
    }
}

async fn complete_github_login(
    code: Option<String>,
    state: Option<String>,
    cookies: &CookieJar<'_>,
    db: &SqlitePool,
    sessions: &dyn SessionStore,
    github: &GitHubOauth,
) -> Result<User, AppError> {
    let stored_state = take_csrf_cookie(cookies)
        .ok_or_else(|| AppError::Authentication("Missing CSRF state cookie".to_string()))?;

    let state = state
        .ok_or_else(|| AppError::Authentication("Missing state in callback".to_string()))?;

    if state != stored_state {
        return Err(AppError::Authentication("CSRF state mismatch".to_string()));
    }

    let code =
        code.ok_or_else(|| AppError::Authentication("Missing code in callback".to_string()))?;

    let access_token = github.exchange_code(code).await?;
    let profile = github.fetch_profile(&access_token).await?;

    let user = find_or_create_github_user(db, &profile.id.to_string(), &profile.login).await?;

    establish_session(sessions, cookies, user.id).await?;

    Ok(user)
}

#[get("/data")]
pub async fn api_get_records(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<PracticeRecord>>, AppError> {
    let records = get_records_for_user(db, user.id).await?;
    Ok(Json(records))
}

/// Persists a new record. Ownership is forced to the session user no matter
/// what the body claims.
#[post("/add", data = "<record>")]
pub async fn api_add_record(
    record: Json<RecordRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PracticeRecord>, AppError> {
    let request = record.into_inner();
    request.validate()?;

    let created = create_record(db, user.id, &request).await?;

    Ok(Json(created))
}

#[put("/update/<id>", data = "<record>")]
pub async fn api_update_record(
    id: i64,
    record: Json<RecordRequest>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PracticeRecord>, AppError> {
    let request = record.into_inner();
    request.validate()?;

    let updated = update_record(db, id, &request).await?;

    Ok(Json(updated))
}

#[delete("/delete/<id>")]
pub async fn api_delete_record(
    id: i64,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<&'static str, AppError> {
    delete_record(db, id).await?;

    Ok("Entry deleted")
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

async fn establish_session(
    sessions: &dyn SessionStore,
    cookies: &CookieJar<'_>,
    user_id: i64,
) -> Result<(), AppError> {
    let expires_at = (Utc::now() + chrono::Duration::hours(SESSION_TTL_HOURS)).naive_utc();

    let session = sessions.create(user_id, expires_at).await?;
    add_session_cookie(cookies, session.token);

    Ok(())
}
