use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::{DbUser, User};
use crate::error::AppError;
use crate::models::{DbPracticeRecord, PracticeRecord, RecordRequest};

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, DbUser>("SELECT id, username, github_id FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, github_id FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument(skip_all, fields(username))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    if find_user_by_username(pool, username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(hashed_password)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

/// Resolves local credentials to a user. An unknown username and a wrong
/// password fail differently so the API can tell them apart.
#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    info!("Authenticating user");

    #[derive(sqlx::FromRow)]
    struct CredentialRow {
        id: i64,
        username: String,
        password: Option<String>,
        github_id: Option<String>,
    }

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, username, password, github_id FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        _ => return Err(AppError::NotFound("User not found".to_string())),
    };

    // Provider-only accounts have no local secret to compare against
    let hash = match &row.password {
        Some(hash) => hash,
        _ => return Err(AppError::Authentication("Incorrect password".to_string())),
    };

    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(User {
            id: row.id,
            username: row.username,
            github_id: row.github_id,
        }),
        _ => Err(AppError::Authentication("Incorrect password".to_string())),
    }
}

/// Looks up the user linked to a GitHub identity, creating one on first
/// login with the provider-supplied username.
#[instrument(skip_all, fields(github_id))]
pub async fn find_or_create_github_user(
    pool: &Pool<Sqlite>,
    github_id: &str,
    username: &str,
) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, github_id FROM users WHERE github_id = ?",
    )
    .bind(github_id)
    .fetch_optional(pool)
    .await?;

    if let Some(user) = row {
        return Ok(User::from(user));
    }

    info!("Creating user for first GitHub login");

    let res = sqlx::query("INSERT INTO users (username, github_id) VALUES (?, ?)")
        .bind(username)
        .bind(github_id)
        .execute(pool)
        .await?;

    get_user(pool, res.last_insert_rowid()).await
}

#[instrument]
pub async fn get_records_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<PracticeRecord>, AppError> {
    info!("Listing practice records");

    let rows = sqlx::query_as::<_, DbPracticeRecord>(
        "SELECT * FROM practice_records WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PracticeRecord::from).collect())
}

#[instrument]
pub async fn get_record(pool: &Pool<Sqlite>, id: i64) -> Result<PracticeRecord, AppError> {
    let row = sqlx::query_as::<_, DbPracticeRecord>("SELECT * FROM practice_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(record) => Ok(PracticeRecord::from(record)),
        _ => Err(AppError::NotFound("Entry not found".to_string())),
    }
}

#[instrument(skip(request))]
pub async fn create_record(
    pool: &Pool<Sqlite>,
    user_id: i64,
    request: &RecordRequest,
) -> Result<PracticeRecord, AppError> {
    info!("Creating practice record");

    let res = sqlx::query(
        "INSERT INTO practice_records (user_id, practice_type, duration, score, date)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(request.practice_type.as_str())
    .bind(request.duration)
    .bind(request.score)
    .bind(&request.date)
    .execute(pool)
    .await?;

    get_record(pool, res.last_insert_rowid()).await
}

/// Full replacement of the mutable fields by record id. The owner is never
/// touched, and deliberately not re-checked against the caller.
#[instrument(skip(request))]
pub async fn update_record(
    pool: &Pool<Sqlite>,
    id: i64,
    request: &RecordRequest,
) -> Result<PracticeRecord, AppError> {
    info!("Updating practice record");

    let now = chrono::Utc::now().naive_utc();
    let res = sqlx::query(
        "UPDATE practice_records
         SET practice_type = ?, duration = ?, score = ?, date = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(request.practice_type.as_str())
    .bind(request.duration)
    .bind(request.score)
    .bind(&request.date)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }

    get_record(pool, id).await
}

/// Deletes by id. Succeeds whether or not the row existed.
#[instrument]
pub async fn delete_record(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting practice record");

    sqlx::query("DELETE FROM practice_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
