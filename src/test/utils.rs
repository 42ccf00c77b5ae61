use std::collections::HashMap;
use std::sync::Arc;

use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::json;
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::auth::session::{DbSessionStore, SessionStore};
use crate::db::{create_record, create_user};
use crate::error::AppError;
use crate::models::{PracticeCategory, RecordRequest};

pub static STANDARD_PASSWORD: &str = "password123";

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    records: Vec<TestRecord>,
}

pub struct TestUser {
    pub username: String,
    pub password: String,
}

pub struct TestRecord {
    pub owner_username: String,
    pub practice_type: PracticeCategory,
    pub duration: i64,
    pub score: i64,
    pub date: String,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, username: &str) -> Self {
        self.users.push(TestUser {
            username: username.to_string(),
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn user_with_password(mut self, username: &str, password: &str) -> Self {
        self.users.push(TestUser {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn record(
        mut self,
        owner_username: &str,
        practice_type: PracticeCategory,
        duration: i64,
        score: i64,
        date: &str,
    ) -> Self {
        self.records.push(TestRecord {
            owner_username: owner_username.to_string(),
            practice_type,
            duration,
            score,
            date: date.to_string(),
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut user_id_map: HashMap<String, i64> = HashMap::new();

        for user in &self.users {
            let user_id = create_user(&pool, &user.username, &user.password).await?;
            user_id_map.insert(user.username.clone(), user_id);
        }

        let mut record_ids: Vec<i64> = Vec::new();

        for record in &self.records {
            let owner_id = user_id_map
                .get(&record.owner_username)
                .copied()
                .ok_or_else(|| {
                    AppError::Internal(format!("Unknown record owner {}", record.owner_username))
                })?;

            let request = RecordRequest {
                practice_type: record.practice_type,
                duration: record.duration,
                score: record.score,
                date: record.date.clone(),
                user_id: None,
            };

            let created = create_record(&pool, owner_id, &request).await?;
            record_ids.push(created.id);
        }

        Ok(TestDb {
            pool,
            user_id_map,
            record_ids,
        })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub user_id_map: HashMap<String, i64>,
    pub record_ids: Vec<i64>,
}

impl TestDb {
    pub fn user_id(&self, username: &str) -> Option<i64> {
        self.user_id_map.get(username).copied()
    }

    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        Arc::new(DbSessionStore::new(self.pool.clone()))
    }
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let rocket = crate::init_rocket(test_db.pool.clone(), test_db.session_store()).await;

    let client = Client::tracked(rocket)
        .await
        .expect("Failed to build test client");

    (client, test_db)
}

/// Logs in through the real endpoint; the tracked client keeps the session
/// cookie for subsequent requests.
pub async fn login_test_user(client: &Client, username: &str, password: &str) {
    let response = client
        .post("/api/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": username,
                "password": password
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok, "Login failed for {}", username);
}
