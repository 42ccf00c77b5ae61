use serde::Serialize;

/// An authenticated identity. Local accounts carry a bcrypt hash in the
/// store; GitHub-linked accounts carry a github_id. A row always has at
/// least one of the two.
#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub github_id: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub github_id: Option<String>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            github_id: user.github_id,
        }
    }
}
