use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The fixed set of practice types the client offers. Stored as the display
/// string so rows stay readable in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PracticeCategory {
    #[default]
    Straight,
    #[serde(rename = "Right Spin")]
    RightSpin,
    #[serde(rename = "Left Spin")]
    LeftSpin,
    Backspin,
    #[serde(rename = "Stun Shot")]
    StunShot,
    #[serde(rename = "Easy Drill")]
    EasyDrill,
    #[serde(rename = "Medium Drill")]
    MediumDrill,
    #[serde(rename = "Hard Drill")]
    HardDrill,
}

impl PracticeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeCategory::Straight => "Straight",
            PracticeCategory::RightSpin => "Right Spin",
            PracticeCategory::LeftSpin => "Left Spin",
            PracticeCategory::Backspin => "Backspin",
            PracticeCategory::StunShot => "Stun Shot",
            PracticeCategory::EasyDrill => "Easy Drill",
            PracticeCategory::MediumDrill => "Medium Drill",
            PracticeCategory::HardDrill => "Hard Drill",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Straight" => Some(PracticeCategory::Straight),
            "Right Spin" => Some(PracticeCategory::RightSpin),
            "Left Spin" => Some(PracticeCategory::LeftSpin),
            "Backspin" => Some(PracticeCategory::Backspin),
            "Stun Shot" => Some(PracticeCategory::StunShot),
            "Easy Drill" => Some(PracticeCategory::EasyDrill),
            "Medium Drill" => Some(PracticeCategory::MediumDrill),
            "Hard Drill" => Some(PracticeCategory::HardDrill),
            _ => None,
        }
    }
}

/// One logged practice session, owned by exactly one user. Serialized in the
/// camelCase shape the original client consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRecord {
    pub id: i64,
    pub user_id: i64,
    pub practice_type: PracticeCategory,
    pub duration: i64,
    pub score: i64,
    pub date: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbPracticeRecord {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub practice_type: Option<String>,
    pub duration: Option<i64>,
    pub score: Option<i64>,
    pub date: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbPracticeRecord> for PracticeRecord {
    fn from(record: DbPracticeRecord) -> Self {
        Self {
            id: record.id.unwrap_or_default(),
            user_id: record.user_id.unwrap_or_default(),
            practice_type: record
                .practice_type
                .as_deref()
                .and_then(PracticeCategory::from_str)
                .unwrap_or_default(),
            duration: record.duration.unwrap_or_default(),
            score: record.score.unwrap_or_default(),
            date: record.date.unwrap_or_default(),
        }
    }
}

/// Request body for add and update. The owning user never comes from here:
/// any `userId` the client sends is discarded in favor of the session user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub practice_type: PracticeCategory,
    #[validate(range(min = 1, message = "Duration must be a positive number of minutes"))]
    pub duration: i64,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    pub score: i64,
    pub date: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}
