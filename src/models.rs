use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_TOPIC_LEN: usize = 100;

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ApiError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.chars().count() > MAX_EMAIL_LEN {
            return Err(ApiError::BadRequest("Invalid email address".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Emails are stored and looked up lowercased.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub idea: Option<String>,
    pub mvp_plan: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub idea: Option<String>,
    pub mvp_plan: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_count: i64,
}

#[derive(Serialize, Debug)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Deserialize, Debug)]
pub struct IdeaRequest {
    pub topic: String,
}

impl IdeaRequest {
    pub fn validated_topic(&self) -> Result<&str, ApiError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ApiError::BadRequest("Topic is required".into()));
        }
        if topic.chars().count() > MAX_TOPIC_LEN {
            return Err(ApiError::BadRequest("Topic too long".into()));
        }
        Ok(topic)
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedIdea {
    pub id: i64,
    pub title: String,
    pub idea: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct IdeaResponse {
    pub message: &'static str,
    pub project: GeneratedIdea,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MvpRequest {
    pub project_id: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMvp {
    pub id: i64,
    pub title: String,
    pub idea: Option<String>,
    pub mvp_plan: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct MvpResponse {
    pub message: &'static str,
    pub project: GeneratedMvp,
}
