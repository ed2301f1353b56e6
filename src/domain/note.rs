use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTE_TITLE: &str = "Session Insights";

#[derive(Debug, Clone, Deserialize)]
pub struct PublishNoteRequest {
    pub user_email: String,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewClientNote {
    pub user_email: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientNote {
    pub id: i64,
    pub user_email: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PublishNoteRequest {
    pub fn into_note(self) -> Result<NewClientNote, String> {
        let user_email = self.user_email.trim().to_string();
        if !user_email.contains('@') {
            return Err("user_email must be a valid email address".to_string());
        }
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err("content must not be empty".to_string());
        }
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string());

        Ok(NewClientNote {
            user_email,
            title,
            content,
        })
    }
}
