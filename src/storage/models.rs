use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of uploaded content. Closed set: anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Paper,
    Video,
}

const PAPER_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Paper => "paper",
            ContentType::Video => "video",
        }
    }

    /// Whether a payload with this MIME type may be uploaded as this kind of content.
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        let mime_type = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match self {
            ContentType::Video => mime_type.starts_with("video/"),
            ContentType::Paper => PAPER_MIME_TYPES.contains(&mime_type.as_str()),
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "paper" => Ok(ContentType::Paper),
            "video" => Ok(ContentType::Video),
            other => Err(format!("type must be one of: video, paper (got '{other}')")),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    /// Trimmed and lower-cased; unique across users
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for one uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    pub tags: Vec<String>,
    /// Public path of the stored object, `/uploads/<key>`. Never rewritten.
    pub file_url: String,
    /// Object store key backing `file_url`
    pub storage_key: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub uploaded_by: String,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single free-form note a user keeps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub study: String,
    #[serde(default)]
    pub about: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub study: Option<String>,
    pub about: Option<String>,
}

/// A pending password reset. Keyed by the digest of the mailed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_closed_set() {
        assert_eq!("video".parse::<ContentType>(), Ok(ContentType::Video));
        assert_eq!(" paper ".parse::<ContentType>(), Ok(ContentType::Paper));
        assert!("audio".parse::<ContentType>().is_err());
        assert!("Video".parse::<ContentType>().is_err());
    }

    #[test]
    fn video_accepts_any_video_subtype() {
        assert!(ContentType::Video.accepts_mime("video/mp4"));
        assert!(ContentType::Video.accepts_mime("video/quicktime"));
        assert!(!ContentType::Video.accepts_mime("application/pdf"));
    }

    #[test]
    fn paper_accepts_documents_only() {
        assert!(ContentType::Paper.accepts_mime("application/pdf"));
        assert!(ContentType::Paper.accepts_mime("application/msword"));
        assert!(ContentType::Paper.accepts_mime(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(ContentType::Paper.accepts_mime("Application/PDF; charset=binary"));
        assert!(!ContentType::Paper.accepts_mime("image/png"));
        assert!(!ContentType::Paper.accepts_mime("video/mp4"));
    }
}
