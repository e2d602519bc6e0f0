mod admin;
mod auth;
mod content;
mod interview;
mod notes;
mod profile;
mod uploads;

pub use admin::{admin_purge, health, HealthResponse, PurgeResponse};
pub use auth::{forgot_password, login, register, reset_password};
pub use content::{
    all_content, my_uploads, parse_tags, storage_key, upload_content, ContentResponse,
    UPLOADS_PREFIX,
};
pub use interview::{generate_feedback, generate_questions, FeedbackResponse, QuestionsResponse};
pub use notes::{delete_note, get_note, save_note, DeleteNoteResponse, NoteResponse};
pub use profile::{get_profile, update_profile, ProfileResponse};
pub use uploads::serve_upload;
