//! edu-portal - Backend API for an educational content portal
//!
//! This crate provides:
//! - Account registration and login with Argon2id password hashes and HS256 bearer tokens
//! - Authenticated multipart upload of videos and papers to swappable object storage
//!   (local filesystem, GCS), with metadata in a redb embedded database
//! - Public browsing and streaming of uploaded content
//! - Per-user notes and profiles
//! - Interview practice backed by an external chat-completion API

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod external;
pub mod object_store;
pub mod storage;

use std::sync::Arc;

use config::Config;
use external::{CompletionClient, Mailer};
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub completions: Arc<dyn CompletionClient>,
}
