//! Clients for the managed backend that owns notes, blobs and sessions.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::{ImageFile, NewNote, Note, User};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no authenticated session")]
    Unauthenticated,

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Object model for notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes visible to the current session, in backend order.
    async fn list(&self) -> Result<Vec<Note>, ClientError>;

    async fn create(&self, note: NewNote) -> Result<Note, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// Blob storage for note images.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `file` under `key`, scoped to the current identity.
    /// Returns the full storage path.
    async fn upload(&self, key: &str, file: &ImageFile) -> Result<String, ClientError>;

    /// Resolves a storage path to a time-limited URL.
    async fn signed_url(&self, path: &str) -> Result<String, ClientError>;

    async fn remove(&self, path: &str) -> Result<(), ClientError>;
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn current_user(&self) -> Result<User, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;
}
