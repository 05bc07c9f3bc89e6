use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use std::{collections::HashMap, sync::Arc, time::Duration};

use super::{AuthClient, BlobStorage, ClientError, NoteRepository};
use crate::models::{ImageFile, NewNote, Note, User};

#[derive(Debug, Default)]
struct MemoryState {
    notes: Vec<Note>,
    blobs: HashMap<String, Vec<u8>>,
    session: Option<User>,
}

/// In-process stand-in for the managed backend. Implements all three client
/// traits over one shared state, so clones observe each other's writes.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    media_prefix: String,
    signed_url_ttl: Duration,
}

impl MemoryBackend {
    /// Backend with an active session for `user`.
    pub fn new(user: &str, media_prefix: &str, signed_url_ttl: Duration) -> Self {
        let state = MemoryState {
            session: Some(User {
                identifier: user.to_string(),
            }),
            ..Default::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            media_prefix: media_prefix.to_string(),
            signed_url_ttl,
        }
    }

    #[cfg(test)]
    pub async fn blob_exists(&self, path: &str) -> bool {
        self.state.lock().await.blobs.contains_key(path)
    }

    #[cfg(test)]
    pub async fn blob_paths(&self) -> Vec<String> {
        self.state.lock().await.blobs.keys().cloned().collect()
    }

    #[cfg(test)]
    pub async fn stored_notes(&self) -> Vec<Note> {
        self.state.lock().await.notes.clone()
    }

    /// Inserts a note directly, bypassing the session.
    #[cfg(test)]
    pub async fn seed_note(&self, note: Note) {
        self.state.lock().await.notes.push(note);
    }

    #[cfg(test)]
    pub async fn seed_blob(&self, path: &str, bytes: &[u8]) {
        self.state
            .lock()
            .await
            .blobs
            .insert(path.to_string(), bytes.to_vec());
    }

    async fn session(&self) -> Result<User, ClientError> {
        self.state
            .lock()
            .await
            .session
            .clone()
            .ok_or(ClientError::Unauthenticated)
    }
}

#[async_trait]
impl NoteRepository for MemoryBackend {
    async fn list(&self) -> Result<Vec<Note>, ClientError> {
        let user = self.session().await?;
        let state = self.state.lock().await;

        Ok(state
            .notes
            .iter()
            .filter(|note| note.owner == user.identifier)
            .cloned()
            .collect())
    }

    async fn create(&self, note: NewNote) -> Result<Note, ClientError> {
        self.session().await?;

        let created = Note {
            id: Uuid::new_v4().to_string(),
            name: note.name,
            description: note.description,
            image: note.image,
            owner: note.owner,
            image_url: None,
        };

        self.state.lock().await.notes.push(created.clone());
        tracing::debug!("memory backend stored note {}", created.id);

        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.session().await?;
        let mut state = self.state.lock().await;

        let before = state.notes.len();
        state.notes.retain(|note| note.id != id);

        if state.notes.len() == before {
            return Err(ClientError::NotFound(format!("note {id}")));
        }

        Ok(())
    }
}

#[async_trait]
impl BlobStorage for MemoryBackend {
    async fn upload(&self, key: &str, file: &ImageFile) -> Result<String, ClientError> {
        let user = self.session().await?;
        let path = format!("{}/{}/{}", self.media_prefix, user.identifier, key);

        self.state
            .lock()
            .await
            .blobs
            .insert(path.clone(), file.bytes.clone());

        Ok(path)
    }

    async fn signed_url(&self, path: &str) -> Result<String, ClientError> {
        if !self.state.lock().await.blobs.contains_key(path) {
            return Err(ClientError::NotFound(format!("blob {path}")));
        }

        let ttl = chrono::Duration::from_std(self.signed_url_ttl)
            .map_err(|e| ClientError::Config(format!("signed url ttl: {e}")))?;
        let expires = (Utc::now() + ttl).timestamp();

        Ok(format!("memory://{path}?expires={expires}"))
    }

    async fn remove(&self, path: &str) -> Result<(), ClientError> {
        match self.state.lock().await.blobs.remove(path) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(format!("blob {path}"))),
        }
    }
}

#[async_trait]
impl AuthClient for MemoryBackend {
    async fn current_user(&self) -> Result<User, ClientError> {
        self.session().await
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.state.lock().await.session = None;
        Ok(())
    }
}
