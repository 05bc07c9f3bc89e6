use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use std::sync::Arc;

use crate::{
    dto::DraftText,
    models::{Draft, DraftImage, ImageFile, NewNote, Note},
    repository::{AuthClient, BlobStorage, ClientError, NoteRepository},
};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("note {0} is not on the board")]
    NoteNotFound(String),
}

#[derive(Debug, Default)]
struct BoardState {
    notes: Vec<Note>,
    draft: Draft,
    /// Last generation handed to an upload. Only grows.
    generation: u64,
    /// Millisecond stamp of the last storage key. Only grows, so two
    /// selections never share a key.
    key_millis: i64,
}

impl BoardState {
    /// Next key stamp: `now`, or one past the previous stamp when the clock
    /// has not moved on.
    fn next_key_millis(&mut self, now: DateTime<Utc>) -> i64 {
        self.key_millis = now.timestamp_millis().max(self.key_millis + 1);
        self.key_millis
    }
}

/// Owns the note list and the draft form. Every mutation goes through the
/// state lock; list, create and delete hold it for their whole duration,
/// uploads release it while the bytes are in flight.
pub struct NoteBoard {
    notes: Arc<dyn NoteRepository>,
    storage: Arc<dyn BlobStorage>,
    auth: Arc<dyn AuthClient>,
    state: Mutex<BoardState>,
}

/// Storage key for a freshly selected file: upload time in unix millis,
/// then the file name with path separators flattened.
pub fn storage_key(millis: i64, file_name: &str) -> String {
    format!("{millis}_{}", file_name.replace('/', "_"))
}

fn preview_ref(file: &ImageFile) -> String {
    format!("local:{}/{}", Uuid::new_v4(), file.name)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl NoteBoard {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        storage: Arc<dyn BlobStorage>,
        auth: Arc<dyn AuthClient>,
    ) -> Self {
        Self {
            notes,
            storage,
            auth,
            state: Mutex::new(BoardState::default()),
        }
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.state.lock().await.notes.clone()
    }

    pub async fn find_note(&self, id: &str) -> Option<Note> {
        self.state
            .lock()
            .await
            .notes
            .iter()
            .find(|note| note.id == id)
            .cloned()
    }

    pub async fn draft(&self) -> Draft {
        self.state.lock().await.draft.clone()
    }

    /// Fetches every note of the session and replaces the local list.
    /// Images that fail to resolve leave the note without `image_url`.
    pub async fn list_notes(&self) -> Result<Vec<Note>, BoardError> {
        let mut state = self.state.lock().await;

        let mut notes = self.notes.list().await?;
        for note in &mut notes {
            note.image_url = self.resolve_image_url(note).await;
        }

        tracing::info!("Loaded {} notes", notes.len());
        state.notes.clone_from(&notes);

        Ok(notes)
    }

    /// Handles a change of the file input. `None` means the selection was
    /// cleared. A selected file is uploaded right away; the draft only gets
    /// its storage path if no newer image transition happened meanwhile.
    pub async fn select_image(&self, file: Option<ImageFile>) -> Result<Draft, BoardError> {
        let Some(file) = file else {
            return Ok(self.remove_image().await);
        };

        let (key, generation) = {
            let mut state = self.state.lock().await;
            let key = storage_key(state.next_key_millis(Utc::now()), &file.name);
            let generation = state.generation + 1;
            state.generation = generation;
            state.draft.image = DraftImage::Uploading {
                file: file.clone(),
                preview: preview_ref(&file),
                generation,
            };
            (key, generation)
        };

        tracing::info!("Uploading '{}' as {}", file.name, key);
        let result = self.storage.upload(&key, &file).await;

        let mut state = self.state.lock().await;
        let image = std::mem::take(&mut state.draft.image);
        match image {
            DraftImage::Uploading {
                file,
                preview,
                generation: current,
            } if current == generation => match result {
                Ok(path) => {
                    tracing::info!("Uploaded image to {}", path);
                    state.draft.image = DraftImage::Uploaded {
                        file,
                        preview,
                        path,
                    };
                    Ok(state.draft.clone())
                }
                Err(e) => {
                    tracing::warn!("Failed to upload '{}': {}", file.name, e);
                    Err(e.into())
                }
            },
            newer => {
                state.draft.image = newer;
                let draft = state.draft.clone();
                drop(state);

                self.discard_stale_upload(result, draft.image.path()).await;
                Ok(draft)
            }
        }
    }

    /// Drops the draft image. An upload still in flight is not cancelled,
    /// its result is discarded when it lands.
    pub async fn remove_image(&self) -> Draft {
        let mut state = self.state.lock().await;
        state.draft.image = DraftImage::Empty;
        state.draft.clone()
    }

    pub async fn edit_draft(&self, text: DraftText) -> Draft {
        let mut state = self.state.lock().await;
        state.draft.apply(text);
        state.draft.clone()
    }

    /// Creates a note from the draft, after applying whatever text `text`
    /// carries, and puts it at the top of the list. Returns `None` without
    /// touching the backend when both title and description are empty.
    pub async fn create_note(&self, text: DraftText) -> Result<Option<Note>, BoardError> {
        let mut state = self.state.lock().await;
        state.draft.apply(text);

        if state.draft.is_blank() {
            tracing::debug!("Ignoring submission without title or description");
            return Ok(None);
        }

        if state.draft.image.is_uploading() {
            tracing::warn!("Image upload still in progress, creating note without image");
        }

        let user = self.auth.current_user().await?;
        let new_note = NewNote {
            name: non_empty(&state.draft.name),
            description: non_empty(&state.draft.description),
            image: state.draft.image.path().map(str::to_string),
            owner: user.identifier,
        };

        let mut note = self.notes.create(new_note).await?;
        note.image_url = self.resolve_image_url(&note).await;

        tracing::info!("Created note {}", note.id);
        state.notes.insert(0, note.clone());
        state.draft = Draft::default();

        Ok(Some(note))
    }

    /// Deletes the record, then its image blob on a best-effort basis.
    pub async fn delete_note(&self, note: &Note) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;

        self.notes.delete(&note.id).await?;

        if let Some(path) = note.image_path()
            && let Err(e) = self.storage.remove(path).await
        {
            tracing::warn!("Failed to remove image {} of note {}: {}", path, note.id, e);
        }

        state.notes.retain(|existing| existing.id != note.id);
        tracing::info!("Deleted note {}", note.id);

        Ok(())
    }

    pub async fn sign_out(&self) {
        match self.auth.sign_out().await {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::error!("Failed to sign out: {}", e),
        }
    }

    async fn resolve_image_url(&self, note: &Note) -> Option<String> {
        let path = note.image_path()?;
        match self.storage.signed_url(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Failed to resolve image of note {}: {}", note.id, e);
                None
            }
        }
    }

    /// Cleans up after an upload that lost its draft slot. `current` is the
    /// path the draft points at now; that blob is never removed.
    async fn discard_stale_upload(
        &self,
        result: Result<String, ClientError>,
        current: Option<&str>,
    ) {
        match result {
            Ok(path) if current == Some(path.as_str()) => {
                tracing::debug!("Superseded upload landed on the current path {}", path);
            }
            Ok(path) => {
                tracing::warn!("Discarding superseded upload {}", path);
                if let Err(e) = self.storage.remove(&path).await {
                    tracing::warn!("Failed to remove superseded upload {}: {}", path, e);
                }
            }
            Err(e) => tracing::debug!("Superseded upload failed: {}", e),
        }
    }
}
