use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Draft, DraftImage, Note};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    /// Note ID
    pub id: String,
    /// Note title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Note description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Storage path of the attached image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Signed URL for displaying the image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Identifier of the user who created the note
    pub owner: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            name: note.name,
            description: note.description,
            image: note.image,
            image_url: note.image_url,
            owner: note.owner,
        }
    }
}

/// Text fields of the draft form. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftText {
    /// Note title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Note description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Empty,
    Uploading,
    Uploaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftResponse {
    /// Draft title
    pub name: String,
    /// Draft description
    pub description: String,
    /// Where the image sub-flow currently is
    pub image_status: ImageStatus,
    /// Name of the selected file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
    /// Local preview reference of the selected file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Storage path returned by the finished upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl From<&Draft> for DraftResponse {
    fn from(draft: &Draft) -> Self {
        let image_status = match draft.image {
            DraftImage::Empty => ImageStatus::Empty,
            DraftImage::Uploading { .. } => ImageStatus::Uploading,
            DraftImage::Uploaded { .. } => ImageStatus::Uploaded,
        };

        Self {
            name: draft.name.clone(),
            description: draft.description.clone(),
            image_status,
            image_file: draft.image.file().map(|file| file.name.clone()),
            preview: draft.image.preview().map(str::to_string),
            image_path: draft.image.path().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SelectImageQuery {
    /// Name of the selected file
    pub file_name: Option<String>,
}
