use serde::{Deserialize, Serialize};

use crate::dto::DraftText;

/// A note as stored by the backend, plus the client-side `image_url`
/// resolved from `image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(skip)]
    pub image_url: Option<String>,
}

impl Note {
    /// Storage path of the attached image, if it is non-empty.
    pub fn image_path(&self) -> Option<&str> {
        self.image.as_deref().filter(|path| !path.is_empty())
    }
}

/// Fields sent to the backend when creating a note. Empty fields are
/// omitted from the payload rather than sent as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub identifier: String,
}

/// A file picked locally for attachment. Only its bytes reach blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Image part of the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DraftImage {
    #[default]
    Empty,
    Uploading {
        file: ImageFile,
        preview: String,
        generation: u64,
    },
    Uploaded {
        file: ImageFile,
        preview: String,
        path: String,
    },
}

impl DraftImage {
    pub fn preview(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Uploading { preview, .. } | Self::Uploaded { preview, .. } => Some(preview),
        }
    }

    pub fn file(&self) -> Option<&ImageFile> {
        match self {
            Self::Empty => None,
            Self::Uploading { file, .. } | Self::Uploaded { file, .. } => Some(file),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Uploaded { path, .. } => Some(path),
            _ => None,
        }
    }

    pub const fn is_uploading(&self) -> bool {
        matches!(self, Self::Uploading { .. })
    }
}

/// Transient form state before a note is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub description: String,
    pub image: DraftImage,
}

impl Draft {
    /// Overwrites the text fields `text` supplies.
    pub fn apply(&mut self, text: DraftText) {
        if let Some(name) = text.name {
            self.name = name;
        }
        if let Some(description) = text.description {
            self.description = description;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }
}
