//! In-progress sighting report composed by the user

use super::geo::Position;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Reference to a photo on the local device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalImage {
    path: PathBuf,
}

impl LocalImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full image contents
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// A required draft field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DraftField {
    Description,
    Image,
    Position,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftField::Description => write!(f, "description"),
            DraftField::Image => write!(f, "image"),
            DraftField::Position => write!(f, "position"),
        }
    }
}

/// Value snapshot of a draft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSighting {
    pub description: String,
    pub image: Option<LocalImage>,
    pub position: Option<Position>,
}

impl DraftSighting {
    /// Fields that must be filled in before the draft can be submitted
    ///
    /// A description of only whitespace counts as missing.
    pub fn missing_fields(&self) -> Vec<DraftField> {
        let mut missing = Vec::new();
        if self.description.trim().is_empty() {
            missing.push(DraftField::Description);
        }
        if self.image.is_none() {
            missing.push(DraftField::Image);
        }
        if self.position.is_none() {
            missing.push(DraftField::Position);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// A draft instance owned by one report flow
///
/// Field edits go through named setters. The draft also carries the
/// in-flight flag that keeps a single instance from being posted twice.
#[derive(Debug, Default)]
pub struct Draft {
    contents: Mutex<DraftSighting>,
    submitting: AtomicBool,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.lock().description = description.into();
    }

    pub fn set_image(&self, image: LocalImage) {
        self.lock().image = Some(image);
    }

    pub fn clear_image(&self) {
        self.lock().image = None;
    }

    pub fn set_position(&self, position: Position) {
        self.lock().position = Some(position);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> DraftSighting {
        self.lock().clone()
    }

    /// Reset every field
    pub fn clear(&self) {
        *self.lock() = DraftSighting::default();
    }

    /// Reset the fields that still hold what was submitted
    ///
    /// Anything edited while the submission was in flight is kept.
    pub fn clear_submitted(&self, submitted: &DraftSighting) {
        let mut contents = self.lock();
        if contents.description == submitted.description {
            contents.description.clear();
        }
        if contents.image == submitted.image {
            contents.image = None;
        }
        if contents.position == submitted.position {
            contents.position = None;
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Mark the draft as in flight; `None` if it already is
    pub(crate) fn begin_submit(&self) -> Option<SubmitGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard { draft: self })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DraftSighting> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the in-flight flag when dropped
pub(crate) struct SubmitGuard<'a> {
    draft: &'a Draft,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.draft.submitting.store(false, Ordering::Release);
    }
}
