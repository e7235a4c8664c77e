//! Last-recited marker persistence.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::LastRecited;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode marker: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait MarkerStore: Send + Sync {
    /// `None` when nothing was recorded yet or the stored marker is unreadable.
    fn load(&self) -> Option<LastRecited>;
    fn save(&self, marker: &LastRecited) -> Result<(), StoreError>;
}

/// One small JSON file, rewritten on every play action.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarkerStore for JsonFileStore {
    fn load(&self) -> Option<LastRecited> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&data) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable last-recited marker");
                None
            }
        }
    }

    fn save(&self, marker: &LastRecited) -> Result<(), StoreError> {
        let io = |source: std::io::Error| StoreError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let data = serde_json::to_vec(marker)?;
        fs::write(&self.path, data).map_err(io)?;
        debug!(verse = %marker.verse_key, "last recited saved");
        Ok(())
    }
}
