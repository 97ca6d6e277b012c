//! Media attachment storage.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use loopline_core::config::MediaConfig;
use loopline_core::error::{AppError, ErrorKind};
use loopline_core::result::AppResult;

/// Stores uploaded attachment bytes and hands back a public URL path.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist the bytes under a collision-free name derived from
    /// `filename` and return the URL the stored media is served from.
    async fn save(&self, filename: &str, bytes: &[u8]) -> AppResult<String>;
}

/// Local-disk media store. Files land under a flat directory; the
/// server serves them under the configured public prefix.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalMediaStore {
    /// Create the store rooted at the configured data directory.
    pub async fn new(config: &MediaConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.data_root);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to create media root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Keep only the extension of the client-supplied name; the rest
    /// is untrusted.
    fn stored_name(filename: &str) -> String {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()) && ext.len() <= 8);
        match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> AppResult<String> {
        let name = Self::stored_name(filename);
        let path = self.root.join(&name);

        fs::write(&path, bytes).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to write media file: {}", path.display()),
                e,
            )
        })?;

        debug!(file = %path.display(), size = bytes.len(), "Stored media attachment");
        Ok(format!("{}/{}", self.public_prefix, name))
    }
}
