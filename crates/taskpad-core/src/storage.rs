use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const TOKEN_FILE_NAME: &str = "session.token";

/// Client-local persistence for the single bearer token.
pub trait TokenStore {
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn save(&self, token: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    pub path: PathBuf,
}

impl FileTokenStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join(TOKEN_FILE_NAME);
        info!(path = %path.display(), "opened token store");
        Ok(Self { path })
    }
}

impl TokenStore for FileTokenStore {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            debug!("no stored token");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    #[tracing::instrument(skip(self, token))]
    fn save(&self, token: &str) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        writeln!(temp, "{token}")?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        debug!(path = %self.path.display(), "stored token");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed removing {}", self.path.display()))?;
            debug!(path = %self.path.display(), "removed stored token");
        }
        Ok(())
    }
}

/// Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.to_string()))),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.current())
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
