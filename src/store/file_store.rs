use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::store::token_pair::TokenPair;
use crate::store::token_store::TokenStore;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// On-disk layout: the two fixed keys, nothing else
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Session persisted as a small JSON document, written atomically (tmp -> rename, 0600)
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: &str) -> Self {
        Self { path: expand_home(path) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<TokenPair>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let persisted: PersistedSession = serde_json::from_str(&raw)?;
        Ok(persisted
            .access_token
            .filter(|token| !token.is_empty())
            .map(|access_token| TokenPair::new(access_token, persisted.refresh_token)))
    }

    fn write(&self, pair: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let persisted = PersistedSession {
            access_token: Some(pair.access_token.clone()),
            refresh_token: pair.refresh_token.clone(),
        };
        let tmp = self.tmp_path();
        let written = fs::write(&tmp, serde_json::to_vec_pretty(&persisted)?)
            .and_then(|()| restrict_permissions(&tmp))
            .and_then(|()| fs::rename(&tmp, &self.path));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        Ok(written?)
    }

    /// Unique per process and per write, next to the target so the rename stays atomic
    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_owned());
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<TokenPair> {
        self.read()
            .inspect_err(|err| warn!("session file '{}' unreadable: {}", self.path.display(), err))
            .unwrap_or(None)
    }

    fn set(&self, pair: &TokenPair) {
        match self.write(pair) {
            Ok(()) => debug!("session written to '{}'", self.path.display()),
            Err(err) => error!("session write to '{}' failed: {}", self.path.display(), err),
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("session file '{}' removed", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!("session file '{}' removal failed: {}", self.path.display(), e),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
