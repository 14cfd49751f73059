//! Persistent settings: a sectioned key/value file.
//!
//! The file is pretty-printed JSON, one object per section:
//!
//! ```json
//! {
//!   "provider": { "apiKey": "…", "orgId": "…" },
//!   "transport": { "port": "587", "server": "smtp.example.com", … }
//! }
//! ```
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the original, so an interrupted flush never leaves a torn file.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "courier.json";

/// Section holding SMTP credentials.
pub const TRANSPORT_SECTION: &str = "transport";

/// Section holding completion-provider credentials.
pub const PROVIDER_SECTION: &str = "provider";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

type Sections = BTreeMap<String, BTreeMap<String, String>>;

/// Errors from reading or writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading, writing or renaming failed.
    #[error("Settings file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The existing file is not a valid settings document.
    #[error("Settings file {path} is corrupt: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Sectioned key/value store backed by one file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    sections: Sections,
    dirty: bool,
}

impl SettingsStore {
    /// Opens the store; a missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        let sections = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Sections::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                SettingsError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet");
                Sections::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        Ok(Self {
            path,
            sections,
            dirty: false,
        })
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored value, or `default` if the section or key is
    /// absent.
    #[must_use]
    pub fn get(&self, section: &str, key: &str, default: &str) -> String {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map_or_else(|| default.to_string(), Clone::clone)
    }

    /// Stores a value in memory; call [`SettingsStore::flush`] to persist.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self.dirty = true;
    }

    /// True if there are writes not yet flushed.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the whole store to disk atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or synced,
    /// or the rename fails. The previous file is untouched in that case.
    pub fn flush(&mut self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut contents = serde_json::to_string_pretty(&self.sections).map_err(|source| {
            SettingsError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        contents.push('\n');

        let tmp = temp_path(&self.path);
        {
            let mut file = open_private(&tmp).map_err(io_error(&tmp))?;
            file.write_all(contents.as_bytes()).map_err(io_error(&tmp))?;
            file.sync_all().map_err(io_error(&tmp))?;
        }
        fs::rename(&tmp, &self.path).map_err(io_error(&self.path))?;
        sync_parent(&self.path)?;

        self.dirty = false;
        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SettingsError + use<> {
    let path = path.to_path_buf();
    move |source| SettingsError::Io { path, source }
}

/// Syncs the directory holding `path` so the rename itself is durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), SettingsError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(io_error(dir))?;
    debug!(path = %dir.display(), "settings directory synced");
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn sync_parent(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Creates the file readable by the owner only, since it holds passwords.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// SMTP relay credentials (`transport` section).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransportCredentials {
    /// Relay hostname.
    pub server: String,
    /// Relay port; `0` until configured.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl TransportCredentials {
    /// Reads the `transport` section; absent keys are empty, an unparsable
    /// port reads as `0`.
    #[must_use]
    pub fn load(store: &SettingsStore) -> Self {
        Self {
            server: store.get(TRANSPORT_SECTION, "server", ""),
            port: store
                .get(TRANSPORT_SECTION, "port", "")
                .trim()
                .parse()
                .unwrap_or(0),
            username: store.get(TRANSPORT_SECTION, "username", ""),
            password: store.get(TRANSPORT_SECTION, "password", ""),
        }
    }

    /// Writes the `transport` section (not flushed).
    pub fn store(&self, store: &mut SettingsStore) {
        store.set(TRANSPORT_SECTION, "server", self.server.as_str());
        store.set(TRANSPORT_SECTION, "port", self.port.to_string());
        store.set(TRANSPORT_SECTION, "username", self.username.as_str());
        store.set(TRANSPORT_SECTION, "password", self.password.as_str());
    }
}

impl fmt::Debug for TransportCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCredentials")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Completion provider credentials (`provider` section).
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Organization id; may be empty.
    pub org_id: String,
    /// API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl Default for ProviderCredentials {
    fn default() -> Self {
        Self {
            org_id: String::new(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ProviderCredentials {
    /// Reads the `provider` section.
    #[must_use]
    pub fn load(store: &SettingsStore) -> Self {
        Self {
            org_id: store.get(PROVIDER_SECTION, "orgId", ""),
            api_key: store.get(PROVIDER_SECTION, "apiKey", ""),
            model: store.get(PROVIDER_SECTION, "model", DEFAULT_MODEL),
        }
    }

    /// Writes the `provider` section (not flushed).
    pub fn store(&self, store: &mut SettingsStore) {
        store.set(PROVIDER_SECTION, "orgId", self.org_id.as_str());
        store.set(PROVIDER_SECTION, "apiKey", self.api_key.as_str());
        store.set(PROVIDER_SECTION, "model", self.model.as_str());
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("org_id", &self.org_id)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.json");
        (dir, path)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let (_dir, path) = scratch();
        let store = SettingsStore::open(&path).unwrap();
        assert_eq!(store.get("transport", "server", "fallback"), "fallback");
        assert_eq!(store.get("nope", "nope", ""), "");
        assert!(!store.is_dirty());
    }

    #[test]
    fn set_flush_reopen_round_trip() {
        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();
        store.set("transport", "server", "smtp.example.com");
        store.set("provider", "orgId", "org-1");
        assert!(store.is_dirty());
        store.flush().unwrap();
        assert!(!store.is_dirty());

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get("transport", "server", ""), "smtp.example.com");
        assert_eq!(reopened.get("provider", "orgId", ""), "org-1");
        assert_eq!(reopened.get("provider", "apiKey", "none"), "none");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn flush_overwrites_previous_contents() {
        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();
        store.set("transport", "port", "25");
        store.flush().unwrap();
        store.set("transport", "port", "587");
        store.flush().unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get("transport", "port", ""), "587");
    }

    #[test]
    fn stale_temp_file_does_not_affect_store() {
        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();
        store.set("transport", "server", "kept.example.com");
        store.flush().unwrap();

        // A crash mid-flush leaves only a partial temp file behind.
        fs::write(temp_path(&path), "{\"transport\": {\"ser").unwrap();
        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get("transport", "server", ""), "kept.example.com");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let (_dir, path) = scratch();
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            SettingsStore::open(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn credentials_round_trip_and_redact() {
        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();

        let transport = TransportCredentials {
            server: "smtp.example.com".into(),
            port: 587,
            username: "alice".into(),
            password: "hunter2".into(),
        };
        transport.store(&mut store);
        let provider = ProviderCredentials {
            org_id: "org-1".into(),
            api_key: "sk-secret".into(),
            ..ProviderCredentials::default()
        };
        provider.store(&mut store);
        store.flush().unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(TransportCredentials::load(&reopened), transport);
        assert_eq!(ProviderCredentials::load(&reopened), provider);

        assert!(!format!("{transport:?}").contains("hunter2"));
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }

    #[test]
    fn unparsable_port_loads_as_zero() {
        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();
        store.set(TRANSPORT_SECTION, "port", "smtp");
        assert_eq!(TransportCredentials::load(&store).port, 0);
        assert_eq!(ProviderCredentials::load(&store).model, DEFAULT_MODEL);
    }

    #[cfg(unix)]
    #[test]
    fn parent_directory_sync_succeeds() {
        let (_dir, path) = scratch();
        sync_parent(&path).unwrap();
        sync_parent(Path::new("courier.json")).unwrap();
        assert!(sync_parent(&path.join("missing").join("courier.json")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = scratch();
        let mut store = SettingsStore::open(&path).unwrap();
        store.set("transport", "password", "x");
        store.flush().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
