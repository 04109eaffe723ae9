// Runtime configuration and the small files the CLI keeps between runs.
// Everything comes from the environment with sensible fallbacks, the same
// way the client picks its base URL.

use crate::api::{SessionStore, DEFAULT_BASE_URL};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("aurcli/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    /// Directory holding the default cookie jar and the ignore list.
    pub data_dir: PathBuf,
    pub user_agent: String,
    /// Upper bound for a single request, if any.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Read `AUR_URL`, `AURCLI_HOME` and `AURCLI_TIMEOUT` (seconds), falling
    /// back to the public origin and `~/.aurcli`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("AUR_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let data_dir = std::env::var_os("AURCLI_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".aurcli")
            });
        let timeout = std::env::var("AURCLI_TIMEOUT")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Config {
            base_url,
            data_dir,
            user_agent: USER_AGENT.to_string(),
            timeout,
        }
    }

    /// Default cookie jar.
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("cookie")
    }

    /// Packages `upgrade` skips by default.
    pub fn ignore_file(&self) -> PathBuf {
        self.data_dir.join("upgrade_ignore")
    }

    pub fn ensure_data_dir(&self) -> io::Result<()> {
        if !self.data_dir.is_dir() {
            debug!(dir = %self.data_dir.display(), "creating data directory");
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }
}

/// Cookie jar kept in a plain file. Saving overwrites whatever is there.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn save(&self, cookie: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, cookie)
    }
}

/// Whitespace-separated package names, or `None` when there is no list.
pub fn load_ignore_list(path: &Path) -> Option<Vec<String>> {
    let text = std::fs::read_to_string(path).ok()?;
    Some(text.split_whitespace().map(str::to_string).collect())
}

/// Write the list sorted and deduplicated, one name per line.
pub fn save_ignore_list(path: &Path, names: &[String]) -> io::Result<()> {
    let mut names = names.to_vec();
    names.sort();
    names.dedup();
    std::fs::write(path, names.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("cookie"));
        assert_eq!(store.load(), None);
        store.save("AURSID=abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("AURSID=abc"));
    }

    #[test]
    fn absent_ignore_list_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_ignore_list(&dir.path().join("upgrade_ignore")), None);
    }

    #[test]
    fn ignore_list_is_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade_ignore");
        let names = vec!["zsh-git".to_string(), "abc".to_string(), "zsh-git".to_string()];
        save_ignore_list(&path, &names).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc\nzsh-git");
        assert_eq!(
            load_ignore_list(&path),
            Some(vec!["abc".to_string(), "zsh-git".to_string()])
        );
    }

    #[test]
    fn data_files_live_in_data_dir() {
        let config = Config {
            base_url: DEFAULT_BASE_URL.into(),
            data_dir: PathBuf::from("/tmp/aurcli-test"),
            user_agent: USER_AGENT.into(),
            timeout: None,
        };
        assert_eq!(config.session_file(), PathBuf::from("/tmp/aurcli-test/cookie"));
        assert_eq!(
            config.ignore_file(),
            PathBuf::from("/tmp/aurcli-test/upgrade_ignore")
        );
    }
}
