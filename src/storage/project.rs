use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{MinutaError, Result};

use super::{FsBlobStore, SqliteStore};

pub const MINUTA_DIR: &str = ".minuta";
const DB_FILE: &str = "minuta.db";
const CONFIG_FILE: &str = "config.yaml";

/// Find the project root by looking for .minuta/ or .git/
pub fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(MINUTA_DIR).exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

/// An initialized `.minuta/` directory and its configuration.
pub struct Project {
    dir: PathBuf,
    config: Config,
}

impl Project {
    /// Initialize a new minuta project
    pub fn init(root: &Path) -> Result<Self> {
        let dir = root.join(MINUTA_DIR);

        if dir.exists() {
            return Err(MinutaError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;

        let config = Config::default();
        config.save(&dir.join(CONFIG_FILE))?;
        fs::create_dir_all(dir.join(&config.storage.blob_dir))?;

        let project = Self { dir, config };
        // Creates the database and its schema
        project.store()?;

        Ok(project)
    }

    /// Open an existing minuta project
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(MINUTA_DIR);

        if !dir.join(DB_FILE).exists() {
            return Err(MinutaError::NotInitialized);
        }

        let config = Config::load(&dir.join(CONFIG_FILE))?;
        Ok(Self { dir, config })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.dir.join(DB_FILE))
    }

    pub fn blobs(&self) -> Result<FsBlobStore> {
        FsBlobStore::open(&self.dir.join(&self.config.storage.blob_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        assert!(project.dir().join(DB_FILE).exists());
        assert!(project.dir().join(CONFIG_FILE).exists());
        assert!(project.dir().join("blobs").is_dir());
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        Project::init(tmp.path()).unwrap();
        assert!(matches!(
            Project::init(tmp.path()),
            Err(MinutaError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_open_without_init_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Project::open(tmp.path()),
            Err(MinutaError::NotInitialized)
        ));
    }
}
