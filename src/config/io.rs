use std::env::{current_exe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use directories_next::{ProjectDirs};
use log::{info, warn};
use tokio::fs::{File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::OpenOptions;
use std::str;

use crate::config::types::Config;
use crate::error::ConfigError;

// creates a path to <exe name>.json in the same directory as the executable
// this is useful when the device tooling lives on a usb stick
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            // /media/stick/inhale => /media/stick/inhale.json
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// creates a path to inhale.json in an os dependent standard directory, such as ~/.config on linux
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "inhale", "inhale").map(|dirs| {
        dirs.config_dir().join("inhale.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = get_portable_config_path() {
        match std::fs::metadata(&path) {
            Ok(attr) => {
                if attr.is_file() {
                    return Ok(path);
                }
            }
            Err(err) => {
                info!("Could not read metadata of: {}; Using local path instead. ({:?})", path.to_string_lossy(), err);
            },
        }
    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        match self.rw_lock.try_write() {
            Ok(guard) => Ok(guard),
            Err(source) => Err(ConfigError::CanNotLock { source }),
        }
    }
}

struct ConfigIOInner {
    file: std::fs::File,
}

/// Persists the calibrated thresholds between runs.
#[derive(Clone)]
pub struct ConfigIO {
    inner: Arc<Mutex<ConfigIOInner>>,
}

impl ConfigIO {
    /// Opens (creating if needed) `path`, or the default config location when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_path()?,
        };
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            if !directory.as_os_str().is_empty() {
                std::fs::create_dir_all(directory)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(&path)?;

        let inner = ConfigIOInner {
            file,
        };
        Ok(ConfigIO { inner: Arc::new(Mutex::new(inner)) })
    }

    // obtain an exclusive file lock so that this config file is used by only one instance
    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        let file = self.get_std_file()?;

        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(file),
        })
    }

    fn get_std_file(&self) -> Result<std::fs::File, ConfigError> {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            // the inner file handle is never left half-modified, so a poisoned lock is still usable
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(inner.file.try_clone()?)
    }

    // The File returned from here should never be closed!
    fn get_file(&self) -> Result<File, ConfigError> {
        let file = self.get_std_file()?; // std File
        Ok(File::from_std(file)) // tokio File
    }

    /// Reads the stored config as is; the caller validates it once its own overrides are applied.
    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        info!("Reading config file");

        let mut content = vec![];
        file.rewind().await?;
        file.read_to_end(&mut content).await?;

        if content.is_empty() {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;

        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    pub async fn save(&self, config: Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        info!("Saving config");

        let content = serde_json::to_string_pretty(&config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::Thresholds;
    use tempfile::tempdir;

    #[tokio::test]
    async fn empty_file_reads_as_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("inhale.json");
        let config_io = ConfigIO::open(Some(&path)).unwrap();
        assert_eq!(config_io.read().await.unwrap(), Config::default());
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn saved_thresholds_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inhale.json");
        let config = Config { thresholds: Thresholds::new(-7.0, 8.5) };

        let config_io = ConfigIO::open(Some(&path)).unwrap();
        config_io.save(Config { thresholds: Thresholds::new(-123.0, 456.0) }).await.unwrap();
        // a shorter document must not leave trailing bytes behind
        config_io.save(config).await.unwrap();
        drop(config_io);

        let reopened = ConfigIO::open(Some(&path)).unwrap();
        assert_eq!(reopened.read().await.unwrap(), config);
    }

    #[tokio::test]
    async fn invalid_thresholds_are_read_but_fail_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inhale.json");
        std::fs::write(&path, r#"{"thresholds":{"inhale":3.0,"exhale":-3.0}}"#).unwrap();

        let config_io = ConfigIO::open(Some(&path)).unwrap();
        let config = config_io.read().await.unwrap();
        assert_eq!(config.thresholds, Thresholds::new(3.0, -3.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThresholds { .. })));
    }

    #[tokio::test]
    async fn garbage_is_a_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inhale.json");
        std::fs::write(&path, "not json").unwrap();

        let config_io = ConfigIO::open(Some(&path)).unwrap();
        assert!(matches!(config_io.read().await, Err(ConfigError::JsonError { .. })));
    }

    #[test]
    fn locker_acquires_write_lock() {
        let dir = tempdir().unwrap();
        let config_io = ConfigIO::open(Some(&dir.path().join("inhale.json"))).unwrap();
        let mut locker = config_io.locker().unwrap();
        let guard = locker.lock();
        assert!(guard.is_ok());
    }
}
