//! Source document cache
//!
//! Downloads each published workbook once into a cache directory. Without a
//! configured directory the cache lives in a temporary directory that is
//! removed when the cache is dropped.

use crate::config::{DataSource, DataSources};
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

/// Download and cache errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
}

pub type SourceResult<T> = Result<T, SourceError>;

pub struct SourceCache {
    dir: PathBuf,
    // Held so the directory lives as long as the cache
    _temp: Option<TempDir>,
    http_client: Client,
}

impl SourceCache {
    /// Cache rooted at `dir`, created if missing
    pub fn new(dir: impl Into<PathBuf>) -> SourceResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _temp: None,
            http_client: Client::new(),
        })
    }

    pub fn temporary() -> SourceResult<Self> {
        let temp = tempfile::Builder::new().prefix("cwfgraph-").tempdir()?;
        debug!("Using temporary cache {:?}", temp.path());
        Ok(Self {
            dir: temp.path().to_path_buf(),
            _temp: Some(temp),
            http_client: Client::new(),
        })
    }

    /// Configured directory, or a temporary one
    pub fn from_config(dir: Option<&Path>) -> SourceResult<Self> {
        match dir {
            Some(dir) => Self::new(dir),
            None => Self::temporary(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source: &DataSource) -> PathBuf {
        self.dir.join(&source.local_filename)
    }

    pub fn is_cached(&self, source: &DataSource) -> bool {
        self.path_for(source).is_file()
    }

    /// Local path of `source`, downloading it first unless it is cached.
    /// `refresh` downloads again regardless.
    pub fn fetch(&self, source: &DataSource, refresh: bool) -> SourceResult<PathBuf> {
        let path = self.path_for(source);
        if !refresh && path.is_file() {
            debug!("{} already cached", source.local_filename);
            return Ok(path);
        }

        info!("Downloading {} from {}", source.local_filename, source.source_url);
        let mut response = self.http_client.get(&source.source_url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: source.source_url.clone(),
                status: status.as_u16(),
            });
        }

        // Write beside the target so a failed download never leaves a
        // truncated file under the final name
        let partial = path.with_extension("part");
        let mut file = fs::File::create(&partial)?;
        let bytes = response.copy_to(&mut file)?;
        file.sync_all()?;
        fs::rename(&partial, &path)?;
        debug!("Wrote {} bytes to {:?}", bytes, path);
        Ok(path)
    }

    pub fn fetch_all(&self, sources: &DataSources, refresh: bool) -> SourceResult<Vec<PathBuf>> {
        sources.iter().map(|source| self.fetch(source, refresh)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path()).unwrap();
        // Unreachable URL: fetching it would fail
        let source = DataSource::new("http://127.0.0.1:9/never", "nice_cwf.xlsx");
        fs::write(cache.path_for(&source), b"cached").unwrap();

        assert!(cache.is_cached(&source));
        let path = cache.fetch(&source, false).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }

    #[test]
    fn test_temporary_cache_removed_on_drop() {
        let cache = SourceCache::temporary().unwrap();
        let dir = cache.dir().to_path_buf();
        assert!(dir.is_dir());
        drop(cache);
        assert!(!dir.exists());
    }

    #[test]
    fn test_new_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("cache").join("sources");
        let cache = SourceCache::from_config(Some(&nested)).unwrap();
        assert!(nested.is_dir());
        assert_eq!(
            cache.path_for(&DataSource::new("http://x", "a.xlsx")),
            nested.join("a.xlsx")
        );
    }
}
