// Per-page report artifacts

use crate::error::StoreError;
use crate::report::page_path;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use url::Url;

/// Slug reserved for the site root.
pub const HOME_SLUG: &str = "home";

/// Filesystem-safe slug for a page path: `/` is `home`, `/about/team` is `about-team`.
pub fn report_slug(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return HOME_SLUG.to_string();
    }

    let replaced = path.replace('/', "-");
    let slug: String = replaced
        .strip_prefix('-')
        .unwrap_or(replaced.as_str())
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '%' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if slug.is_empty() {
        HOME_SLUG.to_string()
    } else {
        slug
    }
}

/// Artifact name for a page, e.g. `a11y-contact.md`.
pub fn report_key(url: &Url) -> String {
    format!("a11y-{}.md", report_slug(&page_path(url)))
}

/// Named key/value sink for rendered reports. Writes are last-write-wins.
pub trait ReportSink: Send + Sync {
    fn write(&self, key: &str, content: &str) -> Result<(), StoreError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn write(&self, key: &str, content: &str) -> Result<(), StoreError> {
        (**self).write(key, content)
    }
}

/// Writes each report as a file inside one directory.
#[derive(Debug, Clone)]
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ReportSink for FsReportStore {
    fn write(&self, key: &str, content: &str) -> Result<(), StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key);
        fs::write(&path, content).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote report {}", path.display());
        Ok(())
    }
}

/// Keeps reports in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<BTreeMap<String, String>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemoryReportStore {
    fn write(&self, key: &str, content: &str) -> Result<(), StoreError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), content.to_string());
        Ok(())
    }
}
