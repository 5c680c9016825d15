//! Sidecar persistence for annotations.
//!
//! Annotations for `paper.pdf` live next to it in `paper.pdf.pdfmark.json`.
//! The source PDF itself is never written.

use directories::ProjectDirs;
use doc_model::{Annotation, AnnotationStore, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const SIDECAR_SCHEMA_VERSION: u32 = 1;
const SIDECAR_SUFFIX: &str = ".pdfmark.json";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local config directory")]
    NoConfigDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported sidecar version {0} (expected {SIDECAR_SCHEMA_VERSION})")]
    UnsupportedVersion(u32),
    #[error("invalid page key {0:?}")]
    InvalidPageKey(String),
    #[error("stored annotations are inconsistent: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Serialize, Deserialize)]
struct SidecarEnvelope {
    version: u32,
    #[serde(default)]
    pages: BTreeMap<String, Vec<Annotation>>,
}

/// `<pdf>.pdfmark.json`, next to the document.
pub fn sidecar_path(pdf: &Path) -> PathBuf {
    let mut name: OsString = pdf.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Annotations stored for `pdf`, keyed by page number.
///
/// A missing sidecar is an empty document, not an error.
pub fn load(pdf: &Path) -> Result<BTreeMap<u32, Vec<Annotation>>, StorageError> {
    let path = sidecar_path(pdf);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no sidecar, starting empty");
        return Ok(BTreeMap::new());
    }

    let bytes = fs::read(&path)?;
    let envelope: SidecarEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version != SIDECAR_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion(envelope.version));
    }

    let mut pages = BTreeMap::new();
    for (key, records) in envelope.pages {
        let page = key.parse::<u32>().map_err(|_| StorageError::InvalidPageKey(key.clone()))?;
        pages.insert(page, records);
    }

    tracing::info!(path = %path.display(), pages = pages.len(), "sidecar loaded");
    Ok(pages)
}

/// Write `pages` to the sidecar for `pdf`.
///
/// The file is written beside the target and renamed over it, so a crash
/// mid-write leaves the previous sidecar intact.
pub fn save(pdf: &Path, pages: &BTreeMap<u32, Vec<Annotation>>) -> Result<(), StorageError> {
    let path = sidecar_path(pdf);
    let envelope = SidecarEnvelope {
        version: SIDECAR_SCHEMA_VERSION,
        pages: pages
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(page, records)| (page.to_string(), records.clone()))
            .collect(),
    };

    let bytes = serde_json::to_vec_pretty(&envelope)?;
    let mut staging = path.clone().into_os_string();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, bytes)?;
    fs::rename(&staging, &path)?;

    tracing::info!(path = %path.display(), pages = envelope.pages.len(), "sidecar saved");
    Ok(())
}

/// Replace the contents of `store` with what is stored for `pdf`.
pub fn load_into(pdf: &Path, store: &mut AnnotationStore) -> Result<(), StorageError> {
    let records = load(pdf)?.into_values().flatten().collect();
    store.replace_all(records)?;
    Ok(())
}

pub fn save_store(pdf: &Path, store: &AnnotationStore) -> Result<(), StorageError> {
    save(pdf, &store.to_page_map())
}

/// Per-user application directories.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "pdfmark", "pdfmark").ok_or(StorageError::NoConfigDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default viewer config file location.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// The default config file, if the user has created one.
    pub fn existing_config_path(&self) -> Option<PathBuf> {
        Some(self.config_path()).filter(|path| path.is_file())
    }
}
