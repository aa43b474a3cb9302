//! Loading crate metadata documents
//!
//! Locates `ro-crate-metadata.json` in a file, directory, zip archive or URL
//! and parses it. All I/O happens here, before validation starts.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use zip::ZipArchive;

use crate::error::CrateError;
use crate::rocrate::RoCrate;
use crate::rules::SchemaRegistry;
use crate::vocab::METADATA_DESCRIPTOR_ID;

/// Where a crate's metadata document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrateSource {
    /// A metadata JSON file
    File(PathBuf),
    /// Local directory containing ro-crate-metadata.json
    Directory(PathBuf),
    /// Zip archive with the metadata at its root or in its single top-level folder
    ZipFile(PathBuf),
    /// Remote URL (may or may not end with ro-crate-metadata.json)
    Url(String),
}

impl CrateSource {
    /// Classify a command-line argument
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            return CrateSource::Url(arg.to_string());
        }
        let path = PathBuf::from(arg);
        if path.is_dir() {
            CrateSource::Directory(path)
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
        {
            CrateSource::ZipFile(path)
        } else {
            CrateSource::File(path)
        }
    }

    /// Human-readable location, for messages
    pub fn location(&self) -> String {
        match self {
            CrateSource::File(p) | CrateSource::Directory(p) | CrateSource::ZipFile(p) => {
                p.display().to_string()
            }
            CrateSource::Url(u) => u.clone(),
        }
    }
}

/// Load and parse the metadata document of a source
pub fn load(source: &CrateSource) -> Result<Value, CrateError> {
    let (origin, content) = match source {
        CrateSource::File(p) => (p.display().to_string(), read_file(p)?),
        CrateSource::Directory(p) => {
            let metadata_path = find_metadata_in_directory(p)?;
            let content = read_file(&metadata_path)?;
            (metadata_path.display().to_string(), content)
        }
        CrateSource::ZipFile(p) => (p.display().to_string(), load_from_zip(p)?),
        CrateSource::Url(u) => fetch_metadata_from_url(u)?,
    };
    debug!(origin = %origin, bytes = content.len(), "metadata document loaded");
    parse_document(&content, &origin)
}

/// Load a source and build the crate against `registry`
pub fn load_crate(source: &CrateSource, registry: &SchemaRegistry) -> Result<RoCrate, CrateError> {
    let document = load(source)?;
    RoCrate::from_jsonld(&document, registry)
}

/// Parse metadata text into a JSON object
pub fn parse_document(content: &str, origin: &str) -> Result<Value, CrateError> {
    let value: Value = serde_json::from_str(content).map_err(|e| CrateError::LoadError {
        path: origin.to_string(),
        reason: format!("Failed to parse metadata: {}", e),
    })?;
    if !value.is_object() {
        return Err(CrateError::LoadError {
            path: origin.to_string(),
            reason: "Metadata document is not a JSON object".to_string(),
        });
    }
    Ok(value)
}

fn read_file(path: &Path) -> Result<String, CrateError> {
    if !path.exists() {
        return Err(CrateError::InvalidPath(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Find ro-crate-metadata.json (with optional prefix) in a directory
fn find_metadata_in_directory(path: &Path) -> Result<PathBuf, CrateError> {
    if !path.is_dir() {
        return Err(CrateError::InvalidPath(path.to_path_buf()));
    }

    let standard = path.join(METADATA_DESCRIPTOR_ID);
    if standard.exists() {
        return Ok(standard);
    }

    // Look for *-ro-crate-metadata.json
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with("-ro-crate-metadata.json") {
                    return Ok(entry.path());
                }
            }
        }
    }

    Err(CrateError::LoadError {
        path: path.display().to_string(),
        reason: "No ro-crate-metadata.json found".to_string(),
    })
}

/// Read the root metadata file out of a zip archive
fn load_from_zip(path: &Path) -> Result<String, CrateError> {
    if !path.exists() {
        return Err(CrateError::InvalidPath(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: format!("Failed to open zip file: {}", e),
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: format!("Failed to read zip archive: {}", e),
    })?;

    let entry_name = find_root_metadata_in_zip(&mut archive).ok_or_else(|| CrateError::LoadError {
        path: path.display().to_string(),
        reason: "No root ro-crate-metadata.json found at archive root".to_string(),
    })?;

    let mut entry = archive.by_name(&entry_name).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: format!("Failed to extract {}: {}", entry_name, e),
    })?;

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| CrateError::LoadError {
            path: path.display().to_string(),
            reason: format!("Failed to read metadata file: {}", e),
        })?;
    Ok(content)
}

/// Name of the root metadata entry in a zip archive
///
/// The metadata sits either at the archive root or directly inside the
/// single top-level directory (an archive made by zipping a folder).
fn find_root_metadata_in_zip<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Option<String> {
    let entries: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .collect();

    if let Some(entry) = entries
        .iter()
        .find(|e| !e.contains('/') && e.ends_with(METADATA_DESCRIPTOR_ID))
    {
        return Some(entry.clone());
    }

    let top_level_dirs: std::collections::HashSet<&str> = entries
        .iter()
        .filter_map(|e| e.split('/').next())
        .filter(|s| !s.is_empty())
        .collect();
    if top_level_dirs.len() != 1 {
        return None;
    }

    let prefix = format!("{}/", top_level_dirs.into_iter().next()?);
    entries
        .iter()
        .find(|e| {
            e.strip_prefix(&prefix)
                .is_some_and(|rest| !rest.contains('/') && rest.ends_with(METADATA_DESCRIPTOR_ID))
        })
        .cloned()
}

/// Fetch metadata from URL, trying /ro-crate-metadata.json if URL doesn't point to metadata
///
/// Returns the URL the document was actually read from and its text.
fn fetch_metadata_from_url(url: &str) -> Result<(String, String), CrateError> {
    if url.ends_with(METADATA_DESCRIPTOR_ID) {
        let content = fetch_url(url)?;
        return Ok((url.to_string(), content));
    }

    let metadata_url = format!("{}/{}", url.trim_end_matches('/'), METADATA_DESCRIPTOR_ID);
    if let Ok(content) = fetch_url(&metadata_url) {
        if content.trim_start().starts_with('{') {
            return Ok((metadata_url, content));
        }
    }

    // Maybe the URL itself is the metadata
    let content = fetch_url(url)?;
    if content.trim_start().starts_with('{') {
        Ok((url.to_string(), content))
    } else {
        Err(CrateError::LoadError {
            path: url.to_string(),
            reason: "URL does not contain valid RO-Crate metadata".to_string(),
        })
    }
}

fn fetch_url(url: &str) -> Result<String, CrateError> {
    debug!(url = %url, "fetching metadata");
    reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| CrateError::LoadError {
            path: url.to_string(),
            reason: format!("HTTP request failed: {}", e),
        })?
        .text()
        .map_err(|e| CrateError::LoadError {
            path: url.to_string(),
            reason: format!("Failed to read response: {}", e),
        })
}
