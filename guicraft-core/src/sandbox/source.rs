//! Where plugin source text comes from.
//!
//! A source returns the raw transport payload: a JSON array of
//! `[source_text, declared_name]` pairs. The payload is checked by
//! [`parse_payload`] before anything runs.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Message of the top-level failure for a malformed payload.
pub const WRONG_RESPONSE_MESSAGE: &str = "Wrong response returned by Main Process";

/// One plugin to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginScript {
    pub source: String,
    pub name: String,
}

impl PluginScript {
    pub fn new<S: Into<String>, N: Into<String>>(source: S, name: N) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }
}

/// Supplier of plugin sources.
#[async_trait]
pub trait PluginSource: Send + Sync {
    /// Fetch the raw payload.
    ///
    /// # Errors
    ///
    /// Any error is reported as a top-level load failure.
    async fn fetch(&self) -> Result<Value>;
}

/// Validate a transport payload.
///
/// # Errors
///
/// Returns [`Error::PluginTransport`] unless `payload` is an array of
/// two-element string arrays.
///
/// # Example
///
/// ```rust
/// use guicraft_core::sandbox::parse_payload;
/// use serde_json::json;
///
/// let scripts = parse_payload(json!([["print(1);", "one.rhai"]])).unwrap();
/// assert_eq!(scripts[0].name, "one.rhai");
/// assert!(parse_payload(json!({"not": "a list"})).is_err());
/// ```
pub fn parse_payload(payload: Value) -> Result<Vec<PluginScript>> {
    let Value::Array(entries) = payload else {
        return Err(Error::plugin_transport(WRONG_RESPONSE_MESSAGE));
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(source), Value::String(name)] => {
                    Ok(PluginScript::new(source.clone(), name.clone()))
                }
                _ => Err(Error::plugin_transport(WRONG_RESPONSE_MESSAGE)),
            },
            _ => Err(Error::plugin_transport(WRONG_RESPONSE_MESSAGE)),
        })
        .collect()
}

/// Every file directly inside a directory, one plugin per file.
///
/// File names are passed through unfiltered, so a badly named file shows up as
/// a validation failure instead of silently being skipped.
#[derive(Debug, Clone)]
pub struct DirectoryPluginSource {
    directory: PathBuf,
}

impl DirectoryPluginSource {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl PluginSource for DirectoryPluginSource {
    async fn fetch(&self) -> Result<Value> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || read_plugin_directory(&directory))
            .await
            .map_err(|e| Error::plugin_transport(format!("Reading plugins failed: {}", e)))?
    }
}

fn read_plugin_directory(directory: &Path) -> Result<Value> {
    if !directory.exists() {
        debug!("Plugin directory {} does not exist", directory.display());
        return Ok(Value::Array(Vec::new()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::plugin_transport(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = std::fs::read(entry.path())?;
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(e) => {
                warn!("Plugin {} is not valid UTF-8", name);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        entries.push(Value::Array(vec![Value::String(source), Value::String(name)]));
    }
    debug!("Found {} plugin files in {}", entries.len(), directory.display());
    Ok(Value::Array(entries))
}

/// A fixed payload or a fixed transport failure.
#[derive(Debug, Clone)]
pub struct StaticPluginSource {
    response: std::result::Result<Value, String>,
}

impl StaticPluginSource {
    /// Serve `payload` as-is.
    pub fn new(payload: Value) -> Self {
        Self {
            response: Ok(payload),
        }
    }

    /// Serve well-formed `[source, name]` pairs.
    pub fn from_scripts<I>(scripts: I) -> Self
    where
        I: IntoIterator<Item = PluginScript>,
    {
        Self::new(Value::Array(
            scripts
                .into_iter()
                .map(|script| {
                    Value::Array(vec![Value::String(script.source), Value::String(script.name)])
                })
                .collect(),
        ))
    }

    /// Fail every fetch with `message`.
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl PluginSource for StaticPluginSource {
    async fn fetch(&self) -> Result<Value> {
        self.response.clone().map_err(Error::plugin_transport)
    }
}
