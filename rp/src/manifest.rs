//! YAML request manifest consumed by `rp run`
//!
//! ```yaml
//! requests:
//!   - name: users
//!     url: https://api.example.com/users
//!     data: { page: 2 }
//!   - name: create
//!     method: post
//!     url: https://api.example.com/users
//!     data: { name: ada }
//!     headers: { X-Trace: abc }
//!     response-type: json
//!     timeout-ms: 5000
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Method, RequestSpec, ResponseType};

/// Errors raised while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("request '{name}': {message}")]
    InvalidEntry { name: String, message: String },

    #[error("manifest contains no requests")]
    Empty,
}

/// A list of requests to run through the scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub requests: Vec<RequestEntry>,
}

/// One manifest entry
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEntry {
    /// Label used in output; defaults to the URL
    #[serde(default)]
    pub name: Option<String>,

    /// HTTP method, case-insensitive; defaults to GET
    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(rename = "response-type", default)]
    pub response_type: Option<ResponseType>,

    #[serde(rename = "timeout-ms", default)]
    pub timeout_ms: Option<u64>,
}

impl Manifest {
    /// Read and validate a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Manifest::load: called");
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = serde_yaml::from_str(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate()?;
        debug!(count = manifest.requests.len(), "Manifest::load: loaded");
        Ok(manifest)
    }

    /// Reject empty manifests and unknown methods up front
    fn validate(&self) -> Result<(), ManifestError> {
        if self.requests.is_empty() {
            return Err(ManifestError::Empty);
        }
        for entry in &self.requests {
            entry.method()?;
        }
        Ok(())
    }
}

impl RequestEntry {
    /// Display label
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn method(&self) -> Result<Method, ManifestError> {
        match &self.method {
            None => Ok(Method::default()),
            Some(m) => m.parse().map_err(|message| ManifestError::InvalidEntry {
                name: self.label().to_string(),
                message,
            }),
        }
    }

    /// Convert to a request spec with no callbacks attached
    pub fn to_spec(&self) -> Result<RequestSpec, ManifestError> {
        let mut spec = RequestSpec::new(self.method()?, self.url.clone());
        spec.data = self.data.clone();
        spec.headers = self.headers.clone();
        spec.response_type = self.response_type;
        spec.timeout = self.timeout_ms.map(Duration::from_millis);
        Ok(spec)
    }
}
