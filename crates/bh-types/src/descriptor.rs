//! Function descriptors and the `gofuncs.api` line format.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::errors::DescriptorError;

/// File name of the descriptor inside a library directory.
pub const DESCRIPTOR_FILE_NAME: &str = "gofuncs.api";

/// One objective function exported by the native library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionDescriptor {
    name: String,
    dim: usize,
}

impl FunctionDescriptor {
    /// Create a descriptor. Returns `None` for an empty name or zero dimensionality.
    pub fn new(name: impl Into<String>, dim: usize) -> Option<Self> {
        let name = name.into();
        if name.is_empty() || dim == 0 {
            return None;
        }
        Some(Self { name, dim })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.name, self.dim)
    }
}

/// Parse descriptor text, one `name,dimensionality` entry per line.
///
/// Blank lines are skipped. Every other line must have exactly two
/// comma-separated fields and a positive base-10 dimensionality; the first
/// offending line aborts parsing.
pub fn parse_descriptors(text: &str) -> Result<Vec<FunctionDescriptor>, DescriptorError> {
    let mut descriptors = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut fields = trimmed.split(',');
        let (name, dim) = match (fields.next(), fields.next(), fields.next()) {
            (Some(name), Some(dim), None) => (name.trim(), dim.trim()),
            _ => {
                return Err(DescriptorError::Malformed {
                    line,
                    content: raw.to_string(),
                })
            }
        };

        if name.is_empty() {
            return Err(DescriptorError::EmptyName { line });
        }

        let dim_value: usize = dim.parse().map_err(|e: std::num::ParseIntError| {
            DescriptorError::InvalidDimension {
                line,
                name: name.to_string(),
                value: dim.to_string(),
                message: e.to_string(),
            }
        })?;

        let descriptor = FunctionDescriptor::new(name, dim_value).ok_or_else(|| {
            DescriptorError::InvalidDimension {
                line,
                name: name.to_string(),
                value: dim.to_string(),
                message: "dimensionality must be positive".to_string(),
            }
        })?;
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

/// Read and parse a descriptor file.
pub fn load_descriptors<P: AsRef<Path>>(path: P) -> Result<Vec<FunctionDescriptor>, DescriptorError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptors(&text)
}
