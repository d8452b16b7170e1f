// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Source normalization.
//!
//! Turns uploaded `(file name, raw bytes)` pairs into the `path -> content`
//! mapping handed to the compiler. Paths become relative, forward-slash
//! separated and free of `.` segments, so the same file always maps to the
//! same compiler source unit regardless of how it was referenced.

use std::collections::BTreeMap;

use tracing::debug;

use crate::EncodingError;

/// Normalized compiler input: source unit path to file content.
///
/// Ordered by path, which is also the order the compiler reports files in.
pub type NormalizedSources = BTreeMap<String, String>;

/// Name used when a path normalizes to nothing (e.g. `"./"`)
const UNNAMED_SOURCE: &str = "unnamed_source";

/// A decoded input file with its normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Normalized, relative, forward-slash path
    pub path: String,
    /// UTF-8 file content
    pub content: String,
}

impl SourceFile {
    /// Decode `bytes` and normalize `path`.
    pub fn decode(path: &str, bytes: impl Into<Vec<u8>>) -> Result<Self, EncodingError> {
        let content = String::from_utf8(bytes.into())
            .map_err(|source| EncodingError { path: path.to_string(), source })?;
        Ok(Self { path: normalize_path(path), content })
    }
}

/// Normalize a batch of files into compiler input.
///
/// Files are processed in the order given; a later file whose path normalizes
/// to an already seen path replaces the earlier one. The first file that is
/// not valid UTF-8 aborts the whole batch.
pub fn normalize_sources<I, P, B>(files: I) -> Result<NormalizedSources, EncodingError>
where
    I: IntoIterator<Item = (P, B)>,
    P: AsRef<str>,
    B: Into<Vec<u8>>,
{
    let mut sources = NormalizedSources::new();
    for (path, bytes) in files {
        let file = SourceFile::decode(path.as_ref(), bytes)?;
        if sources.insert(file.path.clone(), file.content).is_some() {
            debug!(path = %file.path, "replacing previously loaded source");
        }
    }
    Ok(sources)
}

/// Normalize a path the way `os.path.normpath` would, then make it relative.
///
/// - `\` separators become `/`
/// - empty and `.` segments are dropped
/// - `..` removes the preceding segment; a leading `..` of a relative path is
///   kept, while one above the root of an absolute path is dropped
/// - the root (and a Windows drive prefix) is removed
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut rest = unified.as_str();

    // Windows drive prefix, e.g. `C:`
    if rest.len() >= 2 && rest.as_bytes()[1] == b':' && rest.as_bytes()[0].is_ascii_alphabetic() {
        rest = &rest[2..];
    }
    let absolute = rest.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            normal => segments.push(normal),
        }
    }

    if segments.is_empty() {
        UNNAMED_SOURCE.to_string()
    } else {
        segments.join("/")
    }
}
