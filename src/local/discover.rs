// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::ProfileError;

const AUDIO_MIME_PREFIX: &str = "audio/";

/// A local file that may need to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// File name without directory and extension; becomes the episode title
    pub base_name: String,
    /// File name including the extension
    pub file_name: String,
    /// Extension without the leading dot, empty if there is none
    pub extension: String,
    /// MIME type guessed from the extension
    pub mime_type: Option<String>,
}

impl CandidateFile {
    /// Build a candidate from a path, guessing the MIME type from its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Some(Self {
            path: path.to_path_buf(),
            base_name,
            file_name,
            extension,
            mime_type,
        })
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with(AUDIO_MIME_PREFIX))
    }
}

/// Recursively collect audio files below `root_dir`, sorted by path
pub fn discover_audio_files(root_dir: &Path) -> Result<Vec<CandidateFile>, ProfileError> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ProfileError::Discovery {
            path: root_dir.to_path_buf(),
            source: e,
        })?;

        // Symlinked files count, symlinked directories are not descended into
        if !entry.path().is_file() {
            continue;
        }

        let Some(candidate) = CandidateFile::from_path(entry.path()) else {
            continue;
        };

        if candidate.is_audio() {
            candidates.push(candidate);
        } else {
            debug!(path = %entry.path().display(), mime_type = ?candidate.mime_type, "Ignoring non-audio file");
        }
    }

    Ok(candidates)
}
