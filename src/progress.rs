// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted while publishing for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A profile is about to be processed
    ProfileStarting {
        username: String,
        profile_index: usize,
        total_profiles: usize,
    },

    /// Local files were matched against the remote library
    PlanReady {
        username: String,
        local_files: usize,
        already_uploaded: usize,
        to_upload: usize,
    },

    /// A local file already has a matching library item
    FileSkipped { file_name: String, caption: String },

    /// Byte transfer for a file is starting
    UploadStarting {
        title: String,
        /// Index of this file in the upload queue
        file_index: usize,
        /// Total number of files to upload for the profile
        total_to_upload: usize,
    },

    /// Upload progress update
    UploadProgress {
        title: String,
        bytes_sent: u64,
        total_bytes: Option<u64>,
    },

    /// All bytes reached the signed URL
    UploadCompleted { title: String, bytes_sent: u64 },

    /// Remote processing has not finished yet
    WaitingForProcessing {
        title: String,
        state: String,
        attempt: u32,
    },

    /// Library item exists but its transformation is still running
    WaitingForTransformation {
        title: String,
        status: String,
        attempt: u32,
    },

    /// Episode draft was created
    DraftCreated { title: String },

    /// Publishing a single file failed
    FileFailed { title: String, error: String },

    /// A whole profile was aborted
    ProfileFailed { username: String, error: String },

    /// Every profile has been processed
    BatchCompleted {
        published_count: usize,
        skipped_count: usize,
        failed_count: usize,
        failed_profiles: usize,
    },
}

/// Trait for reporting progress events while publishing.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
