// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{PublishError, RemoteError};
use crate::local::{AudioSource, CandidateFile};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::remote::{AnchorApi, LibraryItem, ProcessingState, audio_id_label};

use super::filename::safe_file_name;

const AUDIO_MIME_PREFIX: &str = "audio/";

/// Options controlling the polling loops
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Wait between two polls of the same loop
    pub poll_interval: Duration,
    /// Maximum polls per loop (None = poll until the server settles)
    pub max_poll_attempts: Option<u32>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: None,
        }
    }
}

impl From<&Config> for PublishOptions {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.max_poll_attempts,
        }
    }
}

impl PublishOptions {
    fn check_attempts(&self, stage: &'static str, attempt: u32) -> Result<(), PublishError> {
        if let Some(max) = self.max_poll_attempts
            && attempt >= max
        {
            return Err(PublishError::PollingTimedOut {
                stage,
                attempts: attempt,
            });
        }
        Ok(())
    }
}

/// Position of a file within its profile's upload queue
#[derive(Debug, Clone)]
pub struct PublishContext {
    pub file_index: usize,
    pub total_to_upload: usize,
}

/// Publish one local file as an episode draft
///
/// Runs the whole remote sequence: upload slot, byte transfer, processing
/// request, both polling loops, and finally the draft. Any error aborts this
/// file only; the caller decides what happens to the rest of the batch.
pub async fn publish_file<A: AnchorApi + ?Sized>(
    api: &A,
    candidate: &CandidateFile,
    context: &PublishContext,
    options: &PublishOptions,
    reporter: &SharedProgressReporter,
) -> Result<(), PublishError> {
    let title = candidate.base_name.as_str();

    let mime_type = match candidate.mime_type.as_deref() {
        None => return Err(PublishError::UnknownFileType(candidate.path.clone())),
        Some(mime) if !mime.starts_with(AUDIO_MIME_PREFIX) => {
            return Err(PublishError::UnsupportedFileType {
                path: candidate.path.clone(),
                mime_type: mime.to_string(),
            });
        }
        Some(mime) => mime,
    };

    let source = AudioSource::open(&candidate.path)
        .await
        .map_err(|e| PublishError::FileOpenFailed {
            path: candidate.path.clone(),
            source: e,
        })?;
    info!(path = %candidate.path.display(), "Opened audio file for reading");

    let safe_name = safe_file_name(&candidate.file_name, &candidate.extension);
    info!(title, safe_file_name = %safe_name, "Generating upload location");
    let slot = api.request_upload_slot(mime_type, &safe_name).await?;

    reporter.report(ProgressEvent::UploadStarting {
        title: title.to_string(),
        file_index: context.file_index,
        total_to_upload: context.total_to_upload,
    });

    let total_bytes = source.size_hint();
    let progress_reporter = reporter.clone();
    let progress_title = title.to_string();
    let source = source.with_progress(Arc::new(move |bytes_sent: u64| {
        progress_reporter.report(ProgressEvent::UploadProgress {
            title: progress_title.clone(),
            bytes_sent,
            total_bytes,
        });
    }));

    let bytes_sent = api
        .upload_bytes(&slot.upload_url, source, mime_type)
        .await?;
    reporter.report(ProgressEvent::UploadCompleted {
        title: title.to_string(),
        bytes_sent,
    });

    info!(title, "Initiating processing of audio stream on remote server");
    let processing_uuid = api.trigger_processing(&slot.request_uuid, title).await?;

    info!(title, "Waiting for processing to finish");
    let data = wait_for_processing(api, &processing_uuid, title, options, reporter).await?;
    let audio_id = data
        .get("audioId")
        .filter(|id| !id.is_null())
        .cloned()
        .ok_or_else(|| RemoteError::MalformedResponse {
            operation: "get audio processing status",
            reason: "processed request carries no audioId".to_string(),
        })?;

    let item = wait_for_transformation(api, &audio_id, title, options, reporter).await?;

    info!(title, "Processing finished, creating episode draft");
    api.create_draft(&item, title).await?;
    reporter.report(ProgressEvent::DraftCreated {
        title: title.to_string(),
    });
    info!(title, "Episode draft created");

    Ok(())
}

/// Poll the processing request until it reports `processed`
///
/// Returns the request's data payload. `uploaded` is the only state that is
/// waited on; every other state ends the workflow.
async fn wait_for_processing<A: AnchorApi + ?Sized>(
    api: &A,
    request_uuid: &str,
    title: &str,
    options: &PublishOptions,
    reporter: &SharedProgressReporter,
) -> Result<Value, PublishError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let status = match api.poll_processing_status(request_uuid).await {
            Ok(status) => status,
            Err(RemoteError::UnknownProcessingState(state)) => {
                error!(title, request_uuid, state = %state, "Unknown processing state");
                return Err(PublishError::UnhandledState(state));
            }
            Err(e) => return Err(e.into()),
        };

        match status.state {
            ProcessingState::Processed => return Ok(status.data),
            ProcessingState::Uploaded => {
                reporter.report(ProgressEvent::WaitingForProcessing {
                    title: title.to_string(),
                    state: status.state.to_string(),
                    attempt,
                });
                options.check_attempts("audio processing", attempt)?;
                tokio::time::sleep(options.poll_interval).await;
            }
            ProcessingState::Failed => {
                // The uploaded asset stays on the server: its audioId is not known yet
                error!(title, request_uuid, "Processing state: failed");
                return Err(PublishError::UnhandledState(status.state.to_string()));
            }
            ProcessingState::ProcessRequestAccepted => {
                return Err(PublishError::UnhandledState(status.state.to_string()));
            }
        }
    }
}

/// Re-fetch the library until the processed item's transformation is finished
async fn wait_for_transformation<A: AnchorApi + ?Sized>(
    api: &A,
    audio_id: &Value,
    title: &str,
    options: &PublishOptions,
    reporter: &SharedProgressReporter,
) -> Result<LibraryItem, PublishError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let library = api.fetch_library().await?;

        let Some(item) = library.into_iter().find(|item| item.audio_id == *audio_id) else {
            let label = audio_id_label(audio_id);
            error!(title, audio_id = %label, "Could not find library item");
            return Err(PublishError::LibraryItemMissing(label));
        };

        if item.is_transformed() {
            info!(title, "Audio transformation process finished");
            return Ok(item);
        }

        info!(
            title,
            status = %item.audio_transformation_status,
            "Waiting for transformation process to finish"
        );
        reporter.report(ProgressEvent::WaitingForTransformation {
            title: title.to_string(),
            status: item.audio_transformation_status.clone(),
            attempt,
        });
        options.check_attempts("audio transformation", attempt)?;
        tokio::time::sleep(options.poll_interval).await;
    }
}
