// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::{error, info};

use crate::config::{Config, Profile};
use crate::error::ProfileError;
use crate::local::discover_audio_files;
use crate::plan::create_upload_plan;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::remote::AnchorApi;
use crate::upload::{PublishContext, PublishOptions, publish_file};

/// Result of processing one profile
#[derive(Debug, Clone, Default)]
pub struct ProfileResult {
    pub username: String,
    /// Number of drafts created
    pub published: usize,
    /// Number of files skipped because a matching library item exists
    pub skipped: usize,
    /// Number of files that failed
    pub failed: usize,
    /// Details of failed files (path, error message)
    pub failed_files: Vec<(String, String)>,
}

/// Result of a whole run over every configured profile
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub profiles: Vec<ProfileResult>,
    /// Profiles that were aborted (username, error message)
    pub failed_profiles: Vec<(String, String)>,
}

impl BatchResult {
    pub fn published(&self) -> usize {
        self.profiles.iter().map(|p| p.published).sum()
    }

    pub fn skipped(&self) -> usize {
        self.profiles.iter().map(|p| p.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.profiles.iter().map(|p| p.failed).sum()
    }
}

/// Publish every new audio file of one profile
///
/// This:
/// 1. Logs in
/// 2. Discovers local audio files below the profile's root directory
/// 3. Skips files whose base name appears in a remote library caption
/// 4. Publishes the rest one after another
///
/// A failing file is logged and counted; only login, discovery and the
/// initial library fetch abort the profile.
pub async fn publish_profile<A: AnchorApi>(
    api: &mut A,
    profile: &Profile,
    options: &PublishOptions,
    reporter: &SharedProgressReporter,
) -> Result<ProfileResult, ProfileError> {
    let username = profile.anchor_username.as_str();
    api.authenticate(username, &profile.anchor_password).await?;

    let candidates = discover_audio_files(&profile.root_dir)?;
    info!(username, root_dir = %profile.root_dir.display(), files = candidates.len(), "Discovered local audio files");

    let captions: Vec<String> = api
        .fetch_library()
        .await?
        .into_iter()
        .map(|item| item.caption)
        .collect();

    let local_files = candidates.len();
    let plan = create_upload_plan(candidates, &captions);

    for (candidate, caption) in &plan.already_uploaded {
        info!(
            path = %candidate.path.display(),
            caption = %caption,
            "Already uploaded - skipping upload"
        );
        reporter.report(ProgressEvent::FileSkipped {
            file_name: candidate.file_name.clone(),
            caption: caption.clone(),
        });
    }

    let total_to_upload = plan.to_upload.len();
    reporter.report(ProgressEvent::PlanReady {
        username: username.to_string(),
        local_files,
        already_uploaded: plan.already_uploaded.len(),
        to_upload: total_to_upload,
    });

    let mut result = ProfileResult {
        username: username.to_string(),
        skipped: plan.already_uploaded.len(),
        ..Default::default()
    };

    for (file_index, candidate) in plan.to_upload.iter().enumerate() {
        let context = PublishContext {
            file_index,
            total_to_upload,
        };

        match publish_file(&*api, candidate, &context, options, reporter).await {
            Ok(()) => result.published += 1,
            Err(e) => {
                error!(
                    path = %candidate.path.display(),
                    kind = ?e.kind(),
                    "Exception while processing audio: {e}"
                );
                reporter.report(ProgressEvent::FileFailed {
                    title: candidate.base_name.clone(),
                    error: e.to_string(),
                });
                result.failed += 1;
                result
                    .failed_files
                    .push((candidate.path.display().to_string(), e.to_string()));
            }
        }
    }

    Ok(result)
}

/// Run every profile of the configuration in order
///
/// `connect` creates a fresh, unauthenticated session per profile. A profile
/// that fails is recorded and the next one still runs.
pub async fn run_batch<A, F>(
    config: &Config,
    mut connect: F,
    reporter: SharedProgressReporter,
) -> BatchResult
where
    A: AnchorApi,
    F: FnMut(&Profile) -> Result<A, ProfileError>,
{
    let options = PublishOptions::from(config);
    let total_profiles = config.profiles.len();
    let mut batch = BatchResult::default();

    for (profile_index, profile) in config.profiles.iter().enumerate() {
        let username = profile.anchor_username.clone();
        reporter.report(ProgressEvent::ProfileStarting {
            username: username.clone(),
            profile_index,
            total_profiles,
        });

        let outcome = match connect(profile) {
            Ok(mut api) => publish_profile(&mut api, profile, &options, &reporter).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!(
                    username = %username,
                    published = result.published,
                    skipped = result.skipped,
                    failed = result.failed,
                    "Profile done"
                );
                batch.profiles.push(result);
            }
            Err(e) => {
                error!(username = %username, kind = ?e.kind(), "Exception while processing profile: {e}");
                reporter.report(ProgressEvent::ProfileFailed {
                    username: username.clone(),
                    error: e.to_string(),
                });
                batch.failed_profiles.push((username, e.to_string()));
            }
        }
    }

    reporter.report(ProgressEvent::BatchCompleted {
        published_count: batch.published(),
        skipped_count: batch.skipped(),
        failed_count: batch.failed(),
        failed_profiles: batch.failed_profiles.len(),
    });

    batch
}
