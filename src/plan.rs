// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::local::CandidateFile;

/// Which local files still need to be published
#[derive(Debug, Clone, Default)]
pub struct UploadPlan {
    /// Files with no matching library item, in discovery order
    pub to_upload: Vec<CandidateFile>,
    /// Files skipped, each with the first caption that matched it
    pub already_uploaded: Vec<(CandidateFile, String)>,
}

/// Find the first caption containing `base_name` (case-sensitive substring)
pub fn find_matching_caption<'a>(base_name: &str, captions: &'a [String]) -> Option<&'a str> {
    captions
        .iter()
        .find(|caption| caption.contains(base_name))
        .map(String::as_str)
}

/// Split local candidates into files to upload and files already uploaded
///
/// A candidate counts as uploaded when any remote caption contains its base
/// name. This is a heuristic: an unrelated caption can match, and a renamed
/// upload will not.
pub fn create_upload_plan(candidates: Vec<CandidateFile>, captions: &[String]) -> UploadPlan {
    let mut plan = UploadPlan::default();

    for candidate in candidates {
        match find_matching_caption(&candidate.base_name, captions) {
            Some(caption) => {
                let caption = caption.to_string();
                plan.already_uploaded.push((candidate, caption));
            }
            None => plan.to_upload.push(candidate),
        }
    }

    plan
}
