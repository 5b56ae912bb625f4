// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transformation status reported once an audio asset is fully processed
pub const TRANSFORMATION_FINISHED: &str = "finished";

/// One uploaded audio asset in the remote audio library
///
/// Unknown fields are kept so the item can be sent back verbatim as the
/// audio reference of a new episode draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub caption: String,
    pub audio_id: Value,
    pub audio_transformation_status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LibraryItem {
    pub fn is_transformed(&self) -> bool {
        self.audio_transformation_status == TRANSFORMATION_FINISHED
    }
}

/// Render an audio identifier for log lines and error messages
pub fn audio_id_label(audio_id: &Value) -> String {
    match audio_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LibraryResponse {
    pub audios: Vec<LibraryItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CsrfResponse {
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestUuidResponse {
    pub request_uuid: String,
}

/// Signed location accepting exactly one byte transfer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    #[serde(rename = "signedUrl")]
    pub upload_url: String,
    pub request_uuid: String,
}

/// Server-side state of a processing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    Uploaded,
    ProcessRequestAccepted,
    Processed,
    Failed,
}

impl ProcessingState {
    /// Parse the wire representation, `None` for unknown values
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(Self::Uploaded),
            "processing-request-accepted" => Some(Self::ProcessRequestAccepted),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::ProcessRequestAccepted => "processing-request-accepted",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of polling a processing request
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingStatus {
    pub state: ProcessingState,
    /// Payload carrying the `audioId` once processing is done
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessingStatusResponse {
    pub request: ProcessingRequestInfo,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessingRequestInfo {
    pub state: String,
}
