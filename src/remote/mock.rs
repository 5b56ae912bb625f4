// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory stand-in for the remote platform, shared by the
//! workflow and batch tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};

use crate::error::RemoteError;
use crate::local::AudioSource;

use super::api::AnchorApi;
use super::types::{LibraryItem, ProcessingState, ProcessingStatus, UploadSlot};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Authenticate(String),
    FetchLibrary,
    RequestUploadSlot { mime_type: String, safe_file_name: String },
    UploadBytes { upload_url: String, bytes: u64 },
    TriggerProcessing { request_uuid: String, caption: String },
    PollStatus(String),
    CreateDraft { title: String, audio_id: Value },
}

pub(crate) type CallLog = Arc<Mutex<Vec<Call>>>;

pub(crate) fn library_item(caption: &str, audio_id: Value, status: &str) -> LibraryItem {
    serde_json::from_value(json!({
        "caption": caption,
        "audioId": audio_id,
        "audioTransformationStatus": status,
    }))
    .unwrap()
}

/// Pops the front of a script, repeating the last entry once only one is left
fn next_scripted<T: Clone>(script: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut script = script.lock().unwrap();
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

pub(crate) struct ScriptedAnchor {
    pub calls: CallLog,
    /// Status code returned by the login step, if it should fail
    pub login_failure: Option<u16>,
    /// Safe file names whose preflight does not allow `PUT`
    pub deny_put_for: Vec<String>,
    pub audio_id: Value,
    libraries: Mutex<VecDeque<Vec<LibraryItem>>>,
    states: Mutex<VecDeque<String>>,
}

impl ScriptedAnchor {
    pub(crate) fn new(libraries: Vec<Vec<LibraryItem>>, states: Vec<&str>) -> Self {
        Self {
            calls: CallLog::default(),
            login_failure: None,
            deny_put_for: Vec::new(),
            audio_id: json!(77),
            libraries: Mutex::new(libraries.into()),
            states: Mutex::new(states.into_iter().map(String::from).collect()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AnchorApi for ScriptedAnchor {
    async fn authenticate(&mut self, username: &str, _password: &str) -> Result<(), RemoteError> {
        self.record(Call::Authenticate(username.to_string()));
        match self.login_failure {
            Some(status) => Err(RemoteError::Authentication {
                step: "login",
                status,
            }),
            None => Ok(()),
        }
    }

    async fn fetch_library(&self) -> Result<Vec<LibraryItem>, RemoteError> {
        self.record(Call::FetchLibrary);
        Ok(next_scripted(&self.libraries).unwrap_or_default())
    }

    async fn request_upload_slot(
        &self,
        mime_type: &str,
        safe_file_name: &str,
    ) -> Result<UploadSlot, RemoteError> {
        self.record(Call::RequestUploadSlot {
            mime_type: mime_type.to_string(),
            safe_file_name: safe_file_name.to_string(),
        });

        if self.deny_put_for.iter().any(|name| name == safe_file_name) {
            return Err(RemoteError::MethodNotAllowed {
                allowed: "GET, POST".to_string(),
            });
        }

        Ok(UploadSlot {
            upload_url: format!("https://s3.test/{safe_file_name}"),
            request_uuid: format!("req-{safe_file_name}"),
        })
    }

    async fn upload_bytes(
        &self,
        upload_url: &str,
        mut source: AudioSource,
        _mime_type: &str,
    ) -> Result<u64, RemoteError> {
        let length = source.measure().await.unwrap();
        let mut stream = source.into_stream();
        let mut sent = 0u64;
        while let Some(chunk) = stream.next().await {
            sent += chunk.unwrap().len() as u64;
        }
        assert_eq!(sent, length);

        self.record(Call::UploadBytes {
            upload_url: upload_url.to_string(),
            bytes: sent,
        });
        Ok(sent)
    }

    async fn trigger_processing(
        &self,
        request_uuid: &str,
        caption: &str,
    ) -> Result<String, RemoteError> {
        self.record(Call::TriggerProcessing {
            request_uuid: request_uuid.to_string(),
            caption: caption.to_string(),
        });
        Ok(format!("proc-{request_uuid}"))
    }

    async fn poll_processing_status(
        &self,
        request_uuid: &str,
    ) -> Result<ProcessingStatus, RemoteError> {
        self.record(Call::PollStatus(request_uuid.to_string()));
        let state = next_scripted(&self.states).unwrap_or_else(|| "processed".to_string());
        let state =
            ProcessingState::parse(&state).ok_or(RemoteError::UnknownProcessingState(state))?;

        Ok(ProcessingStatus {
            state,
            data: json!({ "audioId": self.audio_id }),
        })
    }

    async fn create_draft(&self, audio: &LibraryItem, title: &str) -> Result<(), RemoteError> {
        self.record(Call::CreateDraft {
            title: title.to_string(),
            audio_id: audio.audio_id.clone(),
        });
        Ok(())
    }
}
