// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::local::AudioSource;

use super::types::{LibraryItem, ProcessingStatus, UploadSlot};

/// Primitive operations of the hosting platform's browser API
///
/// Every call shares the session established by `authenticate`; apart from
/// that the calls are independent of each other.
#[async_trait]
pub trait AnchorApi: Send + Sync {
    /// Fetch an anti-forgery token and log in with it
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<(), RemoteError>;

    /// List every item of the remote audio library
    async fn fetch_library(&self) -> Result<Vec<LibraryItem>, RemoteError>;

    /// Obtain a signed upload URL and check that it accepts `PUT`
    async fn request_upload_slot(
        &self,
        mime_type: &str,
        safe_file_name: &str,
    ) -> Result<UploadSlot, RemoteError>;

    /// Stream the whole file to the signed URL, returning the bytes sent
    async fn upload_bytes(
        &self,
        upload_url: &str,
        source: AudioSource,
        mime_type: &str,
    ) -> Result<u64, RemoteError>;

    /// Start server-side transcoding, returning the processing request id
    async fn trigger_processing(
        &self,
        request_uuid: &str,
        caption: &str,
    ) -> Result<String, RemoteError>;

    async fn poll_processing_status(
        &self,
        request_uuid: &str,
    ) -> Result<ProcessingStatus, RemoteError>;

    /// Create an unpublished episode referencing a processed library item
    async fn create_draft(&self, audio: &LibraryItem, title: &str) -> Result<(), RemoteError>;
}
