// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::http::ByteStream;

const CHUNK_SIZE: usize = 64 * 1024;

/// Callback receiving the running total of bytes read
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// An opened local audio file ready to be streamed to the server
pub struct AudioSource {
    path: PathBuf,
    file: File,
    size_hint: Option<u64>,
    on_progress: Option<ProgressCallback>,
}

impl AudioSource {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let size_hint = file.metadata().await.ok().map(|m| m.len());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size_hint,
            on_progress: None,
        })
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size from metadata, for progress display only
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Determine the length by seeking to the end, then rewind to the start
    pub async fn measure(&mut self) -> std::io::Result<u64> {
        let length = self.file.seek(SeekFrom::End(0)).await?;
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(length)
    }

    /// Turn the file into a chunked byte stream, reporting progress per chunk
    pub fn into_stream(self) -> ByteStream {
        let state = Some((self.file, 0u64, self.on_progress));

        Box::pin(futures::stream::unfold(state, |state| async move {
            let (mut file, sent, on_progress) = state?;
            let mut buffer = vec![0u8; CHUNK_SIZE];

            match file.read(&mut buffer).await {
                Ok(0) => None,
                Ok(n) => {
                    buffer.truncate(n);
                    let sent = sent + n as u64;
                    if let Some(callback) = &on_progress {
                        callback(sent);
                    }
                    Some((Ok(Bytes::from(buffer)), Some((file, sent, on_progress))))
                }
                Err(e) => Some((Err(e), None)),
            }
        }))
    }
}
