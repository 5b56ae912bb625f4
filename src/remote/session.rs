// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::error::RemoteError;
use crate::http::{HttpClient, HttpRequest, HttpResponse, RequestBody};
use crate::local::AudioSource;

use super::api::AnchorApi;
use super::types::{
    CsrfResponse, LibraryItem, LibraryResponse, ProcessingState, ProcessingStatus,
    ProcessingStatusResponse, RequestUuidResponse, UploadSlot,
};

const CSRF_PATH: &str = "api/csrf";
const LOGIN_PATH: &str = "api/login";
const AUDIO_LIBRARY_PATH: &str = "api/sourceaudio/audiolibrary";
const SIGNED_URL_PATH: &str = "api/proxy/v3/upload/signed_url";
const CREATE_EPISODE_PATH: &str = "api/podcastepisode";

fn process_audio_path(request_uuid: &str) -> String {
    format!("api/proxy/v3/upload/{request_uuid}/process_audio")
}

fn upload_info_path(request_uuid: &str) -> String {
    format!("api/proxy/v3/upload/{request_uuid}")
}

/// One logged-in session against the hosting platform
///
/// The underlying client must keep cookies; the session is discarded once the
/// profile is done, there is no explicit logout.
pub struct AnchorSession<C: HttpClient> {
    client: C,
    base_url: String,
    csrf_token: Option<String>,
}

impl<C: HttpClient> AnchorSession<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.csrf_token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let url = request.url.clone();
        self.client
            .send(request)
            .await
            .map_err(|e| RemoteError::HttpFailed { url, source: e })
    }

    async fn fetch_csrf_token(&self) -> Result<String, RemoteError> {
        info!("Getting CSRF token");
        let response = self.send(HttpRequest::get(self.url(CSRF_PATH))).await?;
        if !response.is_success() {
            return Err(RemoteError::Authentication {
                step: "csrf",
                status: response.status,
            });
        }

        let body: CsrfResponse = decode(&response, "get CSRF token")?;
        debug!(token = %body.csrf_token, "CSRF token for current session");
        Ok(body.csrf_token)
    }
}

fn check_status(
    response: HttpResponse,
    operation: &'static str,
) -> Result<HttpResponse, RemoteError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::HttpStatus {
            operation,
            status: response.status,
        })
    }
}

fn decode<T: DeserializeOwned>(
    response: &HttpResponse,
    operation: &'static str,
) -> Result<T, RemoteError> {
    response
        .json()
        .map_err(|e| RemoteError::MalformedResponse {
            operation,
            reason: e.to_string(),
        })
}

/// Whether a CORS `access-control-allow-methods` value lists `PUT`
fn allows_put(allowed_methods: &str) -> bool {
    allowed_methods
        .split(',')
        .any(|method| method.trim().eq_ignore_ascii_case("PUT"))
}

#[async_trait]
impl<C: HttpClient> AnchorApi for AnchorSession<C> {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<(), RemoteError> {
        let csrf_token = self.fetch_csrf_token().await?;

        info!(username, "Logging in");
        let payload = json!({
            "betaCode": null,
            "email": username,
            "password": password,
            "_csrf": csrf_token,
        });
        let response = self
            .send(HttpRequest::post_json(self.url(LOGIN_PATH), payload))
            .await?;
        if !response.is_success() {
            return Err(RemoteError::Authentication {
                step: "login",
                status: response.status,
            });
        }

        self.csrf_token = Some(csrf_token);
        info!(username, "Logged in");
        Ok(())
    }

    async fn fetch_library(&self) -> Result<Vec<LibraryItem>, RemoteError> {
        info!("Fetching audio library info");
        let response = self
            .send(HttpRequest::get(self.url(AUDIO_LIBRARY_PATH)))
            .await?;
        let response = check_status(response, "get audio library")?;
        let library: LibraryResponse = decode(&response, "get audio library")?;

        info!(items = library.audios.len(), "Fetched audio library");
        Ok(library.audios)
    }

    async fn request_upload_slot(
        &self,
        mime_type: &str,
        safe_file_name: &str,
    ) -> Result<UploadSlot, RemoteError> {
        info!(safe_file_name, "Getting upload location");
        let url = Url::parse_with_params(
            &self.url(SIGNED_URL_PATH),
            &[("filename", safe_file_name), ("type", mime_type)],
        )?;
        let response = self.send(HttpRequest::get(url.as_str())).await?;
        let response = check_status(response, "get signed URL for audio file upload")?;
        let slot: UploadSlot = decode(&response, "get signed URL for audio file upload")?;

        // Mirror the browser's CORS preflight before uploading
        let preflight = HttpRequest::new(Method::OPTIONS, slot.upload_url.as_str())
            .header("Access-Control-Request-Method", "PUT")
            .header("Access-Control-Request-Headers", "content-type")
            .header("Origin", self.base_url.as_str());
        let response = self.send(preflight).await?;
        let response = check_status(response, "get signed URL OPTIONS verbs")?;

        let allowed = response
            .header("access-control-allow-methods")
            .unwrap_or_default();
        if !allows_put(allowed) {
            return Err(RemoteError::MethodNotAllowed {
                allowed: allowed.to_string(),
            });
        }

        debug!(upload_url = %slot.upload_url, request_uuid = %slot.request_uuid, "Upload location ready");
        Ok(slot)
    }

    async fn upload_bytes(
        &self,
        upload_url: &str,
        mut source: AudioSource,
        mime_type: &str,
    ) -> Result<u64, RemoteError> {
        let measured = source.measure().await;
        let content_length = measured.map_err(|e| RemoteError::FileReadFailed {
            path: source.path().to_path_buf(),
            source: e,
        })?;

        info!(path = %source.path().display(), content_length, "Uploading audio stream");
        let request = HttpRequest::new(Method::PUT, upload_url)
            .header("content-type", mime_type)
            .body(RequestBody::Stream {
                stream: source.into_stream(),
                content_length,
            });

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(RemoteError::Upload {
                status: response.status,
            });
        }

        Ok(content_length)
    }

    async fn trigger_processing(
        &self,
        request_uuid: &str,
        caption: &str,
    ) -> Result<String, RemoteError> {
        info!(request_uuid, caption, "Requesting audio processing");
        let payload = json!({
            "audioType": "default",
            "caption": caption,
            "isExtractedFromVideo": false,
            "origin": "podcast:upload",
        });
        let response = self
            .send(HttpRequest::post_json(
                self.url(&process_audio_path(request_uuid)),
                payload,
            ))
            .await?;
        let response = check_status(response, "request audio stream processing")?;
        let body: RequestUuidResponse = decode(&response, "request audio stream processing")?;

        Ok(body.request_uuid)
    }

    async fn poll_processing_status(
        &self,
        request_uuid: &str,
    ) -> Result<ProcessingStatus, RemoteError> {
        let response = self
            .send(HttpRequest::get(self.url(&upload_info_path(request_uuid))))
            .await?;
        let response = check_status(response, "get audio processing status")?;
        let body: ProcessingStatusResponse = decode(&response, "get audio processing status")?;

        let state = ProcessingState::parse(&body.request.state)
            .ok_or(RemoteError::UnknownProcessingState(body.request.state))?;
        debug!(request_uuid, %state, "Polled processing state");

        Ok(ProcessingStatus {
            state,
            data: body.data,
        })
    }

    async fn create_draft(&self, audio: &LibraryItem, title: &str) -> Result<(), RemoteError> {
        info!(title, "Creating episode draft");
        let payload = json!({
            "episodeAudios": [audio],
            "hourOffset": -1,
            "isDraft": true,
            "publishOn": null,
            "title": title,
            "description": "",
        });
        let response = self
            .send(HttpRequest::post_json(self.url(CREATE_EPISODE_PATH), payload))
            .await?;
        check_status(response, "create draft episode")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures::StreamExt;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::Value;
    use tempfile::tempdir;

    use crate::error::ErrorKind;

    const BASE: &str = "https://anchor.test";

    #[derive(Debug)]
    struct RecordedRequest {
        method: Method,
        url: String,
        headers: Vec<(&'static str, String)>,
        json: Option<Value>,
        bytes: Option<Vec<u8>>,
        content_length: Option<u64>,
    }

    impl RecordedRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

    /// Replays canned responses in order and records every request
    struct MockHttpClient {
        responses: Mutex<VecDeque<HttpResponse>>,
        log: RequestLog,
    }

    impl MockHttpClient {
        fn new(responses: Vec<HttpResponse>) -> (Self, RequestLog) {
            let log = RequestLog::default();
            let client = Self {
                responses: Mutex::new(responses.into()),
                log: log.clone(),
            };
            (client, log)
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
            let (json, bytes, content_length) = match request.body {
                RequestBody::Empty => (None, None, None),
                RequestBody::Json(value) => (Some(value), None, None),
                RequestBody::Stream {
                    mut stream,
                    content_length,
                } => {
                    let mut collected = Vec::new();
                    while let Some(chunk) = stream.next().await {
                        collected.extend_from_slice(&chunk.unwrap());
                    }
                    (None, Some(collected), Some(content_length))
                }
            };

            self.log.lock().unwrap().push(RecordedRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                json,
                bytes,
                content_length,
            });

            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request"))
        }
    }

    fn respond(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn respond_allow(methods: &'static str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static(methods),
        );
        HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        }
    }

    fn session(responses: Vec<HttpResponse>) -> (AnchorSession<MockHttpClient>, RequestLog) {
        let (client, log) = MockHttpClient::new(responses);
        (AnchorSession::new(client, format!("{BASE}/")), log)
    }

    #[tokio::test]
    async fn authenticate_sends_token_with_credentials() {
        let (mut session, log) = session(vec![
            respond(200, json!({ "csrfToken": "tok-1" })),
            respond(200, json!({})),
        ]);

        session.authenticate("me@example.com", "pw").await.unwrap();
        assert!(session.is_authenticated());

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].method, Method::GET);
        assert_eq!(log[0].url, format!("{BASE}/api/csrf"));
        assert_eq!(log[1].method, Method::POST);
        assert_eq!(log[1].url, format!("{BASE}/api/login"));
        assert_eq!(
            log[1].json,
            Some(json!({
                "betaCode": null,
                "email": "me@example.com",
                "password": "pw",
                "_csrf": "tok-1"
            }))
        );
    }

    #[tokio::test]
    async fn authenticate_fails_on_csrf_status() {
        let (mut session, log) = session(vec![respond(500, json!({}))]);

        let err = session.authenticate("a", "b").await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Authentication {
                step: "csrf",
                status: 500
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!session.is_authenticated());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_fails_on_login_status() {
        let (mut session, _log) = session(vec![
            respond(200, json!({ "csrfToken": "tok" })),
            respond(401, json!({})),
        ]);

        let err = session.authenticate("a", "b").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn fetch_library_returns_items() {
        let (session, log) = session(vec![respond(
            200,
            json!({
                "audios": [
                    { "caption": "one", "audioId": 1, "audioTransformationStatus": "finished" },
                    { "caption": "two", "audioId": 2, "audioTransformationStatus": "processing" }
                ]
            }),
        )]);

        let items = session.fetch_library().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].caption, "two");
        assert_eq!(
            log.lock().unwrap()[0].url,
            format!("{BASE}/api/sourceaudio/audiolibrary")
        );
    }

    #[tokio::test]
    async fn fetch_library_reports_status() {
        let (session, _log) = session(vec![respond(502, json!({}))]);

        let err = session.fetch_library().await.unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus { status: 502, .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn fetch_library_rejects_missing_fields() {
        let (session, _log) = session(vec![respond(200, json!({ "items": [] }))]);

        let err = session.fetch_library().await.unwrap_err();
        assert!(matches!(err, RemoteError::MalformedResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::RemoteProtocol);
    }

    #[tokio::test]
    async fn upload_slot_runs_preflight() {
        let (session, log) = session(vec![
            respond(
                200,
                json!({ "signedUrl": "https://s3.test/put?sig=1", "requestUuid": "req-1" }),
            ),
            respond_allow("GET, PUT, POST"),
        ]);

        let slot = session
            .request_upload_slot("audio/mpeg", "abc123.mp3")
            .await
            .unwrap();
        assert_eq!(slot.upload_url, "https://s3.test/put?sig=1");
        assert_eq!(slot.request_uuid, "req-1");

        let log = log.lock().unwrap();
        assert!(log[0].url.starts_with(&format!("{BASE}/api/proxy/v3/upload/signed_url?")));
        assert!(log[0].url.contains("filename=abc123.mp3"));
        assert!(log[0].url.contains("type=audio%2Fmpeg"));

        assert_eq!(log[1].method, Method::OPTIONS);
        assert_eq!(log[1].url, "https://s3.test/put?sig=1");
        assert_eq!(log[1].header("Access-Control-Request-Method"), Some("PUT"));
        assert_eq!(
            log[1].header("Access-Control-Request-Headers"),
            Some("content-type")
        );
        assert_eq!(log[1].header("Origin"), Some(BASE));
    }

    #[tokio::test]
    async fn upload_slot_reports_signed_url_status() {
        let (session, log) = session(vec![respond(403, json!({}))]);

        let err = session
            .request_upload_slot("audio/mpeg", "abc123.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus { status: 403, .. }));
        assert_eq!(
            err.to_string(),
            "Failed to get signed URL for audio file upload, status code: 403"
        );
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_slot_requires_put() {
        let (session, _log) = session(vec![
            respond(200, json!({ "signedUrl": "https://s3.test/x", "requestUuid": "r" })),
            respond_allow("GET, POST"),
        ]);

        let err = session
            .request_upload_slot("audio/mpeg", "x.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MethodNotAllowed { .. }));
        assert!(err.to_string().contains("PUT method not allowed"));
    }

    #[tokio::test]
    async fn upload_slot_without_allow_header_fails() {
        let (session, _log) = session(vec![
            respond(200, json!({ "signedUrl": "https://s3.test/x", "requestUuid": "r" })),
            respond(200, json!({})),
        ]);

        let err = session
            .request_upload_slot("audio/mpeg", "x.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MethodNotAllowed { .. }));
    }

    #[tokio::test]
    async fn upload_slot_preflight_status_is_reported() {
        let (session, _log) = session(vec![
            respond(200, json!({ "signedUrl": "https://s3.test/x", "requestUuid": "r" })),
            respond(403, json!({})),
        ]);

        let err = session
            .request_upload_slot("audio/mpeg", "x.mp3")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn upload_bytes_sends_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode1.mp3");
        std::fs::write(&path, b"fake audio bytes").unwrap();

        let (session, log) = session(vec![respond(200, json!({}))]);
        let source = AudioSource::open(&path).await.unwrap();

        let sent = session
            .upload_bytes("https://s3.test/put", source, "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(sent, 16);

        let log = log.lock().unwrap();
        assert_eq!(log[0].method, Method::PUT);
        assert_eq!(log[0].url, "https://s3.test/put");
        assert_eq!(log[0].header("content-type"), Some("audio/mpeg"));
        assert_eq!(log[0].content_length, Some(16));
        assert_eq!(log[0].bytes.as_deref(), Some(&b"fake audio bytes"[..]));
    }

    #[tokio::test]
    async fn upload_bytes_reports_status() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode1.mp3");
        std::fs::write(&path, b"x").unwrap();

        let (session, _log) = session(vec![respond(403, json!({}))]);
        let source = AudioSource::open(&path).await.unwrap();

        let err = session
            .upload_bytes("https://s3.test/put", source, "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Upload { status: 403 }));
        assert_eq!(err.kind(), ErrorKind::Upload);
    }

    #[tokio::test]
    async fn trigger_processing_posts_caption() {
        let (session, log) = session(vec![respond(200, json!({ "requestUuid": "proc-9" }))]);

        let uuid = session.trigger_processing("req-1", "episode1").await.unwrap();
        assert_eq!(uuid, "proc-9");

        let log = log.lock().unwrap();
        assert_eq!(
            log[0].url,
            format!("{BASE}/api/proxy/v3/upload/req-1/process_audio")
        );
        assert_eq!(
            log[0].json,
            Some(json!({
                "audioType": "default",
                "caption": "episode1",
                "isExtractedFromVideo": false,
                "origin": "podcast:upload"
            }))
        );
    }

    #[tokio::test]
    async fn trigger_processing_reports_status() {
        let (session, _log) = session(vec![respond(500, json!({}))]);

        let err = session
            .trigger_processing("req-1", "episode1")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus { status: 500, .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn poll_parses_state_and_data() {
        let (session, log) = session(vec![respond(
            200,
            json!({ "request": { "state": "processed" }, "data": { "audioId": 77 } }),
        )]);

        let status = session.poll_processing_status("proc-9").await.unwrap();
        assert_eq!(status.state, ProcessingState::Processed);
        assert_eq!(status.data["audioId"], 77);
        assert_eq!(
            log.lock().unwrap()[0].url,
            format!("{BASE}/api/proxy/v3/upload/proc-9")
        );
    }

    #[tokio::test]
    async fn poll_reports_status() {
        let (session, _log) = session(vec![respond(404, json!({}))]);

        let err = session.poll_processing_status("proc-9").await.unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus { status: 404, .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn poll_rejects_unknown_state() {
        let (session, _log) = session(vec![respond(
            200,
            json!({ "request": { "state": "exploded" }, "data": null }),
        )]);

        let err = session.poll_processing_status("p").await.unwrap_err();
        assert!(matches!(err, RemoteError::UnknownProcessingState(ref s) if s == "exploded"));
        assert_eq!(err.kind(), ErrorKind::RemoteProtocol);
    }

    #[tokio::test]
    async fn create_draft_posts_full_item() {
        let (session, log) = session(vec![respond(200, json!({}))]);
        let item: LibraryItem = serde_json::from_value(json!({
            "caption": "episode1",
            "audioId": 77,
            "audioTransformationStatus": "finished",
            "duration": 1000
        }))
        .unwrap();

        session.create_draft(&item, "episode1").await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[0].url, format!("{BASE}/api/podcastepisode"));
        assert_eq!(
            log[0].json,
            Some(json!({
                "episodeAudios": [{
                    "caption": "episode1",
                    "audioId": 77,
                    "audioTransformationStatus": "finished",
                    "duration": 1000
                }],
                "hourOffset": -1,
                "isDraft": true,
                "publishOn": null,
                "title": "episode1",
                "description": ""
            }))
        );
    }

    #[tokio::test]
    async fn create_draft_reports_status() {
        let (session, _log) = session(vec![respond(500, json!({}))]);
        let item: LibraryItem = serde_json::from_value(json!({
            "caption": "c",
            "audioId": 1,
            "audioTransformationStatus": "finished"
        }))
        .unwrap();

        let err = session.create_draft(&item, "c").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn put_detection_is_token_based() {
        assert!(allows_put("PUT"));
        assert!(allows_put("GET,PUT"));
        assert!(allows_put("get, put, post"));
        assert!(!allows_put("GET, POST"));
        assert!(!allows_put(""));
    }
}
