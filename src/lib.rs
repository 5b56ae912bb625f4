pub mod batch;
pub mod config;
pub mod error;
pub mod http;
pub mod local;
pub mod plan;
pub mod progress;
pub mod remote;
pub mod upload;

// Re-export main types for convenience
pub use batch::{BatchResult, ProfileResult, publish_profile, run_batch};
pub use config::{Config, Profile};
pub use error::{ConfigError, ErrorKind, ProfileError, PublishError, RemoteError};
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use local::{AudioSource, CandidateFile, discover_audio_files};
pub use plan::{UploadPlan, create_upload_plan};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use remote::{AnchorApi, AnchorSession, LibraryItem, ProcessingState, UploadSlot};
pub use upload::{PublishContext, PublishOptions, publish_file, safe_file_name};
