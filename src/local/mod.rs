mod discover;
mod source;

pub use discover::{CandidateFile, discover_audio_files};
pub use source::{AudioSource, ProgressCallback};
