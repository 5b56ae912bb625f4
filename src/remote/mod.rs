mod api;
mod session;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use api::AnchorApi;
pub use session::AnchorSession;
pub use types::{
    LibraryItem, ProcessingState, ProcessingStatus, TRANSFORMATION_FINISHED, UploadSlot,
    audio_id_label,
};
