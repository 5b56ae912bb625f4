mod filename;
mod workflow;

pub use filename::safe_file_name;
pub use workflow::{PublishContext, PublishOptions, publish_file};
