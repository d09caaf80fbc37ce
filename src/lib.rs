pub mod config;
pub mod continuity;
pub mod errors;
pub mod fsutil;
pub mod history;
pub mod landing;
pub mod outputs;
pub mod pipeline;
pub mod render;

pub use config::{CiContext, RawInputs, RunConfig};
pub use errors::{PublishError, StageError};
pub use pipeline::{PublishOutcome, Publisher, Stage};
