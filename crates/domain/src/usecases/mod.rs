//! Application use cases / business logic

pub mod process;
pub mod render;
pub mod run_digest;

pub use process::{EntryProcessor, ProcessError};
pub use render::{DigestRenderer, RenderConfig};
pub use run_digest::{DigestRun, DigestRunError, RunConfig, RunReport};
