pub mod bootstrap;
pub mod code;
pub mod document;
pub mod error;
pub mod params;
pub mod processor;
pub mod tag;

pub use code::{CodeBlock, CodeRunner, ExecutionError};
pub use error::PipelineError;
pub use processor::{ProcessedDocument, Processor};
pub use tag::{Tag, TagError, TagRegistry};
