mod overlap;
mod reader;
mod stream;

pub use reader::{
    DEFAULT_OVERLAP_TIMEOUT, DEFAULT_STREAM_BUFFER_CAPACITY, EventReader, EventReaderBuilder,
};
pub use stream::ReconciledStream;
