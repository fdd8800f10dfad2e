// Destinations that flushed snapshot records are persisted to
pub mod sink;

pub use sink::{FileSink, RecordSink};
