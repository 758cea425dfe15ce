pub mod buffer;
pub mod writer;

pub use buffer::CommitBuffer;
pub use writer::{DrainOutcome, FlushMode, FlushOutcome, SinkWriter};
