//! Record and playback positions over a [`TapeBuffer`](crate::TapeBuffer).

mod read;
mod write;

pub use read::{PlayDirection, ReadCursor};
pub use write::WriteCursor;
