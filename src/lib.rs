pub mod env;
mod error;
mod level;
mod list;
mod options;
mod snapshot;
mod store;

pub use env::mem::MemEnv;
pub use env::posix::PosixEnv;
pub use error::{Error, Result};
pub use level::{GeometricLevels, LevelGenerator};
pub use options::Options;
pub use snapshot::{DelimitedCodec, RecordCodec, SnapshotWriter};
pub use store::SkipStore;
