pub mod mem;
pub mod posix;

use std::io;
use std::ops::Deref;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct IoError(io::Error);

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        IoError(err)
    }
}

impl Deref for IoError {
    type Target = io::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub type IoResult<T> = Result<T, IoError>;

pub trait WritableFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()>;
    fn flush(&mut self) -> IoResult<()>;
    fn sync(&mut self) -> IoResult<()>;
}

pub trait SequencialFile {
    fn read_to_string(&mut self, buf: &mut String) -> IoResult<()>;
}

pub trait Env: Send + Sync + Clone + 'static {
    type WritableFile: WritableFile + 'static;
    type SequencialFile: SequencialFile + 'static;

    fn new_writable_file(&self, name: &Path) -> IoResult<Self::WritableFile>;
    fn new_sequential_file(&self, name: &Path) -> IoResult<Self::SequencialFile>;

    fn file_exists(&self, path: &Path) -> bool;
    fn create_dir(&self, path: &Path) -> IoResult<()>;
}

pub fn read_file_to_string<E: Env>(
    env: &E,
    fname: impl AsRef<Path>,
    data: &mut String,
) -> IoResult<()> {
    data.clear();
    let mut f = env.new_sequential_file(fname.as_ref())?;
    f.read_to_string(data)?;

    Ok(())
}
