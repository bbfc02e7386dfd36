use super::{Env, IoResult, SequencialFile, WritableFile};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};

pub struct PosixFile(File);

impl WritableFile for PosixFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()> {
        Ok(self.0.write_all(data)?)
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(self.0.flush()?)
    }

    fn sync(&mut self) -> IoResult<()> {
        Ok(self.0.sync_all()?)
    }
}

impl SequencialFile for PosixFile {
    fn read_to_string(&mut self, buf: &mut String) -> IoResult<()> {
        Ok(self.0.read_to_string(buf).map(|_| ())?)
    }
}

#[derive(Clone, Copy)]
pub struct PosixEnv {}

impl Env for PosixEnv {
    type WritableFile = PosixFile;
    type SequencialFile = PosixFile;

    fn new_writable_file(&self, path: &Path) -> IoResult<Self::WritableFile> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(PosixFile(file))
    }

    fn new_sequential_file(&self, path: &Path) -> IoResult<Self::SequencialFile> {
        let file = fs::OpenOptions::new().read(true).write(false).open(path)?;
        Ok(PosixFile(file))
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> IoResult<()> {
        Ok(fs::create_dir_all(path)?)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let env = PosixEnv {};
        let tmp_dir = TempDir::new("posix_env").unwrap();
        let file_path = tmp_dir.path().join("records");

        let mut file = env.new_writable_file(&file_path).unwrap();
        file.append(b"1:one\n").unwrap();
        file.append(b"2:two\n").unwrap();
        file.sync().unwrap();

        assert!(env.file_exists(&file_path));

        let mut file = env.new_sequential_file(&file_path).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "1:one\n2:two\n");
    }

    #[test]
    fn test_writable_file_truncates() {
        let env = PosixEnv {};
        let tmp_dir = TempDir::new("posix_env").unwrap();
        let file_path = tmp_dir.path().join("records");

        let mut file = env.new_writable_file(&file_path).unwrap();
        file.append(b"a much longer first version\n").unwrap();
        drop(file);

        let mut file = env.new_writable_file(&file_path).unwrap();
        file.append(b"short\n").unwrap();
        drop(file);

        let mut content = String::new();
        let mut file = env.new_sequential_file(&file_path).unwrap();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "short\n");
    }

    #[test]
    fn test_create_dir_nested() {
        let env = PosixEnv {};
        let tmp_dir = TempDir::new("posix_env").unwrap();
        let dir = tmp_dir.path().join("a").join("b");

        assert!(!env.file_exists(&dir));
        env.create_dir(&dir).unwrap();
        assert!(env.file_exists(&dir));
    }
}
