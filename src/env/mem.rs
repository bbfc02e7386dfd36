use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use super::{Env, IoResult, SequencialFile, WritableFile};

/// In-memory filesystem for tests. Clones share the same file map.
#[derive(Clone, Default)]
pub struct MemEnv {
    files: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>>>,
}

impl MemEnv {
    pub fn new() -> Self {
        MemEnv::default()
    }
}

pub struct MemFile {
    data: Arc<Mutex<Vec<u8>>>,
}

impl WritableFile for MemFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()> {
        self.data.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl SequencialFile for MemFile {
    fn read_to_string(&mut self, buf: &mut String) -> IoResult<()> {
        let data = self.data.lock().unwrap();
        let text = std::str::from_utf8(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        buf.push_str(text);
        Ok(())
    }
}

impl Env for MemEnv {
    type WritableFile = MemFile;
    type SequencialFile = MemFile;

    fn new_writable_file(&self, name: &Path) -> IoResult<Self::WritableFile> {
        let mut files = self.files.lock().unwrap();
        let data = Arc::new(Mutex::new(Vec::new()));
        files.insert(name.to_path_buf(), data.clone());
        Ok(MemFile { data })
    }

    fn new_sequential_file(&self, name: &Path) -> IoResult<Self::SequencialFile> {
        let files = self.files.lock().unwrap();
        let data = files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        Ok(MemFile { data })
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_dir(&self, _path: &Path) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let env = MemEnv::new();
        let path = Path::new("store/records");

        let mut file = env.new_writable_file(path).unwrap();
        file.append(b"1:one\n").unwrap();
        file.append(b"2:two\n").unwrap();

        assert!(env.file_exists(path));

        let shared = env.clone();
        let mut file = shared.new_sequential_file(path).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "1:one\n2:two\n");
    }

    #[test]
    fn test_missing_file() {
        let env = MemEnv::new();
        assert!(!env.file_exists(Path::new("nope")));
        assert!(env.new_sequential_file(Path::new("nope")).is_err());
    }

    #[test]
    fn test_writable_file_replaces_contents() {
        let env = MemEnv::new();
        let path = Path::new("records");

        let mut file = env.new_writable_file(path).unwrap();
        file.append(b"old").unwrap();
        drop(file);

        let mut file = env.new_writable_file(path).unwrap();
        file.append(b"new").unwrap();
        drop(file);

        let mut content = String::new();
        let mut file = env.new_sequential_file(path).unwrap();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "new");
    }
}
