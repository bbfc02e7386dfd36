use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::env::{self, Env};
use crate::error::{Error, Result};
use crate::level::{GeometricLevels, LevelGenerator};
use crate::list::SkipList;
use crate::options::Options;
use crate::snapshot::{DelimitedCodec, RecordCodec, SnapshotWriter};

/// Concurrent ordered key-value store with snapshot persistence.
///
/// All operations are safe to call from any thread. `dump` and `load`
/// serialize against each other through the store's file mutex but run
/// alongside live `insert`/`search`/`delete` traffic.
pub struct SkipStore<K, V, E: Env> {
    list: SkipList<K, V>,
    env: E,
    codec: Arc<dyn RecordCodec<K, V>>,
    dump_path: PathBuf,
    /// Serializes snapshot writers and readers against each other.
    file_mutex: Mutex<()>,
}

impl<K: Ord + 'static, V: 'static, E: Env> SkipStore<K, V, E> {
    pub fn new(options: Options, env: E) -> Result<SkipStore<K, V, E>>
    where
        DelimitedCodec: RecordCodec<K, V>,
    {
        let codec = Arc::new(DelimitedCodec::new(options.delimiter));
        Self::with_codec(options, env, codec)
    }

    pub fn with_codec(
        options: Options,
        env: E,
        codec: Arc<dyn RecordCodec<K, V>>,
    ) -> Result<SkipStore<K, V, E>> {
        Self::with_levels(options, env, codec, Arc::new(GeometricLevels::new()))
    }

    pub fn with_levels(
        options: Options,
        env: E,
        codec: Arc<dyn RecordCodec<K, V>>,
        levels: Arc<dyn LevelGenerator>,
    ) -> Result<SkipStore<K, V, E>> {
        if options.max_level < 1 {
            return Err(Error::InvalidArgument(format!(
                "max_level must be at least 1, got {}",
                options.max_level
            )));
        }
        Ok(SkipStore {
            list: SkipList::new(options.max_level, levels),
            env,
            codec,
            dump_path: options.dump_path,
            file_mutex: Mutex::new(()),
        })
    }

    /// First writer wins: a later insert of the same key leaves the stored
    /// value untouched and reports `AlreadyExist`.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        if self.list.insert(key, value) {
            Ok(())
        } else {
            Err(Error::AlreadyExist)
        }
    }

    pub fn search(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.list.search(key)
    }

    /// Removes the key if present; missing keys are a silent no-op.
    pub fn delete(&self, key: &K) {
        self.list.delete(key)
    }

    /// Stale-tolerant element count; not a linearization point.
    pub fn size(&self) -> usize {
        self.list.len()
    }

    /// Writes every pair to the snapshot file, one record per line. The walk
    /// pins only the window currently being written, so the result is a
    /// consistent prefix rather than a point-in-time copy.
    pub fn dump(&self) -> Result<()> {
        let _file = self.file_mutex.lock().unwrap();

        if let Some(dir) = self.dump_path.parent() {
            if !dir.as_os_str().is_empty() && !self.env.file_exists(dir) {
                self.env.create_dir(dir)?;
            }
        }
        let file = self.env.new_writable_file(&self.dump_path)?;
        let mut writer = SnapshotWriter::new(file);
        self.list
            .scan(|key, value| Ok(writer.add_record(&self.codec.encode(key, value))?))?;
        writer.sync()?;
        Ok(())
    }

    /// Replays the snapshot file through the normal insert path. Malformed
    /// lines are skipped; keys already present keep their stored value.
    pub fn load(&self) -> Result<()> {
        let _file = self.file_mutex.lock().unwrap();

        let mut content = String::new();
        env::read_file_to_string(&self.env, &self.dump_path, &mut content)?;
        for line in content.lines() {
            if let Some((key, value)) = self.codec.decode(line) {
                self.list.insert(key, value);
            }
        }
        Ok(())
    }
}
