use std::path::PathBuf;

#[derive(Clone)]
pub struct Options {
    /// Highest tower level a node may reach. Must be at least 1.
    pub max_level: usize,

    /// Where `dump` writes and `load` reads the snapshot.
    pub dump_path: PathBuf,

    /// Separates key from value in snapshot records.
    pub delimiter: char,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            max_level: 12,
            dump_path: PathBuf::from("store/dumpFile"),
            delimiter: ':',
        }
    }
}
