use std::path::{Path, PathBuf};

/// Driver-level failure: the file could not be brought into memory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot load {path:?}: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a whole region file into memory. The decoder never touches the
/// filesystem itself.
pub fn load_whole_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::FileUnavailable {
        path: path.to_path_buf(),
        source,
    })
}
