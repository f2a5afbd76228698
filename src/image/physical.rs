//! Memory-mapped file backend for module images.
//!
//! Runtime libraries are tens of megabytes, of which the export lookup touches only the headers
//! and the export directory. Mapping the file lets the OS page in just those parts.

use super::Backend;
use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// A backend that maps a module file read-only into the address space.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Maps the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_physical_invalid_file_path() {
        let result = Physical::new(PathBuf::from("/nonexistent/path/to/jvm.dll"));
        match result {
            Err(crate::Error::FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn test_physical_maps_whole_file() {
        let temp_path = std::env::temp_dir().join("jvminject_physical_whole.dll");
        let test_data = crate::test::pe_exporting(&["JNI_OnLoad"]);
        std::fs::write(&temp_path, &test_data).unwrap();

        let physical = Physical::new(&temp_path).unwrap();
        assert_eq!(physical.len(), test_data.len());
        assert_eq!(physical.data(), test_data.as_slice());
        assert_eq!(&physical.data()[..2], b"MZ");

        drop(physical);
        std::fs::remove_file(&temp_path).unwrap();
    }
}
