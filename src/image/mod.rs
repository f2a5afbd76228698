//! On-disk module images and their export tables.
//!
//! The loader's by-name lookups only find an export when the exact spelling is known. When every
//! configured spelling of an entry point fails, the locator falls back to reading the module's
//! export table directly: the file the module was loaded from is memory-mapped, parsed with
//! goblin, and its exported names are searched for a decorated variant of the wanted symbol.
//!
//! # Key Components
//!
//! - [`ModuleImage`] - A parsed PE or ELF module together with the data backing it
//! - [`Backend`] - Trait for the data source (a mapped file, or an owned buffer)
//! - [`physical::Physical`] - Memory-mapped file backend
//!
//! # Examples
//!
//! ```rust,no_run
//! use jvminject::image::ModuleImage;
//! use std::path::Path;
//!
//! let image = ModuleImage::from_file(Path::new("C:\\jdk\\bin\\server\\jvm.dll"))?;
//! if let Some(name) = image.find_export("JNI_GetCreatedJavaVMs") {
//!     println!("exported as {name}");
//! }
//! # Ok::<(), jvminject::Error>(())
//! ```

pub mod physical;

use std::path::Path;

use goblin::Object;
use ouroboros::self_referencing;

use crate::{
    runtime::undecorate,
    Error::{Empty, GoblinErr},
    Result,
};
use physical::Physical;

/// Backend trait for module data sources.
///
/// All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

impl Backend for Vec<u8> {
    fn data(&self) -> &[u8] {
        self.as_slice()
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// Object format of a [`ModuleImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Portable Executable
    Pe,
    /// Executable and Linkable Format
    Elf,
}

#[self_referencing]
/// A parsed module image.
///
/// Only the export table is consulted. Import tables, relocations and section data are never
/// read beyond what goblin parses up front.
pub struct ModuleImage {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed object, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    object: Object<'this>,
}

impl ModuleImage {
    /// Maps and parses the module at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be opened or mapped, is empty, or is neither a PE
    /// nor an ELF image.
    pub fn from_file(path: &Path) -> Result<ModuleImage> {
        let input = Physical::new(path)?;

        Self::load(input)
    }

    /// Parses a module held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or is neither a PE nor an ELF image.
    pub fn from_mem(data: Vec<u8>) -> Result<ModuleImage> {
        Self::load(data)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<ModuleImage> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        ModuleImage::try_new(data, |data| match Object::parse(data.data()) {
            Ok(object @ (Object::PE(_) | Object::Elf(_))) => Ok(object),
            Ok(_) => Err(malformed_error!("Module is neither a PE nor an ELF image")),
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the object format.
    #[must_use]
    pub fn kind(&self) -> ImageKind {
        self.with_object(|object| match object {
            Object::Elf(_) => ImageKind::Elf,
            _ => ImageKind::Pe,
        })
    }

    /// Returns the size of the image data in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.borrow_data().len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists the names of all exported functions.
    ///
    /// For PE images these are the named entries of the export directory. For ELF images these
    /// are the defined function symbols of the dynamic symbol table.
    #[must_use]
    pub fn export_names(&self) -> Vec<String> {
        self.with_object(|object| match object {
            Object::PE(pe) => pe
                .exports
                .iter()
                .filter_map(|export| export.name)
                .map(str::to_string)
                .collect(),
            Object::Elf(elf) => elf
                .dynsyms
                .iter()
                .filter(|symbol| symbol.is_function() && symbol.st_shndx != 0)
                .filter_map(|symbol| elf.dynstrtab.get_at(symbol.st_name))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Finds the exported spelling of `name`, decorated or not.
    ///
    /// Returns the first export whose undecorated form equals `name`.
    #[must_use]
    pub fn find_export(&self, name: &str) -> Option<String> {
        find_decorated(self.export_names().iter().map(String::as_str), name).map(str::to_string)
    }
}

/// Returns the first of `exports` whose undecorated form equals `name`.
///
/// # Examples
///
/// ```rust
/// use jvminject::image::find_decorated;
///
/// let exports = ["JNI_OnLoad", "_JNI_GetCreatedJavaVMs@12"];
/// assert_eq!(
///     find_decorated(exports, "JNI_GetCreatedJavaVMs"),
///     Some("_JNI_GetCreatedJavaVMs@12")
/// );
/// ```
pub fn find_decorated<'a>(
    exports: impl IntoIterator<Item = &'a str>,
    name: &str,
) -> Option<&'a str> {
    exports
        .into_iter()
        .find(|export| undecorate(export) == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::pe_exporting;

    #[test]
    fn test_find_decorated_prefers_first_match() {
        let exports = [
            "JVM_Sleep",
            "JNI_GetCreatedJavaVMs",
            "_JNI_GetCreatedJavaVMs@12",
        ];
        assert_eq!(
            find_decorated(exports, "JNI_GetCreatedJavaVMs"),
            Some("JNI_GetCreatedJavaVMs")
        );
        assert_eq!(find_decorated(exports, "JNI_CreateJavaVM"), None);
    }

    #[test]
    fn test_load_empty() {
        assert!(matches!(ModuleImage::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn test_load_invalid() {
        let data = vec![0xCC_u8; 512];
        if ModuleImage::from_mem(data).is_ok() {
            panic!("This should not load!")
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = ModuleImage::from_file(Path::new("/nonexistent/path/to/jvm.dll"));
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }

    #[test]
    fn test_pe_export_table() {
        let data = pe_exporting(&[
            "JNI_OnLoad",
            "_JNI_GetCreatedJavaVMs@12",
            "_JNI_CreateJavaVM@12",
        ]);
        let image = ModuleImage::from_mem(data).unwrap();

        assert_eq!(image.kind(), ImageKind::Pe);
        assert_eq!(
            image.export_names(),
            vec![
                "JNI_OnLoad".to_string(),
                "_JNI_GetCreatedJavaVMs@12".to_string(),
                "_JNI_CreateJavaVM@12".to_string()
            ]
        );
        assert_eq!(
            image.find_export("JNI_GetCreatedJavaVMs").as_deref(),
            Some("_JNI_GetCreatedJavaVMs@12")
        );
        assert_eq!(
            image.find_export("JNI_OnLoad").as_deref(),
            Some("JNI_OnLoad")
        );
        assert_eq!(image.find_export("JNI_GetDefaultJavaVMInitArgs"), None);
    }

    #[test]
    fn test_pe_without_exports() {
        let image = ModuleImage::from_mem(pe_exporting(&[])).unwrap();
        assert!(image.export_names().is_empty());
        assert_eq!(image.find_export("JNI_GetCreatedJavaVMs"), None);
    }

    #[test]
    #[cfg(any(windows, target_os = "linux"))]
    fn test_current_executable_kind() {
        let path = std::env::current_exe().unwrap();
        let image = ModuleImage::from_file(&path).unwrap();

        assert!(!image.is_empty());
        let expected = if cfg!(windows) {
            ImageKind::Pe
        } else {
            ImageKind::Elf
        };
        assert_eq!(image.kind(), expected);
    }
}
