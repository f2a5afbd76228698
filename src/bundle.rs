//! Embedded class definitions.
//!
//! The bytes injected into the runtime are fixed at build time: the injector entry-point class,
//! its canonical name, and an ordered set of class definitions handed to that entry point.
//! `build.rs` embeds them from the directory named by `JVMINJECT_CLASSES_DIR`:
//!
//! ```text
//! <dir>/injector.name      canonical binary name, e.g. com/example/Injector
//! <dir>/injector.class     the entry-point class
//! <dir>/classes/*.class    the bundle, embedded in file name order
//! ```
//!
//! Without that variable, stub resources are embedded: a placeholder name, an empty injector
//! class and no definitions.
//!
//! Order is significant and is preserved from embedding through marshalling.

use sha1::{Digest, Sha1};

use crate::{Error, Result};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/embedded.rs"));
}

/// One class file, together with the size it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDefinition<'a> {
    data: &'a [u8],
}

impl<'a> ClassDefinition<'a> {
    /// Creates a definition, checking that `declared` matches the buffer exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] if `declared != data.len()`. `index` is only used for the
    /// error report.
    pub fn new(index: usize, data: &'a [u8], declared: usize) -> Result<Self> {
        if declared != data.len() {
            return Err(Error::SizeMismatch {
                index,
                declared,
                actual: data.len(),
            });
        }
        Ok(ClassDefinition { data })
    }

    /// The class file bytes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// The declared size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for a zero-length definition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An ordered collection of [`ClassDefinition`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDefinitionSet<'a> {
    definitions: Vec<ClassDefinition<'a>>,
}

impl<'a> ClassDefinitionSet<'a> {
    /// Builds a set from parallel lists of buffers and declared sizes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BundleMismatch`] if the lists differ in length, or
    /// [`Error::SizeMismatch`] if any declared size differs from its buffer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jvminject::bundle::ClassDefinitionSet;
    ///
    /// let data: [&[u8]; 2] = [&[1, 2, 3], &[4]];
    /// let set = ClassDefinitionSet::from_parts(&data, &[3, 1])?;
    /// assert_eq!(set.len(), 2);
    /// assert_eq!(set.get(1).unwrap().bytes(), &[4]);
    /// # Ok::<(), jvminject::Error>(())
    /// ```
    pub fn from_parts(data: &[&'a [u8]], sizes: &[usize]) -> Result<Self> {
        if data.len() != sizes.len() {
            return Err(Error::BundleMismatch {
                definitions: data.len(),
                sizes: sizes.len(),
            });
        }

        let definitions = data
            .iter()
            .zip(sizes)
            .enumerate()
            .map(|(index, (data, declared))| ClassDefinition::new(index, data, *declared))
            .collect::<Result<Vec<_>>>()?;

        Ok(ClassDefinitionSet { definitions })
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if the set holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the definition at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ClassDefinition<'a>> {
        self.definitions.get(index)
    }

    /// Iterates the definitions in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ClassDefinition<'a>> {
        self.definitions.iter()
    }

    /// Total number of bytes across all definitions.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.definitions.iter().map(ClassDefinition::len).sum()
    }

    /// SHA-1 over the ordered definitions, each prefixed by its length.
    ///
    /// Identifies a particular build of the bundle in logs; reordering definitions changes it.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 20] {
        let mut hasher = Sha1::new();
        for definition in &self.definitions {
            hasher.update((definition.len() as u64).to_le_bytes());
            hasher.update(definition.bytes());
        }
        hasher.finalize().into()
    }

    /// [`fingerprint`](Self::fingerprint) as lowercase hex.
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

/// The build-time resources of one injection.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedBundle<'a> {
    /// Canonical binary name of the injector class, used to detect a previous injection.
    pub class_name: &'a str,
    /// Class file of the injector entry-point class.
    pub injector_class: &'a [u8],
    /// Buffers of the bundle's class definitions, in order.
    pub classes: &'a [&'a [u8]],
    /// Declared size of each buffer in `classes`.
    pub class_sizes: &'a [usize],
}

impl<'a> EmbeddedBundle<'a> {
    /// Validates the parallel lists and returns the bundle's definitions.
    ///
    /// # Errors
    ///
    /// See [`ClassDefinitionSet::from_parts`].
    pub fn definitions(&self) -> Result<ClassDefinitionSet<'a>> {
        ClassDefinitionSet::from_parts(self.classes, self.class_sizes)
    }
}

/// Returns the bundle embedded at build time.
#[must_use]
pub fn embedded() -> EmbeddedBundle<'static> {
    EmbeddedBundle {
        class_name: generated::INJECTOR_CLASS_NAME,
        injector_class: generated::INJECTOR_CLASS,
        classes: generated::CLASS_DATA,
        class_sizes: generated::CLASS_SIZES,
    }
}
