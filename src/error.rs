use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The injection pipeline is strictly fail-fast: every variant raised by a pipeline stage ends
/// the session. The variants are grouped by the stage that raises them.
///
/// # Error Categories
///
/// ## Pipeline Errors
/// - [`Error::RuntimeNotFound`] - No runtime library handle could be obtained
/// - [`Error::SymbolNotFound`] - A library was found but no instance could be enumerated or created
/// - [`Error::AttachFailed`] - The calling thread could not be bound to the runtime
/// - [`Error::DefinitionFailed`] - The injector class could neither be found nor defined
/// - [`Error::MarshalFailed`] - Building the native payload array failed
/// - [`Error::MethodNotFound`] - The static entry method could not be resolved
/// - [`Error::InvocationFailed`] - Reserved, the hosted call is not checked for a pending error
///
/// ## Bundle Errors
/// - [`Error::BundleMismatch`] - Definition count differs from the declared sizes count
/// - [`Error::SizeMismatch`] - A definition's declared size differs from its buffer
/// - [`Error::InvalidName`] - A configured name can not be passed across the foreign boundary
///
/// ## Image Errors
/// - [`Error::Empty`], [`Error::Malformed`]
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE/ELF parsing errors from goblin crate
///
/// # Examples
///
/// ```rust
/// use jvminject::{bundle::ClassDefinitionSet, Error};
///
/// let data: [&[u8]; 1] = [&[0xCA, 0xFE]];
/// match ClassDefinitionSet::from_parts(&data, &[2, 4]) {
///     Err(Error::BundleMismatch { definitions, sizes }) => {
///         assert_eq!((definitions, sizes), (1, 2));
///     }
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Pipeline Errors
    /// No runtime library handle could be obtained by any discovery strategy.
    ///
    /// `tried` names every strategy that was attempted, in order.
    #[error("Can't locate the runtime library (tried: {tried})")]
    RuntimeNotFound {
        /// Comma separated list of the attempted strategies
        tried: String,
    },

    /// A runtime library handle was obtained, but neither enumerating existing instances nor
    /// bootstrapping a new one succeeded.
    #[error("No usable runtime instance in '{library}': {detail}")]
    SymbolNotFound {
        /// Name of the library the lookup was performed in
        library: String,
        /// What failed during enumeration and bootstrap
        detail: String,
    },

    /// The calling thread could not be bound to the runtime instance.
    ///
    /// The associated value is the last status code reported by the runtime.
    #[error("Can't obtain an execution environment (status {0})")]
    AttachFailed(i32),

    /// The injector class was not present and defining it failed.
    #[error("Failed to define injector class: {0}")]
    DefinitionFailed(String),

    /// An allocation or copy step failed while building the payload array.
    #[error("Failed to marshal class definitions: {0}")]
    MarshalFailed(String),

    /// The static entry method could not be resolved on the injector class.
    #[error("Failed to find method {name}{signature}")]
    MethodNotFound {
        /// Configured method name
        name: String,
        /// Configured JNI method descriptor
        signature: String,
    },

    /// The hosted entry method signalled an error.
    ///
    /// Never raised at the moment: the runtime is not inspected for a pending exception after
    /// the entry point returns.
    #[error("Injector entry point failed: {0}")]
    InvocationFailed(String),

    // Bundle Errors
    /// The number of class definitions differs from the number of declared sizes.
    #[error("Bundle has {definitions} definitions but {sizes} declared sizes")]
    BundleMismatch {
        /// Number of definition buffers
        definitions: usize,
        /// Number of declared sizes
        sizes: usize,
    },

    /// A definition's declared size differs from the length of its buffer.
    #[error("Definition {index} declares {declared} bytes but holds {actual}")]
    SizeMismatch {
        /// Position of the definition inside its set
        index: usize,
        /// The declared size
        declared: usize,
        /// The actual buffer length
        actual: usize,
    },

    /// A configured name contains an interior NUL byte.
    #[error("Invalid name '{0}'")]
    InvalidName(String),

    // Image Errors
    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The module image is damaged and could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE/ELF parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_records_location() {
        let error = malformed_error!("bad export table at {}", 12);
        match error {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad export table at 12");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_display_carries_context() {
        let error = Error::MethodNotFound {
            name: "inject".into(),
            signature: "([[B)V".into(),
        };
        assert_eq!(error.to_string(), "Failed to find method inject([[B)V");

        let error = Error::RuntimeNotFound {
            tried: "candidate-paths, loaded-module".into(),
        };
        assert!(error.to_string().contains("candidate-paths"));
    }
}
