//! Typed wrappers for the opaque foreign references handled by the pipeline.
//!
//! Every wrapper is a `#[repr(transparent)]` non-null pointer, so a wrapper has exactly the ABI
//! of the reference it carries, while the distinct types keep an environment from being passed
//! where a runtime instance is expected, or a byte array where a class is.
//!
//! None of the wrappers are `Send` or `Sync`. A runtime reference is only meaningful on the
//! injection thread, and an [`ExecutionEnvironment`] is only valid on the thread it was bound to.

use std::{ffi::c_void, ptr::NonNull};

use jni_sys::{JNIEnv, JavaVM, _jmethodID, _jobject};

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident => $target:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(NonNull<$target>);

        impl $name {
            /// Wraps a raw reference, returning `None` for null.
            #[must_use]
            pub fn from_raw(raw: *mut $target) -> Option<Self> {
                NonNull::new(raw).map(Self)
            }

            /// Returns the wrapped raw reference.
            #[must_use]
            pub fn as_raw(self) -> *mut $target {
                self.0.as_ptr()
            }

            /// Returns the address of the wrapped reference.
            #[must_use]
            pub fn addr(self) -> usize {
                self.0.as_ptr() as usize
            }
        }
    };
}

opaque_handle!(
    /// A loaded module, as returned by the host's library loader.
    LibraryHandle => c_void
);

opaque_handle!(
    /// The address of a symbol exported by a [`LibraryHandle`].
    ExportAddress => c_void
);

opaque_handle!(
    /// The process-wide runtime instance. Discovered when possible, never destroyed.
    RuntimeInstance => JavaVM
);

opaque_handle!(
    /// A thread-bound execution environment of a [`RuntimeInstance`].
    ExecutionEnvironment => JNIEnv
);

opaque_handle!(
    /// A class reference living inside the runtime.
    ClassHandle => _jobject
);

opaque_handle!(
    /// A resolved static method of a [`ClassHandle`].
    MethodHandle => _jmethodID
);

opaque_handle!(
    /// A runtime-native array of object references.
    ObjectArray => _jobject
);

opaque_handle!(
    /// A runtime-native array of raw bytes.
    ByteArray => _jobject
);
