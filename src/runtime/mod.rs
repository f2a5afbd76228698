//! Foreign interfaces of the injection pipeline.
//!
//! The pipeline talks to two collaborators, both passed explicitly into every stage:
//!
//! - [`Host`] - the process and module model of the operating system: loading a library,
//!   looking up an already-loaded one, enumerating loaded modules and resolving exports.
//! - [`Runtime`] - the managed runtime's native interface: the invocation entry points that
//!   enumerate or create runtime instances, thread binding, class lookup and definition,
//!   array construction and static method invocation.
//!
//! Production code uses [`JniRuntime`] and, on Windows, [`WindowsHost`]. Tests substitute
//! recording mocks for both.
//!
//! All references crossing these traits are the typed wrappers of [`handles`].

pub mod handles;
mod jni;
#[cfg(windows)]
mod windows;

use std::{ffi::CStr, fmt, path::PathBuf};

pub use handles::{
    ByteArray, ClassHandle, ExecutionEnvironment, ExportAddress, LibraryHandle, MethodHandle,
    ObjectArray, RuntimeInstance,
};
pub use jni::JniRuntime;
#[cfg(windows)]
pub use windows::WindowsHost;

use crate::config::BootstrapConfig;

/// Spelling under which an entry point may be exported.
///
/// Runtime builds have exported their invocation entry points undecorated, with stdcall
/// decoration (`_Name@12`), or reachable only by ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportName {
    /// Lookup by exact symbol name
    Named(String),
    /// Lookup by export ordinal
    Ordinal(u16),
}

impl ExportName {
    /// Creates a by-name lookup.
    pub fn named(name: impl Into<String>) -> Self {
        ExportName::Named(name.into())
    }
}

impl fmt::Display for ExportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportName::Named(name) => f.write_str(name),
            ExportName::Ordinal(ordinal) => write!(f, "#{ordinal}"),
        }
    }
}

/// Strips linker decoration from an exported symbol name.
///
/// Removes one leading underscore and a trailing stdcall `@<digits>` suffix, so
/// `_JNI_GetCreatedJavaVMs@12` becomes `JNI_GetCreatedJavaVMs`. Anything else is returned
/// unchanged.
///
/// # Examples
///
/// ```rust
/// use jvminject::runtime::undecorate;
///
/// assert_eq!(undecorate("_JNI_CreateJavaVM@12"), "JNI_CreateJavaVM");
/// assert_eq!(undecorate("JNI_CreateJavaVM"), "JNI_CreateJavaVM");
/// assert_eq!(undecorate("_tail@"), "tail@");
/// ```
#[must_use]
pub fn undecorate(name: &str) -> &str {
    let name = name.strip_prefix('_').unwrap_or(name);
    match name.rsplit_once('@') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}

/// A module loaded into the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// File name of the module, e.g. `jvm.dll`
    pub name: String,
    /// Full path the module was loaded from
    pub path: PathBuf,
    /// Handle of the loaded module
    pub handle: LibraryHandle,
}

/// The process and module model the locator runs against.
pub trait Host {
    /// Loads a library from `path`, returning `None` if it can not be loaded.
    fn load_library(&self, path: &str) -> Option<LibraryHandle>;

    /// Returns the handle of an already-loaded library named `name`.
    fn loaded_library(&self, name: &str) -> Option<LibraryHandle>;

    /// Enumerates every module currently loaded into the process.
    fn loaded_modules(&self) -> Vec<ModuleEntry>;

    /// Resolves an export of `library`.
    fn resolve_export(&self, library: LibraryHandle, export: &ExportName) -> Option<ExportAddress>;

    /// Returns the path `library` was loaded from.
    fn module_path(&self, library: LibraryHandle) -> Option<PathBuf>;
}

/// Answer of the runtime when asked for the current thread's environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvQuery {
    /// The thread is attached, here is its environment
    Bound(ExecutionEnvironment),
    /// The thread is not attached to the instance
    Detached,
    /// Any other status code
    Failed(i32),
}

/// The native surface of the managed runtime.
///
/// Methods mirror single foreign calls and make no decisions of their own: retries, fallbacks
/// and error classification belong to the pipeline stages.
pub trait Runtime {
    /// Calls an enumerate-created-instances entry point and returns the first instance, if any.
    ///
    /// # Errors
    ///
    /// Returns the status code if the entry point reports failure.
    fn created_instance(
        &self,
        entry: ExportAddress,
    ) -> std::result::Result<Option<RuntimeInstance>, i32>;

    /// Calls a create-instance entry point with the given bootstrap configuration.
    ///
    /// # Errors
    ///
    /// Returns the status code if no instance was created.
    fn create_instance(
        &self,
        entry: ExportAddress,
        config: &BootstrapConfig,
    ) -> std::result::Result<RuntimeInstance, i32>;

    /// Queries the environment bound to the calling thread.
    fn get_env(&self, instance: RuntimeInstance, version: i32) -> EnvQuery;

    /// Attaches the calling thread, returning its environment.
    ///
    /// # Errors
    ///
    /// Returns the status code if attaching failed.
    fn attach_current_thread(
        &self,
        instance: RuntimeInstance,
    ) -> std::result::Result<Option<ExecutionEnvironment>, i32>;

    /// Looks up a loaded class by its binary name (`a/b/C` or an array descriptor such as `[B`).
    fn find_class(&self, env: ExecutionEnvironment, name: &CStr) -> Option<ClassHandle>;

    /// Defines a class from its class-file bytes, without a loader or protection domain.
    fn define_class(&self, env: ExecutionEnvironment, bytes: &[u8]) -> Option<ClassHandle>;

    /// Allocates an object array of `len` elements of type `element`, initialised to null.
    fn new_object_array(
        &self,
        env: ExecutionEnvironment,
        len: i32,
        element: ClassHandle,
    ) -> Option<ObjectArray>;

    /// Allocates a byte array of `len` elements.
    fn new_byte_array(&self, env: ExecutionEnvironment, len: i32) -> Option<ByteArray>;

    /// Copies `bytes` to the start of `array`. Returns `false` if the copy was rejected.
    fn set_byte_array_region(
        &self,
        env: ExecutionEnvironment,
        array: ByteArray,
        bytes: &[u8],
    ) -> bool;

    /// Stores `value` at `index` of `array`. Returns `false` if the store was rejected.
    fn set_object_array_element(
        &self,
        env: ExecutionEnvironment,
        array: ObjectArray,
        index: i32,
        value: ByteArray,
    ) -> bool;

    /// Resolves a static method by name and JNI descriptor.
    fn get_static_method_id(
        &self,
        env: ExecutionEnvironment,
        class: ClassHandle,
        name: &CStr,
        signature: &CStr,
    ) -> Option<MethodHandle>;

    /// Invokes a static `void` method taking one object-array argument, blocking until it
    /// returns.
    fn call_static_void_method(
        &self,
        env: ExecutionEnvironment,
        class: ClassHandle,
        method: MethodHandle,
        argument: ObjectArray,
    );
}
