//! Class Materializer: resolves the injector class, defining it only when it is not loaded yet.

use std::ffi::CString;

use strum::Display;
use tracing::{debug, info};

use crate::{
    diagnostics::Notifier,
    runtime::{ClassHandle, ExecutionEnvironment, Runtime},
    Error, Result,
};

/// How the injector class handle was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ClassOrigin {
    /// The class was already loaded, from an earlier injection into this process
    Reused,
    /// The class was defined from the embedded class file
    Defined,
}

/// Returns the injector class named `class_name`, defining it from `class_bytes` if the runtime
/// does not know it.
///
/// A reused class is announced on the advisory channel. The definition uses no class loader
/// and no protection domain.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if `class_name` contains a NUL byte, and
/// [`Error::DefinitionFailed`] if the class is neither found nor defined.
pub fn materialize<R, N>(
    runtime: &R,
    env: ExecutionEnvironment,
    class_name: &str,
    class_bytes: &[u8],
    notifier: &N,
) -> Result<(ClassHandle, ClassOrigin)>
where
    R: Runtime + ?Sized,
    N: Notifier + ?Sized,
{
    let name = CString::new(class_name).map_err(|_| Error::InvalidName(class_name.to_string()))?;

    if let Some(class) = runtime.find_class(env, &name) {
        notifier.notice("Injector class is already present in the runtime, reusing it");
        return Ok((class, ClassOrigin::Reused));
    }
    debug!(class_name, "injector class not loaded");

    match runtime.define_class(env, class_bytes) {
        Some(class) => {
            info!(class_name, len = class_bytes.len(), "defined injector class");
            Ok((class, ClassOrigin::Defined))
        }
        None => Err(Error::DefinitionFailed(format!(
            "{class_name} ({} bytes) was rejected by the runtime",
            class_bytes.len()
        ))),
    }
}
