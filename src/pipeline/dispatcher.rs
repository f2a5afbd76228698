//! Invocation Dispatcher: resolves the static entry method and calls it with the payload.

use std::ffi::CString;

use tracing::info;

use crate::{
    config::EntryPoint,
    pipeline::marshaller::Payload,
    runtime::{ClassHandle, ExecutionEnvironment, Runtime},
    Error, Result,
};

/// Invokes `entry_point` on `class` with `payload`, blocking until it returns.
///
/// The runtime is not checked for a pending exception afterwards, so an entry method that
/// throws still counts as dispatched.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if the name or signature contains a NUL byte, and
/// [`Error::MethodNotFound`] if the method can not be resolved.
pub fn dispatch<R: Runtime + ?Sized>(
    runtime: &R,
    env: ExecutionEnvironment,
    class: ClassHandle,
    entry_point: &EntryPoint,
    payload: &Payload,
) -> Result<()> {
    let name = c_string(&entry_point.name)?;
    let signature = c_string(&entry_point.signature)?;

    let method = runtime
        .get_static_method_id(env, class, &name, &signature)
        .ok_or_else(|| Error::MethodNotFound {
            name: entry_point.name.clone(),
            signature: entry_point.signature.clone(),
        })?;

    info!(
        method = entry_point.name.as_str(),
        definitions = payload.len,
        "invoking entry point"
    );
    runtime.call_static_void_method(env, class, method, payload.array);
    Ok(())
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidName(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ObjectArray;
    use crate::test::MockRuntime;

    fn env() -> ExecutionEnvironment {
        ExecutionEnvironment::from_raw(0xE0 as *mut _).unwrap()
    }

    fn class() -> ClassHandle {
        ClassHandle::from_raw(0xC0 as *mut _).unwrap()
    }

    fn payload() -> Payload {
        Payload {
            array: ObjectArray::from_raw(0xA0 as *mut _).unwrap(),
            len: 0,
        }
    }

    #[test]
    fn test_invokes_once_with_payload() {
        let runtime = MockRuntime::new().with_method("inject", "([[B)V");

        dispatch(&runtime, env(), class(), &EntryPoint::default(), &payload()).unwrap();

        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].class, class());
        assert_eq!(invocations[0].argument, payload().array);
    }

    #[test]
    fn test_wrong_signature_is_method_not_found() {
        let runtime = MockRuntime::new().with_method("inject", "([B)V");

        match dispatch(&runtime, env(), class(), &EntryPoint::default(), &payload()) {
            Err(error @ Error::MethodNotFound { .. }) => {
                assert_eq!(error.to_string(), "Failed to find method inject([[B)V");
            }
            other => panic!("Expected MethodNotFound, got {other:?}"),
        }
        assert!(runtime.invocations().is_empty());
    }

    #[test]
    fn test_throwing_entry_point_still_dispatched() {
        let runtime = MockRuntime::new()
            .with_method("inject", "([[B)V")
            .with_throwing_entry_point();

        assert!(dispatch(&runtime, env(), class(), &EntryPoint::default(), &payload()).is_ok());
        assert_eq!(runtime.invocations().len(), 1);
        assert!(runtime.exception_pending());
    }
}
