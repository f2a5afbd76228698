//! Environment Binder: obtains the calling thread's execution environment.
//!
//! The environment is never released and the thread is never detached. The injection thread
//! exits right after dispatch, which ends the binding.

use jni_sys::{JNI_EDETACHED, JNI_ERR};
use tracing::{debug, info};

use crate::{
    config::AttachMode,
    runtime::{EnvQuery, ExecutionEnvironment, Runtime, RuntimeInstance},
    Error, Result,
};

/// Returns an environment bound to the calling thread.
///
/// With [`AttachMode::QueryFirst`] the bound environment is queried and the thread is attached
/// only if the runtime reports it detached. With [`AttachMode::AttachFirst`] the thread is
/// attached unconditionally, which the runtime treats as a no-op for an attached thread, and the
/// binding is confirmed by a query.
///
/// Calling this again on the same thread yields the same binding.
///
/// # Errors
///
/// Returns [`Error::AttachFailed`] with the last status code if no environment is obtained.
pub fn bind<R: Runtime + ?Sized>(
    runtime: &R,
    instance: RuntimeInstance,
    version: i32,
    mode: AttachMode,
) -> Result<ExecutionEnvironment> {
    match mode {
        AttachMode::QueryFirst => match runtime.get_env(instance, version) {
            EnvQuery::Bound(env) => {
                debug!("thread already attached");
                Ok(env)
            }
            EnvQuery::Detached => attach(runtime, instance),
            EnvQuery::Failed(status) => Err(Error::AttachFailed(status)),
        },
        AttachMode::AttachFirst => {
            attach(runtime, instance)?;
            match runtime.get_env(instance, version) {
                EnvQuery::Bound(env) => Ok(env),
                EnvQuery::Detached => Err(Error::AttachFailed(JNI_EDETACHED)),
                EnvQuery::Failed(status) => Err(Error::AttachFailed(status)),
            }
        }
    }
}

fn attach<R: Runtime + ?Sized>(
    runtime: &R,
    instance: RuntimeInstance,
) -> Result<ExecutionEnvironment> {
    match runtime.attach_current_thread(instance) {
        Ok(Some(env)) => {
            info!("attached injection thread");
            Ok(env)
        }
        Ok(None) => Err(Error::AttachFailed(JNI_ERR)),
        Err(status) => Err(Error::AttachFailed(status)),
    }
}

#[cfg(test)]
mod tests {
    use jni_sys::{JNI_EVERSION, JNI_VERSION_1_8};

    use super::*;
    use crate::test::MockRuntime;

    fn instance() -> RuntimeInstance {
        RuntimeInstance::from_raw(0x7000 as *mut _).unwrap()
    }

    #[test]
    fn test_query_first_reuses_bound_env() {
        let runtime = MockRuntime::new().with_attached_env(0xE0);
        let env = bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst).unwrap();

        assert_eq!(env.addr(), 0xE0);
        assert_eq!(runtime.attach_count(), 0);
    }

    #[test]
    fn test_query_first_attaches_detached_thread() {
        let runtime = MockRuntime::new().with_attachable_env(0xE1);
        let env = bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst).unwrap();

        assert_eq!(env.addr(), 0xE1);
        assert_eq!(runtime.attach_count(), 1);
    }

    #[test]
    fn test_attach_first_confirms_binding() {
        let runtime = MockRuntime::new().with_attached_env(0xE2);
        let env = bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::AttachFirst).unwrap();

        assert_eq!(env.addr(), 0xE2);
        assert_eq!(runtime.attach_count(), 1);
    }

    #[test]
    fn test_modes_agree_on_detached_thread() {
        let query = MockRuntime::new().with_attachable_env(0xE3);
        let attach = MockRuntime::new().with_attachable_env(0xE3);

        let a = bind(&query, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst).unwrap();
        let b = bind(&attach, instance(), JNI_VERSION_1_8, AttachMode::AttachFirst).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bind_is_idempotent() {
        for mode in [AttachMode::QueryFirst, AttachMode::AttachFirst] {
            let runtime = MockRuntime::new().with_attachable_env(0xE4);

            let first = bind(&runtime, instance(), JNI_VERSION_1_8, mode).unwrap();
            let second = bind(&runtime, instance(), JNI_VERSION_1_8, mode).unwrap();
            let third = bind(&runtime, instance(), JNI_VERSION_1_8, mode).unwrap();

            assert_eq!(first, second);
            assert_eq!(second, third);
        }
    }

    #[test]
    fn test_attach_failure_status() {
        let runtime = MockRuntime::new().with_attach_status(-3);
        match bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst) {
            Err(Error::AttachFailed(status)) => assert_eq!(status, -3),
            other => panic!("Expected AttachFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_query_failure_does_not_attach() {
        let runtime = MockRuntime::new().with_env_status(JNI_EVERSION);
        match bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst) {
            Err(Error::AttachFailed(status)) => assert_eq!(status, JNI_EVERSION),
            other => panic!("Expected AttachFailed, got {other:?}"),
        }
        assert_eq!(runtime.attach_count(), 0);
    }

    #[test]
    fn test_null_environment_is_failure() {
        let runtime = MockRuntime::new().with_null_attach();
        assert!(matches!(
            bind(&runtime, instance(), JNI_VERSION_1_8, AttachMode::QueryFirst),
            Err(Error::AttachFailed(JNI_ERR))
        ));
    }
}
