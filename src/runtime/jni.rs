//! The production [`Runtime`] backed by the JNI invocation and native interfaces.

use std::{
    ffi::{c_char, c_void, CStr, CString},
    ptr,
};

use jni_sys::{
    jint, jsize, jvalue, JNIEnv, JavaVM, JavaVMInitArgs, JavaVMOption, JNI_EDETACHED, JNI_EINVAL,
    JNI_ERR, JNI_FALSE, JNI_OK, JNI_TRUE,
};
use tracing::trace;

use super::{
    ByteArray, ClassHandle, EnvQuery, ExecutionEnvironment, ExportAddress, MethodHandle,
    ObjectArray, Runtime, RuntimeInstance,
};
use crate::config::BootstrapConfig;

type GetCreatedJavaVMs = unsafe extern "system" fn(*mut *mut JavaVM, jsize, *mut jsize) -> jint;
type CreateJavaVM =
    unsafe extern "system" fn(*mut *mut JavaVM, *mut *mut c_void, *mut c_void) -> jint;

/// Calls a function of the JNI native interface table, yielding `None` if the slot is empty.
macro_rules! env_call {
    ($env:expr, $function:ident $(, $arg:expr)*) => {{
        let raw: *mut JNIEnv = $env.as_raw();
        (**raw).$function.map(|function| function(raw $(, $arg)*))
    }};
}

/// Calls a function of the JNI invocation interface table, yielding `None` if the slot is empty.
macro_rules! vm_call {
    ($vm:expr, $function:ident $(, $arg:expr)*) => {{
        let raw: *mut JavaVM = $vm.as_raw();
        (**raw).$function.map(|function| function(raw $(, $arg)*))
    }};
}

/// [`Runtime`] implementation performing real JNI calls.
///
/// Stateless; every handle it receives must originate from the runtime it calls into, and
/// every environment must belong to the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct JniRuntime;

impl JniRuntime {
    /// Creates the runtime adapter.
    #[must_use]
    pub fn new() -> Self {
        JniRuntime
    }

    /// Clears a pending exception raised by the last call, returning whether there was one.
    fn clear_pending(env: ExecutionEnvironment) -> bool {
        unsafe {
            let pending = env_call!(env, ExceptionCheck).unwrap_or(JNI_FALSE) != JNI_FALSE;
            if pending {
                env_call!(env, ExceptionClear);
            }
            pending
        }
    }

    /// Returns whether the last call left an exception pending.
    fn is_pending(env: ExecutionEnvironment) -> bool {
        unsafe { env_call!(env, ExceptionCheck).unwrap_or(JNI_TRUE) != JNI_FALSE }
    }
}

impl Runtime for JniRuntime {
    fn created_instance(
        &self,
        entry: ExportAddress,
    ) -> std::result::Result<Option<RuntimeInstance>, i32> {
        let function =
            unsafe { std::mem::transmute::<*mut c_void, GetCreatedJavaVMs>(entry.as_raw()) };

        let mut instances: [*mut JavaVM; 1] = [ptr::null_mut()];
        let mut count: jsize = 0;
        let status = unsafe { function(instances.as_mut_ptr(), 1, &mut count) };
        trace!(status, count, "enumerated created instances");

        if status != JNI_OK {
            return Err(status);
        }
        if count < 1 {
            return Ok(None);
        }
        Ok(RuntimeInstance::from_raw(instances[0]))
    }

    fn create_instance(
        &self,
        entry: ExportAddress,
        config: &BootstrapConfig,
    ) -> std::result::Result<RuntimeInstance, i32> {
        let function = unsafe { std::mem::transmute::<*mut c_void, CreateJavaVM>(entry.as_raw()) };

        let strings = config
            .options
            .iter()
            .map(|option| CString::new(option.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| JNI_EINVAL)?;
        let mut options = strings
            .iter()
            .map(|option| JavaVMOption {
                optionString: option.as_ptr() as *mut c_char,
                extraInfo: ptr::null_mut(),
            })
            .collect::<Vec<_>>();

        let mut args = JavaVMInitArgs {
            version: config.version,
            nOptions: jint::try_from(options.len()).map_err(|_| JNI_EINVAL)?,
            options: options.as_mut_ptr(),
            ignoreUnrecognized: if config.ignore_unrecognized {
                JNI_TRUE
            } else {
                JNI_FALSE
            },
        };

        let mut vm: *mut JavaVM = ptr::null_mut();
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe {
            function(
                &mut vm,
                &mut env,
                ptr::addr_of_mut!(args).cast::<c_void>(),
            )
        };
        trace!(status, "create instance returned");

        match RuntimeInstance::from_raw(vm) {
            Some(instance) if status == JNI_OK => Ok(instance),
            _ if status == JNI_OK => Err(JNI_ERR),
            _ => Err(status),
        }
    }

    fn get_env(&self, instance: RuntimeInstance, version: i32) -> EnvQuery {
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe { vm_call!(instance, GetEnv, &mut env, version) }.unwrap_or(JNI_ERR);

        match status {
            JNI_OK => match ExecutionEnvironment::from_raw(env.cast()) {
                Some(env) => EnvQuery::Bound(env),
                None => EnvQuery::Failed(status),
            },
            JNI_EDETACHED => EnvQuery::Detached,
            other => EnvQuery::Failed(other),
        }
    }

    fn attach_current_thread(
        &self,
        instance: RuntimeInstance,
    ) -> std::result::Result<Option<ExecutionEnvironment>, i32> {
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe {
            vm_call!(instance, AttachCurrentThread, &mut env, ptr::null_mut())
        }
        .unwrap_or(JNI_ERR);

        if status != JNI_OK {
            return Err(status);
        }
        Ok(ExecutionEnvironment::from_raw(env.cast()))
    }

    fn find_class(&self, env: ExecutionEnvironment, name: &CStr) -> Option<ClassHandle> {
        let class = unsafe { env_call!(env, FindClass, name.as_ptr()) }
            .and_then(ClassHandle::from_raw);

        // A miss raises NoClassDefFoundError, which must not leak into the next call.
        if class.is_none() && Self::clear_pending(env) {
            trace!(?name, "class lookup missed");
        }
        class
    }

    fn define_class(&self, env: ExecutionEnvironment, bytes: &[u8]) -> Option<ClassHandle> {
        let len = jsize::try_from(bytes.len()).ok()?;
        unsafe {
            env_call!(
                env,
                DefineClass,
                ptr::null(),
                ptr::null_mut(),
                bytes.as_ptr().cast(),
                len
            )
        }
        .and_then(ClassHandle::from_raw)
    }

    fn new_object_array(
        &self,
        env: ExecutionEnvironment,
        len: i32,
        element: ClassHandle,
    ) -> Option<ObjectArray> {
        unsafe { env_call!(env, NewObjectArray, len, element.as_raw(), ptr::null_mut()) }
            .and_then(ObjectArray::from_raw)
    }

    fn new_byte_array(&self, env: ExecutionEnvironment, len: i32) -> Option<ByteArray> {
        unsafe { env_call!(env, NewByteArray, len) }.and_then(ByteArray::from_raw)
    }

    fn set_byte_array_region(
        &self,
        env: ExecutionEnvironment,
        array: ByteArray,
        bytes: &[u8],
    ) -> bool {
        let Ok(len) = jsize::try_from(bytes.len()) else {
            return false;
        };
        let called = unsafe {
            env_call!(
                env,
                SetByteArrayRegion,
                array.as_raw(),
                0,
                len,
                bytes.as_ptr().cast()
            )
        };
        called.is_some() && !Self::is_pending(env)
    }

    fn set_object_array_element(
        &self,
        env: ExecutionEnvironment,
        array: ObjectArray,
        index: i32,
        value: ByteArray,
    ) -> bool {
        let called = unsafe {
            env_call!(
                env,
                SetObjectArrayElement,
                array.as_raw(),
                index,
                value.as_raw()
            )
        };
        called.is_some() && !Self::is_pending(env)
    }

    fn get_static_method_id(
        &self,
        env: ExecutionEnvironment,
        class: ClassHandle,
        name: &CStr,
        signature: &CStr,
    ) -> Option<MethodHandle> {
        unsafe {
            env_call!(
                env,
                GetStaticMethodID,
                class.as_raw(),
                name.as_ptr(),
                signature.as_ptr()
            )
        }
        .and_then(MethodHandle::from_raw)
    }

    fn call_static_void_method(
        &self,
        env: ExecutionEnvironment,
        class: ClassHandle,
        method: MethodHandle,
        argument: ObjectArray,
    ) {
        let args = [jvalue {
            l: argument.as_raw(),
        }];
        unsafe {
            env_call!(
                env,
                CallStaticVoidMethodA,
                class.as_raw(),
                method.as_raw(),
                args.as_ptr()
            );
        }
    }
}
