//! Loader glue of the injected DLL.
//!
//! `DllMain` only records the module handle and starts the injection thread; nothing touching
//! the runtime may run under the loader lock. The thread runs one session and then unloads the
//! module and exits with the session's exit code. That teardown happens exactly once, on success
//! and on failure alike.

use std::{
    ffi::c_void,
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
    thread,
};

use tracing::error;
use windows_sys::Win32::{
    Foundation::{BOOL, HINSTANCE, TRUE},
    System::{
        LibraryLoader::{DisableThreadLibraryCalls, FreeLibraryAndExitThread},
        SystemServices::DLL_PROCESS_ATTACH,
    },
};

use crate::{
    bundle,
    config::InjectorConfig,
    diagnostics::MessageBoxNotifier,
    logger,
    pipeline::{Outcome, Pipeline},
    runtime::{JniRuntime, WindowsHost},
};

static MODULE: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

#[no_mangle]
extern "system" fn DllMain(module: HINSTANCE, reason: u32, _reserved: *mut c_void) -> BOOL {
    if reason == DLL_PROCESS_ATTACH {
        MODULE.store(module, Ordering::Release);
        unsafe {
            DisableThreadLibraryCalls(module);
        }

        if let Err(error) = thread::Builder::new()
            .name("jvminject".to_string())
            .spawn(injection_thread)
        {
            error!(%error, "can't start the injection thread");
        }
    }
    TRUE
}

fn injection_thread() {
    logger::init();

    let outcome = inject();

    unsafe {
        FreeLibraryAndExitThread(MODULE.load(Ordering::Acquire), outcome.exit_code());
    }
}

/// Runs one session with the production collaborators and the default configuration.
fn inject() -> Outcome {
    let config = InjectorConfig::default();
    let notifier = MessageBoxNotifier::new(config.diagnostics.clone());

    Pipeline::new(&WindowsHost::new(), &JniRuntime::new(), &notifier, &config)
        .execute(&bundle::embedded())
}
