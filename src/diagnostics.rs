//! Advisory and fatal message channels.
//!
//! The pipeline reports expected branch choices (which discovery strategy was used, whether the
//! injector class was reused) as advisory notices, and its single terminal failure as a fatal
//! notice. Neither channel returns anything to the pipeline. A fatal notice is always followed
//! by the loader's teardown.

use tracing::{error, info};

use crate::config::DiagnosticsConfig;

/// Sink for advisory and fatal messages.
pub trait Notifier {
    /// Reports a non-fatal status message.
    fn notice(&self, message: &str);

    /// Reports the failure that ends the session.
    fn fatal(&self, message: &str);
}

/// [`Notifier`] that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notice(&self, message: &str) {
        info!("{message}");
    }

    fn fatal(&self, message: &str) {
        error!("{message}");
    }
}

/// [`Notifier`] that logs and shows a message box.
#[cfg(windows)]
#[derive(Debug, Clone)]
pub struct MessageBoxNotifier {
    config: DiagnosticsConfig,
}

#[cfg(windows)]
impl MessageBoxNotifier {
    /// Creates a notifier presenting messages as configured.
    #[must_use]
    pub fn new(config: DiagnosticsConfig) -> Self {
        MessageBoxNotifier { config }
    }

    fn show(
        &self,
        message: &str,
        style: windows_sys::Win32::UI::WindowsAndMessaging::MESSAGEBOX_STYLE,
    ) {
        use widestring::U16CString;
        use windows_sys::Win32::UI::WindowsAndMessaging::MessageBoxW;

        let text = U16CString::from_str_truncate(message);
        let caption = U16CString::from_str_truncate(self.config.title.as_str());
        unsafe {
            MessageBoxW(std::ptr::null_mut(), text.as_ptr(), caption.as_ptr(), style);
        }
    }
}

#[cfg(windows)]
impl Notifier for MessageBoxNotifier {
    fn notice(&self, message: &str) {
        use windows_sys::Win32::UI::WindowsAndMessaging::{MB_ICONINFORMATION, MB_OK};

        info!("{message}");
        if self.config.show_notices {
            self.show(message, MB_OK | MB_ICONINFORMATION);
        }
    }

    fn fatal(&self, message: &str) {
        use windows_sys::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK};

        error!("{message}");
        self.show(message, MB_OK | MB_ICONERROR);
    }
}

/// Formats the fatal notice shown for a pipeline failure.
pub(crate) fn fatal_message(config: &DiagnosticsConfig, error: &crate::Error) -> String {
    format!("{}: {error}", config.title)
}
