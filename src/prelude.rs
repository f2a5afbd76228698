//! # jvminject Prelude
//!
//! The types needed to configure and run an injection session.

/// The main error type for all jvminject operations
pub use crate::Error;

/// The result type used throughout jvminject
pub use crate::Result;

// ================================================================================================
// Configuration
// ================================================================================================

pub use crate::config::{
    AttachMode, BootstrapConfig, DiagnosticsConfig, EntryPoint, InjectorConfig, LocatorConfig,
};

// ================================================================================================
// Pipeline
// ================================================================================================

pub use crate::pipeline::{
    ClassOrigin, InjectionReport, InstanceOrigin, LibraryStrategy, Outcome, Pipeline,
};

/// Advisory and fatal message sinks
pub use crate::diagnostics::{Notifier, TracingNotifier};

#[cfg(windows)]
pub use crate::diagnostics::MessageBoxNotifier;

// ================================================================================================
// Foreign interfaces
// ================================================================================================

pub use crate::runtime::{ExportName, Host, JniRuntime, Runtime};

#[cfg(windows)]
pub use crate::runtime::WindowsHost;

// ================================================================================================
// Embedded classes
// ================================================================================================

pub use crate::bundle::{embedded, ClassDefinition, ClassDefinitionSet, EmbeddedBundle};
