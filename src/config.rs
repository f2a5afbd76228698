//! Injection configuration types.
//!
//! Configuration is organized into several interconnected structures:
//!
//! - [`InjectorConfig`] - Top-level configuration container
//! - [`LocatorConfig`] - Runtime library discovery and entry point spellings
//! - [`BootstrapConfig`] - Options for creating a runtime when none exists
//! - [`EntryPoint`] - Name and descriptor of the injector's static entry method
//! - [`DiagnosticsConfig`] - Advisory/fatal message presentation
//!
//! The defaults reproduce the behavior of the classic HotSpot injector: `jvm.dll` searched in
//! the usual JRE/JDK layouts, every historical export spelling of the invocation entry points,
//! and an `inject([[B)V` entry method.
//!
//! # Example
//!
//! ```rust
//! use jvminject::config::{AttachMode, InjectorConfig, LocatorConfig};
//! use jvminject::pipeline::LibraryStrategy;
//!
//! let config = InjectorConfig::default()
//!     .with_attach_mode(AttachMode::AttachFirst)
//!     .with_locator(
//!         LocatorConfig::default().with_strategies(vec![LibraryStrategy::ModuleScan]),
//!     );
//! assert_eq!(config.locator.strategies, vec![LibraryStrategy::ModuleScan]);
//! ```

use jni_sys::JNI_VERSION_1_8;

use crate::{pipeline::LibraryStrategy, runtime::ExportName};

/// Top-level configuration of an injection session.
///
/// # Default Configuration
///
/// - Every discovery strategy, in the order [`LibraryStrategy::CandidatePaths`],
///   [`LibraryStrategy::LoadedModule`], [`LibraryStrategy::ModuleScan`]
/// - JNI 1.8 for environment queries
/// - Query the thread's environment before attaching
/// - Entry point `inject([[B)V`
#[derive(Clone, Debug)]
pub struct InjectorConfig {
    /// Runtime library discovery.
    pub locator: LocatorConfig,

    /// Used only when no running instance can be enumerated.
    pub bootstrap: BootstrapConfig,

    /// JNI version requested when querying the thread's environment.
    pub env_version: i32,

    /// Order in which the binder queries and attaches.
    pub attach_mode: AttachMode,

    /// The injector class' static entry method.
    pub entry_point: EntryPoint,

    /// Presentation of advisory and fatal messages.
    pub diagnostics: DiagnosticsConfig,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        InjectorConfig {
            locator: LocatorConfig::default(),
            bootstrap: BootstrapConfig::default(),
            env_version: JNI_VERSION_1_8,
            attach_mode: AttachMode::QueryFirst,
            entry_point: EntryPoint::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl InjectorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the locator configuration.
    #[must_use]
    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Replaces the bootstrap configuration.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: BootstrapConfig) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Sets the JNI version used for environment queries.
    #[must_use]
    pub fn with_env_version(mut self, version: i32) -> Self {
        self.env_version = version;
        self
    }

    /// Sets the binder's attach order.
    #[must_use]
    pub fn with_attach_mode(mut self, mode: AttachMode) -> Self {
        self.attach_mode = mode;
        self
    }

    /// Replaces the entry point.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Replaces the diagnostics configuration.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Where to look for the runtime library and how its invocation exports are spelled.
#[derive(Clone, Debug)]
pub struct LocatorConfig {
    /// Canonical file name of the runtime library.
    pub library_name: String,

    /// Relative paths tried by [`LibraryStrategy::CandidatePaths`], in order.
    pub candidate_paths: Vec<String>,

    /// Library discovery strategies, in order. The first one yielding a handle wins.
    pub strategies: Vec<LibraryStrategy>,

    /// Spellings of the enumerate-created-instances entry point, in order.
    pub enumerate_exports: Vec<ExportName>,

    /// Spellings of the create-instance entry point, in order.
    pub create_exports: Vec<ExportName>,

    /// Whether to scan the module's export table for decorated spellings once every
    /// configured spelling failed.
    pub export_scan: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            library_name: "jvm.dll".to_string(),
            candidate_paths: [
                "jvm.dll",
                "bin\\server\\jvm.dll",
                "bin\\client\\jvm.dll",
                "jre\\bin\\server\\jvm.dll",
                "jre\\bin\\client\\jvm.dll",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            strategies: vec![
                LibraryStrategy::CandidatePaths,
                LibraryStrategy::LoadedModule,
                LibraryStrategy::ModuleScan,
            ],
            enumerate_exports: vec![
                ExportName::named("JNI_GetCreatedJavaVMs"),
                ExportName::named("_JNI_GetCreatedJavaVMs@12"),
                ExportName::Ordinal(5),
            ],
            create_exports: vec![
                ExportName::named("JNI_CreateJavaVM"),
                ExportName::named("_JNI_CreateJavaVM@12"),
            ],
            export_scan: true,
        }
    }
}

impl LocatorConfig {
    /// Sets the canonical library name.
    #[must_use]
    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Replaces the candidate paths.
    #[must_use]
    pub fn with_candidate_paths(mut self, paths: Vec<String>) -> Self {
        self.candidate_paths = paths;
        self
    }

    /// Replaces the strategy order.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<LibraryStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Replaces the enumerate-created-instances spellings.
    #[must_use]
    pub fn with_enumerate_exports(mut self, exports: Vec<ExportName>) -> Self {
        self.enumerate_exports = exports;
        self
    }

    /// Replaces the create-instance spellings.
    #[must_use]
    pub fn with_create_exports(mut self, exports: Vec<ExportName>) -> Self {
        self.create_exports = exports;
        self
    }

    /// Enables or disables the export-table scan.
    #[must_use]
    pub fn with_export_scan(mut self, enabled: bool) -> Self {
        self.export_scan = enabled;
        self
    }
}

/// Options for bootstrapping a fresh runtime instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// JNI version requested from the creation entry point.
    pub version: i32,
    /// Raw runtime options, e.g. `-Djava.class.path=.`.
    pub options: Vec<String>,
    /// Whether the runtime should ignore options it does not recognize.
    pub ignore_unrecognized: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            version: JNI_VERSION_1_8,
            options: vec!["-Djava.class.path=.".to_string()],
            ignore_unrecognized: true,
        }
    }
}

/// Order in which the binder obtains the thread's environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AttachMode {
    /// Query the bound environment, attach only if the thread is detached.
    #[default]
    QueryFirst,
    /// Attach unconditionally, then query to confirm the binding.
    AttachFirst,
}

/// The static method invoked with the marshalled payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    /// Method name.
    pub name: String,
    /// JNI method descriptor. Must accept one `byte[][]` and return `void`.
    pub signature: String,
}

impl Default for EntryPoint {
    fn default() -> Self {
        EntryPoint {
            name: "inject".to_string(),
            signature: "([[B)V".to_string(),
        }
    }
}

/// Presentation of advisory and fatal messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Caption of user-visible message boxes.
    pub title: String,
    /// Whether advisory notices are shown to the user, or only logged.
    pub show_notices: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        DiagnosticsConfig {
            title: "Injector".to_string(),
            show_notices: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locator_order() {
        let config = LocatorConfig::default();
        assert_eq!(config.library_name, "jvm.dll");
        assert_eq!(config.candidate_paths.first().map(String::as_str), Some("jvm.dll"));
        assert_eq!(config.candidate_paths.len(), 5);
        assert_eq!(
            config.enumerate_exports,
            vec![
                ExportName::named("JNI_GetCreatedJavaVMs"),
                ExportName::named("_JNI_GetCreatedJavaVMs@12"),
                ExportName::Ordinal(5),
            ]
        );
        assert!(config.export_scan);
    }

    #[test]
    fn test_default_bootstrap() {
        let bootstrap = BootstrapConfig::default();
        assert_eq!(bootstrap.version, JNI_VERSION_1_8);
        assert_eq!(bootstrap.options, vec!["-Djava.class.path=.".to_string()]);
        assert!(bootstrap.ignore_unrecognized);
    }

    #[test]
    fn test_builders_replace_fields() {
        let config = InjectorConfig::new()
            .with_env_version(0x0001_0006)
            .with_entry_point(EntryPoint {
                name: "load".into(),
                signature: "([[B)V".into(),
            })
            .with_diagnostics(DiagnosticsConfig {
                title: "Loader".into(),
                show_notices: false,
            });

        assert_eq!(config.env_version, 0x0001_0006);
        assert_eq!(config.entry_point.name, "load");
        assert!(!config.diagnostics.show_notices);
        assert_eq!(config.attach_mode, AttachMode::QueryFirst);
    }
}
