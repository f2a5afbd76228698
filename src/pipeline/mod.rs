//! The injection pipeline.
//!
//! One session runs five stages in strict order, each consuming the previous stage's output:
//!
//! 1. [`locator`] - find the hosted runtime instance, or bootstrap one
//! 2. [`binder`] - bind the calling thread to that instance
//! 3. [`materializer`] - resolve or define the injector class
//! 4. [`marshaller`] - copy the embedded class definitions into a native `byte[][]`
//! 5. [`dispatcher`] - invoke the injector's static entry method with that array
//!
//! Every error is fatal: no stage retries, and nothing built by an earlier stage is rolled back.
//! [`Pipeline::execute`] turns the result into an [`Outcome`] the hosting glue acts on.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jvminject::{
//!     bundle, config::InjectorConfig, diagnostics::TracingNotifier, pipeline::Pipeline,
//!     runtime::{Host, JniRuntime},
//! };
//!
//! fn inject(host: &impl Host) -> u32 {
//!     let config = InjectorConfig::default();
//!     let runtime = JniRuntime::new();
//!     let pipeline = Pipeline::new(host, &runtime, &TracingNotifier, &config);
//!     pipeline.execute(&bundle::embedded()).exit_code()
//! }
//! ```

pub mod binder;
pub mod dispatcher;
pub mod locator;
pub mod marshaller;
pub mod materializer;

use tracing::{debug, info};

pub use locator::{InstanceOrigin, LocatedRuntime, LibraryStrategy};
pub use marshaller::Payload;
pub use materializer::ClassOrigin;

use crate::{
    bundle::EmbeddedBundle,
    config::InjectorConfig,
    diagnostics::{fatal_message, Notifier},
    runtime::{Host, Runtime},
    Result,
};

/// Summary of a completed injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionReport {
    /// Strategy that produced the runtime library handle
    pub strategy: LibraryStrategy,
    /// Whether the runtime instance was discovered or bootstrapped
    pub instance_origin: InstanceOrigin,
    /// Whether the injector class was reused or defined
    pub class_origin: ClassOrigin,
    /// Number of class definitions handed to the entry point
    pub payload_len: usize,
}

/// Terminal result of a session, handed to the hosting glue which unloads the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The entry point was invoked
    Success,
    /// A stage failed and the failure was reported
    Failed,
}

impl Outcome {
    /// Exit code of the injection thread.
    ///
    /// Every failure maps to the same code.
    #[must_use]
    pub fn exit_code(self) -> u32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed => 1,
        }
    }
}

/// Runs one injection session against a host, a runtime and a diagnostic sink.
pub struct Pipeline<'a, H: ?Sized, R: ?Sized, N: ?Sized> {
    host: &'a H,
    runtime: &'a R,
    notifier: &'a N,
    config: &'a InjectorConfig,
}

impl<'a, H, R, N> Pipeline<'a, H, R, N>
where
    H: Host + ?Sized,
    R: Runtime + ?Sized,
    N: Notifier + ?Sized,
{
    /// Creates a pipeline over the given collaborators.
    pub fn new(
        host: &'a H,
        runtime: &'a R,
        notifier: &'a N,
        config: &'a InjectorConfig,
    ) -> Self {
        Pipeline {
            host,
            runtime,
            notifier,
            config,
        }
    }

    /// Runs every stage once.
    ///
    /// The bundle is validated before the runtime is touched.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails.
    pub fn run(&self, bundle: &EmbeddedBundle<'_>) -> Result<InjectionReport> {
        self.notifier.notice("Starting");

        let definitions = bundle.definitions()?;
        debug!(
            definitions = definitions.len(),
            bytes = definitions.total_bytes(),
            fingerprint = definitions.fingerprint_hex().as_str(),
            "embedded bundle"
        );

        let located = locator::locate(self.host, self.runtime, self.config, self.notifier)?;
        let env = binder::bind(
            self.runtime,
            located.instance,
            self.config.env_version,
            self.config.attach_mode,
        )?;
        let (class, class_origin) = materializer::materialize(
            self.runtime,
            env,
            bundle.class_name,
            bundle.injector_class,
            self.notifier,
        )?;
        let payload = marshaller::marshal(self.runtime, env, &definitions)?;

        dispatcher::dispatch(self.runtime, env, class, &self.config.entry_point, &payload)?;
        self.notifier
            .notice("Native part ready, now the managed part is injecting");

        let report = InjectionReport {
            strategy: located.strategy,
            instance_origin: located.origin,
            class_origin,
            payload_len: payload.len,
        };
        info!(?report, "injection finished");
        Ok(report)
    }

    /// Runs the session and reports a failure on the fatal channel.
    pub fn execute(&self, bundle: &EmbeddedBundle<'_>) -> Outcome {
        match self.run(bundle) {
            Ok(_) => Outcome::Success,
            Err(error) => {
                self.notifier
                    .fatal(&fatal_message(&self.config.diagnostics, &error));
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::ExportName,
        test::{MockHost, MockRuntime, RecordingNotifier},
        Error,
    };

    const CLASS_NAME: &str = "com/example/Injector";
    const INJECTOR: &[u8] = &[0xCA, 0xFE, 0xBA, 0xBE];

    fn running_host() -> MockHost {
        MockHost::new()
            .with_loadable("jvm.dll", 0x10)
            .with_export(ExportName::named("JNI_GetCreatedJavaVMs"), 0x5000)
            .with_export(ExportName::named("JNI_CreateJavaVM"), 0x6000)
    }

    fn bundle<'a>(classes: &'a [&'a [u8]], sizes: &'a [usize]) -> EmbeddedBundle<'a> {
        EmbeddedBundle {
            class_name: CLASS_NAME,
            injector_class: INJECTOR,
            classes,
            class_sizes: sizes,
        }
    }

    #[test]
    fn test_fresh_injection() {
        let first = [0x11_u8; 10];
        let second = [0x22_u8; 20];
        let classes: [&[u8]; 2] = [&first, &second];
        let sizes = [10, 20];

        let host = running_host();
        let runtime = MockRuntime::new()
            .with_running_instance(0x7000)
            .with_attachable_env(0xE0)
            .with_method("inject", "([[B)V");
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();
        let pipeline = Pipeline::new(&host, &runtime, &notifier, &config);

        let report = pipeline.run(&bundle(&classes, &sizes)).unwrap();
        assert_eq!(report.class_origin, ClassOrigin::Defined);
        assert_eq!(report.instance_origin, InstanceOrigin::Discovered);
        assert_eq!(report.payload_len, 2);

        assert_eq!(runtime.definitions(), vec![INJECTOR.to_vec()]);
        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 1);
        let contents = runtime.array_contents(invocations[0].argument).unwrap();
        assert_eq!(contents, vec![Some(first.to_vec()), Some(second.to_vec())]);
        assert_eq!(
            notifier.notices().last().map(String::as_str),
            Some("Native part ready, now the managed part is injecting")
        );
    }

    #[test]
    fn test_fresh_injection_outcome() {
        let classes: [&[u8]; 2] = [&[0; 10], &[0; 20]];
        let host = running_host();
        let runtime = MockRuntime::new()
            .with_running_instance(0x7000)
            .with_attachable_env(0xE0)
            .with_method("inject", "([[B)V");
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let outcome = Pipeline::new(&host, &runtime, &notifier, &config)
            .execute(&bundle(&classes, &[10, 20]));
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(outcome.exit_code(), 0);
        assert!(notifier.fatals().is_empty());
    }

    #[test]
    fn test_enumeration_missing_bootstraps() {
        let host = MockHost::new()
            .with_loadable("jvm.dll", 0x10)
            .with_export(ExportName::named("JNI_CreateJavaVM"), 0x6000);
        let runtime = MockRuntime::new()
            .with_creatable_instance(0x8000)
            .with_attachable_env(0xE0)
            .with_method("inject", "([[B)V");
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let report = Pipeline::new(&host, &runtime, &notifier, &config)
            .run(&bundle(&[], &[]))
            .unwrap();
        assert_eq!(report.instance_origin, InstanceOrigin::Bootstrapped);
        assert_eq!(report.payload_len, 0);
        assert_eq!(runtime.invocations().len(), 1);
    }

    #[test]
    fn test_failed_bootstrap_aborts_before_attach() {
        let host = MockHost::new().with_loadable("jvm.dll", 0x10);
        let runtime = MockRuntime::new().with_attachable_env(0xE0);
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();
        let pipeline = Pipeline::new(&host, &runtime, &notifier, &config);

        assert!(matches!(
            pipeline.run(&bundle(&[], &[])),
            Err(Error::SymbolNotFound { .. })
        ));
        assert_eq!(pipeline.execute(&bundle(&[], &[])), Outcome::Failed);
        assert_eq!(runtime.attach_count(), 0);
        assert_eq!(runtime.env_queries(), 0);
        assert!(runtime.invocations().is_empty());
    }

    #[test]
    fn test_no_library_aborts_before_attach() {
        let host = MockHost::new();
        let runtime = MockRuntime::new().with_attachable_env(0xE0);
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let outcome = Pipeline::new(&host, &runtime, &notifier, &config)
            .execute(&bundle(&[], &[]));
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(runtime.env_queries(), 0);

        let fatals = notifier.fatals();
        assert_eq!(fatals.len(), 1);
        assert!(fatals[0].starts_with("Injector: "));
    }

    #[test]
    fn test_reinjection_reuses_class() {
        let classes: [&[u8]; 1] = [&[0x42; 3]];
        let host = running_host();
        let runtime = MockRuntime::new()
            .with_running_instance(0x7000)
            .with_attached_env(0xE0)
            .with_class(CLASS_NAME, 0xC0)
            .with_method("inject", "([[B)V");
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let report = Pipeline::new(&host, &runtime, &notifier, &config)
            .run(&bundle(&classes, &[3]))
            .unwrap();

        assert_eq!(report.class_origin, ClassOrigin::Reused);
        assert!(runtime.definitions().is_empty());
        assert!(notifier
            .notices()
            .iter()
            .any(|notice| notice.contains("already present")));

        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].class.addr(), 0xC0);
        assert_eq!(
            runtime.array_contents(invocations[0].argument),
            Some(vec![Some(vec![0x42; 3])])
        );
    }

    #[test]
    fn test_invalid_bundle_never_touches_runtime() {
        let classes: [&[u8]; 1] = [&[1, 2]];
        let host = running_host();
        let runtime = MockRuntime::new().with_running_instance(0x7000);
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let result = Pipeline::new(&host, &runtime, &notifier, &config)
            .run(&bundle(&classes, &[3]));
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
        assert!(host.loads().is_empty());
    }

    #[test]
    fn test_missing_method_is_fatal() {
        let host = running_host();
        let runtime = MockRuntime::new()
            .with_running_instance(0x7000)
            .with_attachable_env(0xE0);
        let notifier = RecordingNotifier::default();
        let config = InjectorConfig::default();

        let outcome = Pipeline::new(&host, &runtime, &notifier, &config)
            .execute(&bundle(&[], &[]));
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            notifier.fatals(),
            vec!["Injector: Failed to find method inject([[B)V".to_string()]
        );
        let notices = notifier.notices();
        assert!(notices.iter().all(|notice| !notice.contains("ready")));
        assert!(runtime.invocations().is_empty());
    }
}
