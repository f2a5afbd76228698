//! Runtime Locator: finds the hosted runtime instance, or bootstraps one.
//!
//! Discovery happens in two steps. First a handle to the runtime library is obtained by trying
//! each configured [`LibraryStrategy`] in order; the first one yielding a handle wins and no
//! later strategy runs. Then, inside that library, the enumerate-created-instances entry point
//! is resolved under each of its historical spellings. If it reports a running instance, that
//! instance is used. Otherwise a new instance is bootstrapped through the create-instance
//! entry point with the configured [`BootstrapConfig`](crate::config::BootstrapConfig).

use strum::{Display, EnumIter, IntoStaticStr};
use tracing::{debug, info, warn};

use crate::{
    config::{InjectorConfig, LocatorConfig},
    diagnostics::Notifier,
    image::ModuleImage,
    runtime::{undecorate, ExportAddress, ExportName, Host, LibraryHandle, Runtime, RuntimeInstance},
    Error, Result,
};

/// A way of obtaining a handle to the runtime library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LibraryStrategy {
    /// Load the library from each configured candidate path in turn
    CandidatePaths,
    /// Ask the loader for an already-loaded library by its canonical name
    LoadedModule,
    /// Enumerate every loaded module and match the canonical name case-insensitively
    ModuleScan,
}

impl LibraryStrategy {
    /// Runs this strategy alone.
    pub fn attempt<H: Host + ?Sized>(
        self,
        host: &H,
        config: &LocatorConfig,
    ) -> Option<LibraryHandle> {
        match self {
            LibraryStrategy::CandidatePaths => config.candidate_paths.iter().find_map(|path| {
                let handle = host.load_library(path);
                debug!(path = path.as_str(), found = handle.is_some(), "candidate path");
                handle
            }),
            LibraryStrategy::LoadedModule => host.loaded_library(&config.library_name),
            LibraryStrategy::ModuleScan => host
                .loaded_modules()
                .into_iter()
                .find(|module| module.name.eq_ignore_ascii_case(&config.library_name))
                .map(|module| module.handle),
        }
    }
}

/// How the runtime instance came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum InstanceOrigin {
    /// A running instance was enumerated
    Discovered,
    /// No instance could be enumerated, a new one was created
    Bootstrapped,
}

/// Result of a successful [`locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedRuntime {
    /// The runtime instance
    pub instance: RuntimeInstance,
    /// The runtime library it was found through
    pub library: LibraryHandle,
    /// The strategy that produced the library handle
    pub strategy: LibraryStrategy,
    /// Whether the instance was discovered or bootstrapped
    pub origin: InstanceOrigin,
}

/// Obtains a handle to the runtime library.
///
/// # Errors
///
/// Returns [`Error::RuntimeNotFound`] if no strategy yields a handle.
pub fn locate_library<H: Host + ?Sized>(
    host: &H,
    config: &LocatorConfig,
) -> Result<(LibraryStrategy, LibraryHandle)> {
    for strategy in &config.strategies {
        if let Some(handle) = strategy.attempt(host, config) {
            info!(%strategy, library = config.library_name.as_str(), "runtime library found");
            return Ok((*strategy, handle));
        }
        debug!(%strategy, "strategy found no runtime library");
    }

    Err(Error::RuntimeNotFound {
        tried: config
            .strategies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Resolves the first of `exports` present in `library`.
///
/// When every spelling fails and `scan` is set, the library's export table is read from disk and
/// searched for a decorated spelling of the first named export.
pub fn resolve_entry<H: Host + ?Sized>(
    host: &H,
    library: LibraryHandle,
    exports: &[ExportName],
    scan: bool,
) -> Option<(ExportName, ExportAddress)> {
    for export in exports {
        if let Some(address) = host.resolve_export(library, export) {
            debug!(%export, "entry point resolved");
            return Some((export.clone(), address));
        }
        debug!(%export, "entry point not exported");
    }

    if scan {
        return scan_exports(host, library, exports);
    }
    None
}

fn scan_exports<H: Host + ?Sized>(
    host: &H,
    library: LibraryHandle,
    exports: &[ExportName],
) -> Option<(ExportName, ExportAddress)> {
    let canonical = exports.iter().find_map(|export| match export {
        ExportName::Named(name) => Some(undecorate(name)),
        ExportName::Ordinal(_) => None,
    })?;

    let path = host.module_path(library)?;
    let image = match ModuleImage::from_file(&path) {
        Ok(image) => image,
        Err(error) => {
            debug!(path = %path.display(), %error, "export table unreadable");
            return None;
        }
    };

    let export = ExportName::Named(image.find_export(canonical)?);
    let address = host.resolve_export(library, &export)?;
    info!(%export, "entry point found in export table");
    Some((export, address))
}

/// Produces the runtime instance for this session.
///
/// # Errors
///
/// Returns [`Error::RuntimeNotFound`] if no library handle can be obtained, and
/// [`Error::SymbolNotFound`] if the library yields neither an enumerated nor a bootstrapped
/// instance.
pub fn locate<H, R, N>(
    host: &H,
    runtime: &R,
    config: &InjectorConfig,
    notifier: &N,
) -> Result<LocatedRuntime>
where
    H: Host + ?Sized,
    R: Runtime + ?Sized,
    N: Notifier + ?Sized,
{
    let locator = &config.locator;
    let (strategy, library) = locate_library(host, locator)?;
    let found = format!("Found {} via {strategy}", locator.library_name);
    notifier.notice(&found);

    let enumerate = resolve_entry(
        host,
        library,
        &locator.enumerate_exports,
        locator.export_scan,
    );
    let mut detail = match enumerate {
        Some((export, entry)) => match runtime.created_instance(entry) {
            Ok(Some(instance)) => {
                info!(%export, "using running runtime instance");
                return Ok(LocatedRuntime {
                    instance,
                    library,
                    strategy,
                    origin: InstanceOrigin::Discovered,
                });
            }
            Ok(None) => "no running instance".to_string(),
            Err(status) => format!("enumeration failed with status {status}"),
        },
        None => "enumeration entry point not exported".to_string(),
    };
    warn!(reason = detail.as_str(), "bootstrapping a new runtime instance");

    match resolve_entry(host, library, &locator.create_exports, locator.export_scan) {
        Some((_, entry)) => match runtime.create_instance(entry, &config.bootstrap) {
            Ok(instance) => {
                notifier.notice("Created a new runtime instance");
                return Ok(LocatedRuntime {
                    instance,
                    library,
                    strategy,
                    origin: InstanceOrigin::Bootstrapped,
                });
            }
            Err(status) => detail.push_str(&format!(", creation failed with status {status}")),
        },
        None => detail.push_str(", creation entry point not exported"),
    }

    Err(Error::SymbolNotFound {
        library: locator.library_name.clone(),
        detail,
    })
}
