//! Shared test helpers.
//!
//! Mocks of the [`Host`](crate::runtime::Host), [`Runtime`](crate::runtime::Runtime) and
//! [`Notifier`](crate::diagnostics::Notifier) collaborators, used by the pipeline stage tests,
//! and a builder for module images with a chosen export table.


pub use factories::pe_exporting;
pub use mock::{MockHost, MockRuntime, RecordingNotifier};
