// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'runtime/jni.rs' calls through the JNI function tables and transmutes entry point addresses
// - 'runtime/windows.rs' and 'entry.rs' call the Win32 loader
// - 'image/physical.rs' uses mmap to map a file into memory

//! # jvminject
//!
//! In-process injection of a class bundle into a hosted Java virtual machine.
//!
//! Built as a `cdylib`, the crate is a DLL that, once loaded into a process hosting a JVM,
//! finds that JVM through the JNI invocation interface, binds a thread to it, defines an
//! embedded injector class and hands it an embedded set of class files as a `byte[][]`. Built
//! as an `rlib`, the same pipeline runs against any [`runtime::Host`] and [`runtime::Runtime`]
//! implementation.
//!
//! ## Pipeline
//!
//! - **Locator** ([`pipeline::locator`]) - loads or finds `jvm.dll`, resolves the
//!   invocation entry points under every historical spelling and enumerates the running JVM,
//!   bootstrapping a new one only if none is running
//! - **Binder** ([`pipeline::binder`]) - obtains the thread's `JNIEnv`, attaching if needed
//! - **Materializer** ([`pipeline::materializer`]) - reuses the injector class if an earlier
//!   injection left it loaded, otherwise defines it
//! - **Marshaller** ([`pipeline::marshaller`]) - builds the `byte[][]` payload
//! - **Dispatcher** ([`pipeline::dispatcher`]) - calls the injector's static entry method
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jvminject::prelude::*;
//!
//! fn inject(host: &impl Host) -> Result<InjectionReport> {
//!     let config = InjectorConfig::default();
//!     Pipeline::new(host, &JniRuntime::new(), &TracingNotifier, &config).run(&embedded())
//! }
//! ```
//!
//! ## Embedded classes
//!
//! The injector class and the bundle are embedded at build time from the directory named by
//! `JVMINJECT_CLASSES_DIR`. See [`bundle`] for the expected layout.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] with the crate-wide [`Error`]. Inside the pipeline every
//! error is fatal; [`pipeline::Pipeline::execute`] reports it and returns
//! [`pipeline::Outcome::Failed`].

#[macro_use]
pub(crate) mod error;

pub mod bundle;
pub mod config;
pub mod diagnostics;
pub mod image;
pub mod logger;
pub mod pipeline;
pub mod prelude;
pub mod runtime;

#[cfg(windows)]
mod entry;

#[cfg(test)]
pub(crate) mod test;

/// `jvminject` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `jvminject` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the full list of
/// variants.
pub use error::Error;
