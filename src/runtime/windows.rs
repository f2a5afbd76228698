//! The production [`Host`] on Windows.

use std::{
    ffi::{c_void, CString},
    mem,
    path::PathBuf,
};

use tracing::trace;
use widestring::{U16CStr, U16CString};
use windows_sys::Win32::{
    Foundation::{CloseHandle, INVALID_HANDLE_VALUE, MAX_PATH},
    System::{
        Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, Module32FirstW, Module32NextW, MODULEENTRY32W,
            TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        },
        LibraryLoader::{GetModuleFileNameW, GetModuleHandleW, GetProcAddress, LoadLibraryW},
    },
};

use super::{ExportAddress, ExportName, Host, LibraryHandle, ModuleEntry};

/// [`Host`] implementation over the Win32 loader and the tool-help module snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsHost;

impl WindowsHost {
    /// Creates the host adapter.
    #[must_use]
    pub fn new() -> Self {
        WindowsHost
    }
}

impl Host for WindowsHost {
    fn load_library(&self, path: &str) -> Option<LibraryHandle> {
        let wide = U16CString::from_str(path).ok()?;
        LibraryHandle::from_raw(unsafe { LoadLibraryW(wide.as_ptr()) })
    }

    fn loaded_library(&self, name: &str) -> Option<LibraryHandle> {
        let wide = U16CString::from_str(name).ok()?;
        LibraryHandle::from_raw(unsafe { GetModuleHandleW(wide.as_ptr()) })
    }

    fn loaded_modules(&self) -> Vec<ModuleEntry> {
        let mut modules = Vec::new();

        let snapshot =
            unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, 0) };
        if snapshot == INVALID_HANDLE_VALUE {
            trace!("module snapshot unavailable");
            return modules;
        }

        let mut entry: MODULEENTRY32W = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<MODULEENTRY32W>() as u32;

        let mut more = unsafe { Module32FirstW(snapshot, &mut entry) } != 0;
        while more {
            if let Some(handle) = LibraryHandle::from_raw(entry.hModule) {
                let name = U16CStr::from_slice_truncate(&entry.szModule)
                    .map(|name| name.to_string_lossy())
                    .unwrap_or_default();
                let path = U16CStr::from_slice_truncate(&entry.szExePath)
                    .map(|path| PathBuf::from(path.to_os_string()))
                    .unwrap_or_default();
                modules.push(ModuleEntry { name, path, handle });
            }
            more = unsafe { Module32NextW(snapshot, &mut entry) } != 0;
        }

        unsafe { CloseHandle(snapshot) };
        modules
    }

    fn resolve_export(
        &self,
        library: LibraryHandle,
        export: &ExportName,
    ) -> Option<ExportAddress> {
        let procedure = match export {
            ExportName::Named(name) => {
                let name = CString::new(name.as_str()).ok()?;
                unsafe { GetProcAddress(library.as_raw(), name.as_ptr().cast()) }
            }
            // MAKEINTRESOURCEA: the ordinal travels in the low word of the name pointer.
            ExportName::Ordinal(ordinal) => unsafe {
                GetProcAddress(library.as_raw(), usize::from(*ordinal) as *const u8)
            },
        };
        procedure.and_then(|procedure| ExportAddress::from_raw(procedure as *mut c_void))
    }

    fn module_path(&self, library: LibraryHandle) -> Option<PathBuf> {
        let mut buffer = vec![0u16; MAX_PATH as usize];
        let len = unsafe {
            GetModuleFileNameW(library.as_raw(), buffer.as_mut_ptr(), buffer.len() as u32)
        } as usize;
        if len == 0 || len >= buffer.len() {
            return None;
        }
        let path = U16CStr::from_slice_truncate(&buffer[..=len]).ok()?;
        Some(PathBuf::from(path.to_os_string()))
    }
}
