//! libinput as the library under test.
//!
//! Each context is a path-backend libinput instance holding only the
//! device under test. libinput's own log, at debug priority, and one line
//! per dispatched event go to the iteration's diagnostic sink.

use super::{InputLibrary, LibraryContext};
use input::ffi;
use input::{AsRaw, Libinput, LibinputInterface};
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

type SharedSink = Rc<RefCell<Box<dyn Write>>>;

thread_local! {
    /// Sink of the live context on this thread. libinput's log handler has
    /// no user pointer of its own, so it finds the sink here.
    static LOG_SINK: RefCell<Option<SharedSink>> = const { RefCell::new(None) };
}

/// Opens device nodes for libinput with the access mode it asks for.
struct Interface;

impl LibinputInterface for Interface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32> {
        let mode = flags & libc::O_ACCMODE;
        OpenOptions::new()
            .custom_flags(flags)
            .read(mode == libc::O_RDONLY || mode == libc::O_RDWR)
            .write(mode == libc::O_WRONLY || mode == libc::O_RDWR)
            .open(path)
            .map(OwnedFd::from)
            .map_err(|e| e.raw_os_error().unwrap_or(libc::EIO))
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        drop(File::from(fd));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LibinputLibrary;

impl InputLibrary for LibinputLibrary {
    type Context = LibinputContext;

    fn create_context(
        &mut self,
        devnode: &Path,
        sink: Box<dyn Write>,
    ) -> io::Result<LibinputContext> {
        let path = devnode.to_str().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "device node is not UTF-8")
        })?;
        let sink: SharedSink = Rc::new(RefCell::new(sink));
        LOG_SINK.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&sink)));

        let libinput = Libinput::new_from_path(Interface);
        log_to_sink(&libinput);
        // SAFETY: the pointer comes from a live context.
        unsafe {
            ffi::libinput_log_set_priority(
                libinput.as_raw_mut(),
                ffi::libinput_log_priority_LIBINPUT_LOG_PRIORITY_DEBUG,
            );
        }

        let mut context = LibinputContext {
            libinput: Some(libinput),
            devnode: devnode.to_path_buf(),
            sink,
        };
        let added = context
            .libinput
            .as_mut()
            .and_then(|li| li.path_add_device(path));
        if added.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("libinput rejected {path}"),
            ));
        }
        writeln!(context.sink.borrow_mut(), "{path}: added to libinput path context")?;
        debug!(devnode = %devnode.display(), "libinput context created");
        Ok(context)
    }
}

pub struct LibinputContext {
    /// Taken on drop so teardown messages still reach the sink.
    libinput: Option<Libinput>,
    devnode: PathBuf,
    sink: SharedSink,
}

impl std::fmt::Debug for LibinputContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibinputContext")
            .field("devnode", &self.devnode)
            .finish_non_exhaustive()
    }
}

impl LibraryContext for LibinputContext {
    fn dispatch_and_drain(&mut self) -> io::Result<usize> {
        let Some(libinput) = self.libinput.as_mut() else {
            return Ok(0);
        };
        libinput.dispatch()?;
        let mut drained = 0;
        for event in libinput.by_ref() {
            drained += 1;
            writeln!(self.sink.borrow_mut(), "event: {} {:?}", self.devnode.display(), event)?;
        }
        Ok(drained)
    }
}

impl Drop for LibinputContext {
    fn drop(&mut self) {
        drop(self.libinput.take());
        LOG_SINK.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|s| Rc::ptr_eq(s, &self.sink)) {
                *slot = None;
            }
        });
    }
}

/// Short name of a libinput log priority.
fn priority_name(priority: u32) -> &'static str {
    match priority {
        ffi::libinput_log_priority_LIBINPUT_LOG_PRIORITY_DEBUG => "debug",
        ffi::libinput_log_priority_LIBINPUT_LOG_PRIORITY_INFO => "info",
        ffi::libinput_log_priority_LIBINPUT_LOG_PRIORITY_ERROR => "error",
        _ => "log",
    }
}

/// One sink line for a libinput log message.
fn log_line(priority: u32, message: &str) -> String {
    format!("libinput {}: {}", priority_name(priority), message.trim_end())
}

fn write_log(priority: u32, message: &str) {
    LOG_SINK.with(|slot| {
        let Ok(slot) = slot.try_borrow() else {
            return;
        };
        if let Some(sink) = slot.as_ref() {
            if let Ok(mut sink) = sink.try_borrow_mut() {
                let _ = writeln!(sink, "{}", log_line(priority, message));
            }
        }
    });
}

// The handler receives a va_list. On these targets a va_list parameter is
// passed as a pointer, so it can be handed on to vsnprintf untouched.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
mod handler {
    use std::ffi::{c_char, c_uint, c_void, CStr};

    type LogHandler = unsafe extern "C" fn(*mut c_void, c_uint, *const c_char, *mut c_void);

    extern "C" {
        pub fn libinput_log_set_handler(libinput: *mut c_void, handler: Option<LogHandler>);
        fn vsnprintf(buf: *mut c_char, size: usize, format: *const c_char, args: *mut c_void)
            -> i32;
    }

    pub unsafe extern "C" fn forward(
        _libinput: *mut c_void,
        priority: c_uint,
        format: *const c_char,
        args: *mut c_void,
    ) {
        let mut buf = [0u8; 1024];
        // SAFETY: format and args come straight from libinput; vsnprintf
        // writes at most buf.len() bytes and always terminates.
        let written = unsafe { vsnprintf(buf.as_mut_ptr().cast(), buf.len(), format, args) };
        if written < 0 {
            return;
        }
        if let Ok(text) = CStr::from_bytes_until_nul(&buf) {
            super::write_log(priority, &text.to_string_lossy());
        }
    }
}

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn log_to_sink(libinput: &Libinput) {
    // SAFETY: the pointer comes from a live context and `forward` matches
    // libinput's handler signature.
    unsafe {
        handler::libinput_log_set_handler(libinput.as_raw_mut().cast(), Some(handler::forward));
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn log_to_sink(_libinput: &Libinput) {
    write_log(
        ffi::libinput_log_priority_LIBINPUT_LOG_PRIORITY_INFO,
        "log handler unsupported on this target, libinput logs to stderr",
    );
}
