//! Error type for a harness iteration. Every variant is fatal: the harness
//! stops and the process exits non-zero.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The virtual device could not be created.
    #[error("failed to create virtual device {name:?}: {source}")]
    CreateDevice {
        name: String,
        #[source]
        source: io::Error,
    },
    /// The hotplug monitor failed while waiting for the device.
    #[error("hotplug monitor failed: {0}")]
    Enumeration(#[source] io::Error),
    /// Reading back the negotiated capabilities failed.
    #[error("failed to read capabilities of {node}: {source}")]
    Extract {
        node: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The library-under-test context could not be created.
    #[error("failed to create library context for {node}: {source}")]
    LibraryContext {
        node: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Writing an event to the live device failed.
    #[error("failed to inject event: {0}")]
    Inject(#[source] io::Error),
    /// Dispatching the library's queue failed.
    #[error("library dispatch failed: {0}")]
    Dispatch(#[source] io::Error),
    /// A per-iteration log file could not be created, written or removed.
    #[error("log file {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The draw named for replay does not hold the recorded random number.
    #[error("draw {draw} of seed {seed} is {found}, not {expected}")]
    ReplayMismatch {
        seed: u64,
        draw: u64,
        expected: u32,
        found: u32,
    },
    /// Destroying the virtual device failed.
    #[error("failed to destroy virtual device: {0}")]
    Teardown(#[source] io::Error),
}
