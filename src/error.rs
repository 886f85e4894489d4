//! Error types.
//!
//! Two channels:
//!
//! - [`Error`] covers terminal I/O and is returned as a `Result`.
//! - [`UsageError`] describes a broken contract (duplicate registration,
//!   unbalanced capture, a negative size). It is never returned; it is raised
//!   through [`fatal`], which panics with the message.

use std::io;

use thiserror::Error;

use crate::control::ControlId;

/// Terminal-facing failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("input reader stopped: {0}")]
    InputClosed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations. Raised through [`fatal`], never caught.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("negative size {width}x{height}")]
    NegativeSize { width: i32, height: i32 },

    #[error("cannot move an empty rect")]
    EmptyRectMove,

    #[error("invalid opacity code {0}")]
    InvalidOpacity(u8),

    #[error("pixel ({x}, {y}) outside {width}x{height} buffer")]
    PixelOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("stale control id {0}")]
    StaleControl(ControlId),

    #[error("control {0} already has a parent")]
    AlreadyAttached(ControlId),

    #[error("control {child} is not a child of {parent}")]
    NotAChild { parent: ControlId, child: ControlId },

    #[error("control {0} is still attached to the tree")]
    StillAttached(ControlId),

    #[error("control {0} cannot be its own ancestor")]
    CyclicAttach(ControlId),

    #[error("control {0} is not a {1}")]
    ControlType(ControlId, &'static str),

    #[error("re-entrant layout of control {0}")]
    ReentrantLayout(ControlId),

    #[error("routed event {name:?} already registered for {owner}")]
    DuplicateEvent { name: String, owner: &'static str },

    #[error("routed event #{0} is not registered")]
    UnregisteredEvent(usize),

    #[error("no handler target {0} for routed event {1:?}")]
    AbsentTarget(ControlId, String),

    #[error("end_capture_input({requested}) does not match capture top {top:?}")]
    CaptureMismatch {
        requested: ControlId,
        top: Option<ControlId>,
    },

    #[error("auto-repeat already running")]
    AutoRepeatRunning,

    #[error("auto-repeat is not running")]
    AutoRepeatIdle,

    #[error("invoke called from the UI thread")]
    InvokeFromUiThread,

    #[error("dispatcher closed before the invoked action ran")]
    DispatcherClosed,
}

/// Abort on a contract violation.
#[track_caller]
pub fn fatal(err: UsageError) -> ! {
    log::error!("{err}");
    panic!("{err}")
}
