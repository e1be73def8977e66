//! Cooperative cancellation and progress reporting for long transforms.
//!
//! Nothing in the core depends on a particular progress UI: callers inject a
//! callback through [`RunControl`] and the transforms invoke it once per
//! frame or scale.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Shared flag that requests a running computation to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stage reporting progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Stft,
    Cwt,
    Pitch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Stft => "stft",
            Stage::Cwt => "cwt",
            Stage::Pitch => "pitch",
        })
    }
}

/// One progress notification: `done` of `total` units finished in `stage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub done: usize,
    pub total: usize,
}

type Callback = Box<dyn Fn(Progress) + Send + Sync>;

/// Optional progress callback plus optional cancellation token.
#[derive(Default)]
pub struct RunControl {
    progress: Option<Callback>,
    cancel: Option<CancelToken>,
}

impl RunControl {
    /// No callback, never cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, f: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn checkpoint(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn report(&self, stage: Stage, done: usize, total: usize) {
        if let Some(cb) = &self.progress {
            cb(Progress { stage, done, total });
        }
    }
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}
