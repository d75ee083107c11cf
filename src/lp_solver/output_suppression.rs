//! Silencing native solver output
//!
//! CBC and Gurobi write banners and progress logs straight to the process' stdout,
//! which would corrupt the JSON documents the CLI prints there. Backends hold a
//! [`SolverOutputGuard`] for the duration of a solve.
//!
//! **Important**: the `gag` crate can only redirect a stream once per process at a
//! time, so concurrent solves (the batch CLI runs several on the rayon pool) have to
//! share one redirection. The manager below hands out reference-counted handles to a
//! single `Gag` and recreate it once every holder is gone.

use gag::Gag;
use std::io;
use std::sync::{Arc, Mutex, Weak};

/// Shared handle on a stream redirection
pub struct GagHandle {
    _gag: Arc<Gag>,
}

impl GagHandle {
    /// Suppress stdout until every handle sharing the redirection is dropped.
    pub fn stdout() -> io::Result<Self> {
        STDOUT_GAG_MANAGER.acquire()
    }
}

struct GagManager {
    weak_gag: Mutex<Weak<Gag>>,
    create_gag: fn() -> io::Result<Gag>,
}

impl GagManager {
    const fn new(create_gag: fn() -> io::Result<Gag>) -> Self {
        Self {
            weak_gag: Mutex::new(Weak::new()),
            create_gag,
        }
    }

    fn acquire(&self) -> io::Result<GagHandle> {
        // A poisoned lock only means another solve panicked while holding it; the weak
        // pointer inside is still meaningful.
        let mut weak_gag = self
            .weak_gag
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(gag) = weak_gag.upgrade() {
            return Ok(GagHandle { _gag: gag });
        }

        let gag = Arc::new((self.create_gag)()?);
        *weak_gag = Arc::downgrade(&gag);

        Ok(GagHandle { _gag: gag })
    }
}

static STDOUT_GAG_MANAGER: GagManager = GagManager::new(Gag::stdout);

/// Keeps native solver output away from the terminal while alive.
///
/// When suppression is disabled, or the redirection cannot be set up (for instance when
/// the stream is already redirected by something outside this crate), the guard is empty
/// and the solver prints normally; losing the silence is never a reason to fail a solve.
///
/// Only stdout is silenced: that is where CBC and Gurobi log, while stderr carries this
/// crate's own `tracing` output.
pub struct SolverOutputGuard {
    handle: Option<GagHandle>,
}

impl SolverOutputGuard {
    pub fn new(suppress: bool) -> Self {
        let handle = if suppress {
            GagHandle::stdout()
                .map_err(|e| tracing::debug!("could not silence solver output: {}", e))
                .ok()
        } else {
            None
        };

        Self { handle }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}
