//! Cooperative cancellation shared between whoever wants work to stop (a signal handler,
//! another thread) and the work itself, which polls it.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use signal_hook::{consts::signal::*, low_level};

/// A cloneable stop flag. All clones observe the same state.
///
/// Counts how many times it has been tripped, so repeated signals can fall back to
/// killing the process.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    count: Arc<AtomicUsize>,
}

impl CancelToken {
    /// A token that is only tripped by calling [`CancelToken::cancel`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also tripped by SIGINT and SIGTERM. The third signal falls back
    /// to the default handler, i.e., kills the process.
    pub fn with_signals() -> Result<Self, std::io::Error> {
        let token = Self::new();

        for flag in [SIGINT, SIGTERM] {
            let count = Arc::clone(&token.count);
            // SAFETY: this only uses atomic stuff and functions the crate itself is using
            // in signal handlers
            unsafe {
                low_level::register(flag, move || {
                    let prev = count.fetch_add(1, Ordering::SeqCst);
                    if prev >= 2 {
                        let _ = low_level::emulate_default_handler(flag);
                    }
                })?;
            };
        }

        Ok(token)
    }

    pub fn cancel(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= 1
    }
}
