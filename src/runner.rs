use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::Result;

/// Run flag shared between a runner loop and whoever shuts it down.
#[derive(Debug)]
pub struct RunnerState {
    running: AtomicBool,
}

impl RunnerState {
    pub fn new() -> Self {
        Self { running: AtomicBool::new(true) }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for RunnerState {
    fn default() -> Self {
        Self::new()
    }
}

/// A long-lived worker loop with cooperative shutdown.
///
/// Implementors hold a [`RunnerState`] and write their loop body against it:
///
/// ```ignore
/// async fn run_loop(&mut self) -> Result<()> {
///     while self.running() {
///         // drain one item, then sleep
///     }
///     Ok(())
/// }
/// ```
///
/// `stop` only clears the flag; a loop blocked inside an await finishes that
/// wait before it observes shutdown.
#[async_trait]
pub trait Runner {
    fn state(&self) -> &RunnerState;

    async fn run_loop(&mut self) -> Result<()>;

    /// Drive the loop to completion.
    async fn start(&mut self) -> Result<()> {
        self.run_loop().await
    }

    fn stop(&self) {
        self.state().stop();
    }

    fn running(&self) -> bool {
        self.state().running()
    }
}
