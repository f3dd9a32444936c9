use std::{
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error};
use tokio_util::sync::CancellationToken;

use crate::error::{FokusError, Result};

pub type TickFn = Box<dyn FnMut(u64, u64) + Send + 'static>;
pub type CompleteFn = Box<dyn FnOnce() + Send + 'static>;

/// Background countdown that reports `(minutes, seconds)` left once per tick
/// and fires a completion callback on natural expiry.
///
/// Cancellation is checked once per tick. After [`Countdown::stop`] returns
/// the completion callback is guaranteed not to run.
pub struct Countdown {
    total_secs: u64,
    tick_interval: Duration,
    on_tick: Option<TickFn>,
    on_complete: Option<CompleteFn>,
    cancel_token: CancellationToken,
    settle: Arc<Mutex<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new(duration: Duration, on_tick: TickFn, on_complete: CompleteFn) -> Self {
        Self {
            total_secs: duration.as_secs(),
            tick_interval: Duration::from_secs(1),
            on_tick: Some(on_tick),
            on_complete: Some(on_complete),
            cancel_token: CancellationToken::new(),
            settle: Arc::new(Mutex::new(())),
            handle: None,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn start(&mut self) -> Result<()> {
        let (Some(mut on_tick), Some(on_complete)) = (self.on_tick.take(), self.on_complete.take())
        else {
            return Err(FokusError::TimerAlreadyStarted);
        };

        let token = self.cancel_token.clone();
        let settle = Arc::clone(&self.settle);
        let total_secs = self.total_secs;
        let tick_interval = self.tick_interval;

        let handle = thread::Builder::new()
            .name("fokus-countdown".into())
            .spawn(move || {
                let mut remaining = total_secs;
                while remaining > 0 && !token.is_cancelled() {
                    on_tick(remaining / 60, remaining % 60);
                    thread::sleep(tick_interval);
                    remaining -= 1;
                }

                let _guard = settle.lock().unwrap_or_else(PoisonError::into_inner);
                if token.is_cancelled() {
                    debug!("Countdown cancelled with {remaining}s left");
                    return;
                }
                debug!("Countdown finished");
                on_complete();
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        match &self.handle {
            Some(handle) => !handle.is_finished() && !self.cancel_token.is_cancelled(),
            None => false,
        }
    }

    /// Cancels the countdown. The ticking thread exits within one tick.
    pub fn stop(&mut self) {
        let _guard = self.settle.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel_token.cancel();
    }

    /// Waits for the ticking thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.join() {
                error!("Countdown thread panicked: {err:?}");
            }
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
