use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait TickHandler: Send + 'static {
    async fn on_tick(&mut self, now: NaiveDateTime);
}

enum TickerState {
    Stopped,
    Running {
        task_handle: JoinHandle<()>,
        cancellation_token: CancellationToken,
    },
}

/// Calls a [`TickHandler`] once per period with the current wall-clock time.
///
/// Ticks are serialized: the next one is not delivered before the handler
/// returns from the previous one. Missed ticks are skipped, not replayed.
pub struct Ticker {
    name: &'static str,
    clock: Arc<dyn Clock>,
    period: Duration,
    state: TickerState,
}

impl Ticker {
    pub fn new(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self::with_period(name, clock, TICK_PERIOD)
    }

    pub fn with_period(name: &'static str, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            name,
            clock,
            period,
            state: TickerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TickerState::Running { .. })
    }

    /// Spawns the tick task. Does nothing if the ticker is already running;
    /// the handler passed in that case is dropped.
    pub fn start(&mut self, handler: impl TickHandler) {
        if self.is_running() {
            log::debug!("Ticker {} is already running, ignoring start", self.name);
            return;
        }

        let cancellation_token = CancellationToken::new();
        let task_handle = tokio::spawn(Self::run(
            self.name,
            Arc::clone(&self.clock),
            self.period,
            cancellation_token.child_token(),
            handler,
        ));

        log::info!("Started ticker {}", self.name);
        self.state = TickerState::Running {
            task_handle,
            cancellation_token,
        };
    }

    /// Cancels the tick task and waits briefly for it to wind down.
    pub async fn stop(&mut self) {
        let TickerState::Running {
            task_handle,
            cancellation_token,
        } = std::mem::replace(&mut self.state, TickerState::Stopped)
        else {
            return;
        };

        cancellation_token.cancel();
        if time::timeout(STOP_TIMEOUT, task_handle).await.is_err() {
            log::warn!("Ticker {} did not stop in time", self.name);
        }
        log::info!("Stopped ticker {}", self.name);
    }

    async fn run(
        name: &'static str,
        clock: Arc<dyn Clock>,
        period: Duration,
        cancellation_token: CancellationToken,
        mut handler: impl TickHandler,
    ) {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::debug!("Ticker {name} cancelled");
                    break;
                }
                _ = interval.tick() => {
                    handler.on_tick(clock.now()).await;
                }
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let TickerState::Running {
            cancellation_token, ..
        } = &self.state
        {
            cancellation_token.cancel();
        }
    }
}
