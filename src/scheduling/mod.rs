mod countdown;
mod engine;
mod matcher;
mod refresh;
mod ticker;

pub use countdown::{CountdownPublisher, NO_COUNTDOWN, format_remaining};
pub use engine::AlarmEngine;
pub use matcher::{TriggerEvent, TriggerGuard, evaluate, minute_key};
pub use refresh::{STORAGE_REFRESH_PERIOD, StorageRefresher};
pub use ticker::{TICK_PERIOD, TickHandler, Ticker};
