//! The time-ordered event dispatcher: a multiplexer over heterogeneous sources, a due-time
//! callback scheduler, and the two run loops (backtesting and realtime) built on top of them.

mod backtesting_dispatcher;
mod handler;
mod multiplexer;
mod realtime_dispatcher;
mod scheduler;

pub use backtesting_dispatcher::BacktestingDispatcher;
pub use handler::Handler;
pub use multiplexer::{EventMultiplexer, Peek};
pub use realtime_dispatcher::RealtimeDispatcher;
pub use scheduler::{Callback, SchedulerQueue};
