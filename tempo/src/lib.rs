//! Event-driven framework for algorithmic trading: a time-ordered dispatcher and a backtesting
//! exchange simulator that plugs into it.
//!
//! [`dispatch`] is the core this crate exists for - [`dispatch::EventMultiplexer`] merges
//! heterogeneous event sources, [`dispatch::SchedulerQueue`] holds due-time callbacks, and
//! [`dispatch::BacktestingDispatcher`] / [`dispatch::RealtimeDispatcher`] drive the run loop over
//! both. [`event`] is the tagged [`event::Event`] every source yields. [`strategy`], [`config`],
//! [`summary`] and [`live`] are the scaffolding a runnable backtest needs around that core.

pub mod config;
pub mod dispatch;
pub mod event;
pub mod live;
pub mod logging;
pub mod strategy;
pub mod summary;

pub use event::{Event, EventKind};
