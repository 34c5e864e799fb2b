//! # flint-core
//!
//! In-memory multi-symbol limit-order-book matching engine.
//!
//! ## Design
//! - Price-time priority; trades always execute at the resting price
//! - Integer tick prices and quantities, no floating point
//! - Flat sorted price ladders with the best level at the tail (O(1)
//!   peek/erase of the best)
//! - Resting orders in a slot arena threaded into intrusive per-level
//!   FIFO queues (O(1) cancel through the order index)
//! - Single-threaded matching: one thread touches a book at a time,
//!   no locks anywhere on the matching path

mod arena;
mod level;

pub mod book;
pub mod engine;
pub mod events;
pub mod order;
pub mod positions;
pub mod symbols;

pub use book::{BookStats, Depth, DepthLevel, OrderBook, Trade, TradeSink};
pub use engine::{MatchingEngine, TopOfBook, TradeCallback};
pub use events::{Event, EventType, InternalEvent};
pub use order::{Order, OrderId, OrderType, Price, Qty, Side, SymbolId, TimeInForce, UserId};
pub use positions::UserPosition;
pub use symbols::SymbolIndex;
