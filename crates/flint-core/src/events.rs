//! Engine event records.
//!
//! `Event` is the external form carrying a string symbol, produced by the
//! protocol parser or built directly by callers. `InternalEvent` is the
//! resolved, trivially copyable form that crosses the SPSC queue: a fixed
//! layout of primitives plus a `SymbolId`, no heap-owned fields.

use crate::order::{OrderId, Price, Qty, Side, SymbolId, TimeInForce, UserId};

/// What an event asks the engine to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    NewLimit,
    NewMarket,
    Cancel,
    Replace,
    /// Shutdown sentinel for the async worker; a no-op for the engine.
    Stop,
}

/// External event, symbol by name. Unused fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventType,
    pub symbol: String,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub id: OrderId,
    pub tif: TimeInForce,
    pub user_id: UserId,
}

impl Event {
    fn base(kind: EventType, symbol: &str) -> Self {
        Self {
            kind,
            symbol: symbol.to_owned(),
            side: Side::Buy,
            price: 0,
            qty: 0,
            id: OrderId::NONE,
            tif: TimeInForce::Gfd,
            user_id: UserId::default(),
        }
    }

    pub fn new_limit(symbol: &str, side: Side, price: Price, qty: Qty, tif: TimeInForce) -> Self {
        Self {
            side,
            price,
            qty,
            tif,
            ..Self::base(EventType::NewLimit, symbol)
        }
    }

    pub fn new_market(symbol: &str, side: Side, qty: Qty) -> Self {
        Self {
            side,
            qty,
            tif: TimeInForce::Ioc,
            ..Self::base(EventType::NewMarket, symbol)
        }
    }

    pub fn cancel(symbol: &str, id: OrderId) -> Self {
        Self {
            id,
            ..Self::base(EventType::Cancel, symbol)
        }
    }

    pub fn replace(
        symbol: &str,
        old_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
    ) -> Self {
        Self {
            id: old_id,
            side,
            price,
            qty,
            tif,
            ..Self::base(EventType::Replace, symbol)
        }
    }

    /// Attach a user id (protocol lines without one default to user 1).
    pub fn with_user(mut self, user: UserId) -> Self {
        self.user_id = user;
        self
    }
}

/// Resolved event for the hot path and the SPSC queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternalEvent {
    pub symbol: SymbolId,
    pub id: OrderId,
    pub price: Price,
    pub qty: Qty,
    pub user_id: UserId,
    pub kind: EventType,
    pub side: Side,
    pub tif: TimeInForce,
}

impl InternalEvent {
    /// Resolve an external event against a known symbol id.
    pub fn resolve(event: &Event, symbol: SymbolId) -> Self {
        Self {
            symbol,
            id: event.id,
            price: event.price,
            qty: event.qty,
            user_id: event.user_id,
            kind: event.kind,
            side: event.side,
            tif: event.tif,
        }
    }

    /// The queue shutdown sentinel.
    pub const fn stop() -> Self {
        Self {
            symbol: SymbolId(0),
            id: OrderId::NONE,
            price: 0,
            qty: 0,
            user_id: UserId(1),
            kind: EventType::Stop,
            side: Side::Buy,
            tif: TimeInForce::Gfd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_defaults() {
        let e = Event::new_limit("FOO", Side::Sell, 100, 50, TimeInForce::Gfd);
        assert_eq!(e.kind, EventType::NewLimit);
        assert_eq!(e.user_id, UserId(1));
        assert_eq!(e.id, OrderId::NONE);

        let m = Event::new_market("FOO", Side::Buy, 10).with_user(UserId(7));
        assert_eq!(m.tif, TimeInForce::Ioc);
        assert_eq!(m.user_id, UserId(7));

        let c = Event::cancel("FOO", OrderId(3));
        assert_eq!(c.id, OrderId(3));
        assert_eq!(c.qty, 0);
    }

    #[test]
    fn resolve_copies_everything_but_the_name() {
        let e = Event::replace("FOO", OrderId(2), Side::Sell, 102, 30, TimeInForce::Gfd);
        let ie = InternalEvent::resolve(&e, SymbolId(5));
        assert_eq!(ie.symbol, SymbolId(5));
        assert_eq!(ie.id, OrderId(2));
        assert_eq!(ie.price, 102);
        assert_eq!(ie.qty, 30);
        assert_eq!(ie.kind, EventType::Replace);
    }

    #[test]
    fn stop_sentinel() {
        assert_eq!(InternalEvent::stop().kind, EventType::Stop);
    }
}
