//! Multi-symbol matching engine.
//!
//! Owns one [`OrderBook`] per symbol in a dense vector indexed by
//! [`SymbolId`], dispatches events, and fans every trade out through an
//! internal monomorphic sink (which updates the optional position layer)
//! before forwarding to the user callback. Symbol ids must come from this
//! engine's own [`SymbolIndex`].

use std::sync::Arc;

use crate::book::{BookStats, OrderBook, Trade, TradeSink};
use crate::events::{Event, EventType, InternalEvent};
use crate::order::{OrderId, Price, Qty, Side, SymbolId, TimeInForce, UserId};
use crate::positions::{PositionTracker, UserPosition};
use crate::symbols::SymbolIndex;

/// Best bid/ask, their aggregate sizes, and the integer mid price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub best_bid: Option<Price>,
    pub bid_size: Option<Qty>,
    pub best_ask: Option<Price>,
    pub ask_size: Option<Qty>,
    pub mid_price: Option<Price>,
}

/// User-facing trade callback, invoked synchronously on the processing
/// thread before the triggering operation returns. It must not re-enter
/// the engine. Dynamic dispatch is confined to this boundary; inside the
/// matching path trades travel through a concrete [`TradeSink`].
pub type TradeCallback = Box<dyn FnMut(&Trade) + Send>;

/// Internal hook the books emit into: position accounting first, then the
/// user callback, synchronously on the processing thread.
struct EngineSink<'a> {
    positions: Option<&'a mut PositionTracker>,
    callback: &'a mut TradeCallback,
}

impl TradeSink for EngineSink<'_> {
    #[inline]
    fn on_trade(&mut self, trade: &Trade) {
        if let Some(positions) = self.positions.as_mut() {
            positions.apply_trade(trade);
        }
        (self.callback)(trade);
    }
}

pub struct MatchingEngine {
    callback: TradeCallback,
    symbols: Arc<SymbolIndex>,
    /// Books indexed by `SymbolId`, created lazily on first event.
    books: Vec<Option<Box<OrderBook>>>,
    /// Position/risk layer; present only when enabled at construction.
    positions: Option<PositionTracker>,
}

impl MatchingEngine {
    /// Engine without position tracking.
    pub fn new(callback: impl FnMut(&Trade) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            symbols: Arc::new(SymbolIndex::new()),
            books: Vec::new(),
            positions: None,
        }
    }

    /// Engine with per-(user, symbol) position tracking and an absolute
    /// position cap enforced before any order enters a book.
    pub fn with_position_limit(
        callback: impl FnMut(&Trade) + Send + 'static,
        max_abs_position: Qty,
    ) -> Self {
        Self {
            positions: Some(PositionTracker::new(max_abs_position)),
            ..Self::new(callback)
        }
    }

    /// Shared handle to the symbol index (used by the async front-end to
    /// resolve names on the producer side).
    pub fn symbols(&self) -> Arc<SymbolIndex> {
        Arc::clone(&self.symbols)
    }

    pub fn resolve_symbol(&self, name: &str) -> SymbolId {
        self.symbols.get_or_create(name)
    }

    pub fn symbol_name(&self, id: SymbolId) -> &'static str {
        self.symbols.name(id)
    }

    /// Apply an external event, resolving its symbol first.
    pub fn process(&mut self, event: &Event) {
        let symbol = self.symbols.get_or_create(&event.symbol);
        self.process_internal(InternalEvent::resolve(event, symbol));
    }

    /// Apply a pre-resolved event. Hot path: no string handling.
    pub fn process_internal(&mut self, event: InternalEvent) {
        match event.kind {
            EventType::NewLimit => {
                self.new_limit_id(
                    event.symbol,
                    event.user_id,
                    event.side,
                    event.price,
                    event.qty,
                    event.tif,
                );
            }
            EventType::NewMarket => {
                self.new_market_id(event.symbol, event.user_id, event.side, event.qty);
            }
            EventType::Cancel => {
                self.cancel_id(event.symbol, event.id);
            }
            EventType::Replace => {
                self.replace_id(
                    event.symbol,
                    event.id,
                    event.side,
                    event.price,
                    event.qty,
                    event.tif,
                );
            }
            EventType::Stop => {}
        }
    }

    pub fn new_limit(
        &mut self,
        symbol: &str,
        user: UserId,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
    ) -> OrderId {
        let symbol = self.symbols.get_or_create(symbol);
        self.new_limit_id(symbol, user, side, price, qty, tif)
    }

    pub fn new_limit_id(
        &mut self,
        symbol: SymbolId,
        user: UserId,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
    ) -> OrderId {
        if !self.check_risk(user, symbol, side, qty) {
            return OrderId::NONE;
        }
        self.ensure_book(symbol);

        let Self {
            callback,
            books,
            positions,
            ..
        } = self;
        let Some(book) = books.get_mut(symbol.index()).and_then(|slot| slot.as_deref_mut())
        else {
            return OrderId::NONE;
        };

        if let Some(positions) = positions.as_mut() {
            positions.begin_submit(user, side);
        }
        let mut sink = EngineSink {
            positions: positions.as_mut(),
            callback,
        };
        let id = book.add_limit(side, price, qty, tif, &mut sink);
        if let Some(positions) = positions.as_mut() {
            positions.end_submit();
            if book.is_resting(id) {
                positions.record_owner(symbol, id, user);
            }
        }
        id
    }

    pub fn new_market(&mut self, symbol: &str, user: UserId, side: Side, qty: Qty) -> OrderId {
        let symbol = self.symbols.get_or_create(symbol);
        self.new_market_id(symbol, user, side, qty)
    }

    pub fn new_market_id(
        &mut self,
        symbol: SymbolId,
        user: UserId,
        side: Side,
        qty: Qty,
    ) -> OrderId {
        if !self.check_risk(user, symbol, side, qty) {
            return OrderId::NONE;
        }
        self.ensure_book(symbol);

        let Self {
            callback,
            books,
            positions,
            ..
        } = self;
        let Some(book) = books.get_mut(symbol.index()).and_then(|slot| slot.as_deref_mut())
        else {
            return OrderId::NONE;
        };

        if let Some(positions) = positions.as_mut() {
            positions.begin_submit(user, side);
        }
        let mut sink = EngineSink {
            positions: positions.as_mut(),
            callback,
        };
        let id = book.add_market(side, qty, &mut sink);
        if let Some(positions) = positions.as_mut() {
            positions.end_submit();
        }
        id
    }

    /// Cancel by symbol name; an unknown symbol behaves like an unknown
    /// order.
    pub fn cancel(&mut self, symbol: &str, id: OrderId) -> bool {
        match self.symbols.find(symbol) {
            Some(symbol) => self.cancel_id(symbol, id),
            None => false,
        }
    }

    pub fn cancel_id(&mut self, symbol: SymbolId, id: OrderId) -> bool {
        let Some(book) = self.book_mut(symbol) else {
            return false;
        };
        let cancelled = book.cancel(id);
        if cancelled {
            if let Some(positions) = self.positions.as_mut() {
                positions.forget_owner(symbol, id);
            }
        }
        cancelled
    }

    /// Replace is cancel-then-new: the new order gets a fresh id and loses
    /// time priority. A missing old order is tolerated; the new order is
    /// still submitted under the old order's owner when one is known.
    pub fn replace(
        &mut self,
        symbol: &str,
        old_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
    ) -> OrderId {
        let symbol = self.symbols.get_or_create(symbol);
        self.replace_id(symbol, old_id, side, price, qty, tif)
    }

    pub fn replace_id(
        &mut self,
        symbol: SymbolId,
        old_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
    ) -> OrderId {
        let user = self
            .positions
            .as_ref()
            .and_then(|p| p.owner(symbol, old_id))
            .unwrap_or_default();
        self.cancel_id(symbol, old_id);
        self.new_limit_id(symbol, user, side, price, qty, tif)
    }

    pub fn top_of_book(&self, symbol: &str) -> TopOfBook {
        match self.symbols.find(symbol) {
            Some(symbol) => self.top_of_book_id(symbol),
            None => TopOfBook::default(),
        }
    }

    pub fn top_of_book_id(&self, symbol: SymbolId) -> TopOfBook {
        let Some(book) = self.book(symbol) else {
            return TopOfBook::default();
        };
        TopOfBook {
            best_bid: book.best_bid(),
            bid_size: book.best_bid_size(),
            best_ask: book.best_ask(),
            ask_size: book.best_ask_size(),
            mid_price: book.mid_price(),
        }
    }

    pub fn find_book(&self, symbol: &str) -> Option<&OrderBook> {
        self.symbols.find(symbol).and_then(|id| self.book(id))
    }

    pub fn book_stats(&self, symbol: &str) -> Option<BookStats> {
        self.find_book(symbol).map(|book| *book.stats())
    }

    pub fn book_stats_id(&self, symbol: SymbolId) -> Option<BookStats> {
        self.book(symbol).map(|book| *book.stats())
    }

    /// `{position, traded_volume}` for a user in a symbol; None when
    /// position tracking is disabled or nothing has traded.
    pub fn user_position(&self, user: UserId, symbol: &str) -> Option<UserPosition> {
        let positions = self.positions.as_ref()?;
        let symbol = self.symbols.find(symbol)?;
        positions.position(user, symbol)
    }

    fn check_risk(&self, user: UserId, symbol: SymbolId, side: Side, qty: Qty) -> bool {
        match &self.positions {
            Some(positions) => positions.check(user, symbol, side, qty),
            None => true,
        }
    }

    fn ensure_book(&mut self, symbol: SymbolId) {
        let idx = symbol.index();
        if idx >= self.books.len() {
            self.books.resize_with(idx + 1, || None);
        }
        if self.books[idx].is_none() {
            let name = self.symbols.name(symbol);
            self.books[idx] = Some(Box::new(OrderBook::new(symbol, name)));
        }
    }

    fn book(&self, symbol: SymbolId) -> Option<&OrderBook> {
        self.books.get(symbol.index()).and_then(|slot| slot.as_deref())
    }

    fn book_mut(&mut self, symbol: SymbolId) -> Option<&mut OrderBook> {
        self.books
            .get_mut(symbol.index())
            .and_then(|slot| slot.as_deref_mut())
    }
}
