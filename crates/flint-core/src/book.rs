//! Per-symbol limit order book.
//!
//! Each side is a flat sorted ladder of price levels kept so that the best
//! level sits at the tail of the vector (bids ascending, asks descending):
//! peeking and erasing the best level are O(1), price lookup is a binary
//! search, and cancels reach their level through the order index without
//! scanning. Matching follows strict price-time priority and trades always
//! execute at the resting side's price.

use hashbrown::HashMap;

use crate::arena::{OrderArena, OrderHandle};
use crate::level::PriceLevel;
use crate::order::{Order, OrderId, OrderType, Price, Qty, Side, SymbolId, TimeInForce};

/// An executed match between one aggressor and one resting order.
///
/// `symbol` borrows the symbol index's interned storage and stays valid
/// for the engine's lifetime, so trades are plain `Copy` records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trade {
    pub symbol_id: SymbolId,
    pub symbol: &'static str,
    pub price: Price,
    pub qty: Qty,
    pub buy_id: OrderId,
    pub sell_id: OrderId,
}

/// Running per-book statistics, updated exactly once per emitted trade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BookStats {
    pub trade_count: u64,
    pub traded_qty: Qty,
    pub last_trade_price: Price,
    pub has_last_trade: bool,
}

/// Receiver for trades as they are matched.
///
/// The book is generic over the sink so the engine's internal hook is
/// monomorphized into the matching loop; dynamic dispatch is reserved for
/// the user-facing callback at the engine boundary.
pub trait TradeSink {
    fn on_trade(&mut self, trade: &Trade);
}

impl<F: FnMut(&Trade)> TradeSink for F {
    #[inline(always)]
    fn on_trade(&mut self, trade: &Trade) {
        self(trade)
    }
}

/// Aggregate view of one price level, for depth inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Price,
    pub total_qty: Qty,
    pub orders: usize,
}

/// Top-`n` levels per side, best first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Depth {
    pub symbol: &'static str,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl core::fmt::Display for Depth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "OrderBook({})", self.symbol)?;
        for (name, levels) in [("asks", &self.asks), ("bids", &self.bids)] {
            writeln!(f, "  {name}:")?;
            if levels.is_empty() {
                writeln!(f, "    <empty>")?;
            }
            for lvl in levels {
                writeln!(
                    f,
                    "    px={} total_qty={} (orders={})",
                    lvl.price, lvl.total_qty, lvl.orders
                )?;
            }
        }
        Ok(())
    }
}

/// One side of the book: price levels sorted so the best is at the tail.
struct BookSide {
    /// Bids ascending / asks descending by price.
    levels: Vec<(Price, PriceLevel)>,
    side: Side,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            levels: Vec::new(),
            side,
        }
    }

    #[inline(always)]
    fn best_price(&self) -> Option<Price> {
        self.levels.last().map(|(px, _)| *px)
    }

    #[inline(always)]
    fn best_qty(&self) -> Option<Qty> {
        self.levels.last().map(|(_, lvl)| lvl.total_qty)
    }

    #[inline(always)]
    fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
        self.levels.last_mut().map(|(_, lvl)| lvl)
    }

    /// Position of `price` in this side's sort order.
    #[inline]
    fn rank(&self, price: Price) -> Result<usize, usize> {
        match self.side {
            Side::Buy => self.levels.binary_search_by(|(px, _)| px.cmp(&price)),
            Side::Sell => self.levels.binary_search_by(|(px, _)| price.cmp(px)),
        }
    }

    fn get_or_insert(&mut self, price: Price) -> &mut PriceLevel {
        match self.rank(price) {
            Ok(pos) => &mut self.levels[pos].1,
            Err(pos) => {
                self.levels.insert(pos, (price, PriceLevel::new()));
                &mut self.levels[pos].1
            }
        }
    }

    /// Drop the best (tail) level. O(1).
    #[inline(always)]
    fn pop_best(&mut self) {
        self.levels.pop();
    }

    /// Levels from best to worst.
    fn iter_best_first(&self) -> impl Iterator<Item = &(Price, PriceLevel)> {
        self.levels.iter().rev()
    }
}

/// The order book for a single symbol.
pub struct OrderBook {
    symbol_id: SymbolId,
    symbol: &'static str,
    bids: BookSide,
    asks: BookSide,
    arena: OrderArena,
    /// Cancel index: an entry exists iff the order is currently resting.
    index: HashMap<OrderId, OrderHandle>,
    next_id: u64,
    stats: BookStats,
}

impl OrderBook {
    pub fn new(symbol_id: SymbolId, symbol: &'static str) -> Self {
        Self {
            symbol_id,
            symbol,
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            arena: OrderArena::with_capacity(1024),
            index: HashMap::new(),
            next_id: 1,
            stats: BookStats::default(),
        }
    }

    #[inline(always)]
    pub fn symbol_id(&self) -> SymbolId {
        self.symbol_id
    }

    #[inline(always)]
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    #[inline(always)]
    fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Submit a limit order. Crossing quantity is matched immediately; an
    /// unfilled remainder rests only under GFD. A FOK order that cannot be
    /// filled in full is rejected with no side effects, though the
    /// reserved id is still consumed and returned.
    pub fn add_limit<S: TradeSink>(
        &mut self,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
        sink: &mut S,
    ) -> OrderId {
        debug_assert!(qty > 0, "order quantity must be positive");
        debug_assert!(price > 0, "limit price must be positive");

        let id = self.next_order_id();
        if tif == TimeInForce::Fok && !self.can_fully_match(side, price, qty) {
            return id;
        }

        let mut order = Order {
            id,
            price,
            qty,
            side,
            order_type: OrderType::Limit,
            tif,
        };
        self.match_incoming(&mut order, sink);
        if order.qty > 0 && order.tif.should_rest() {
            self.rest(order);
        }
        id
    }

    /// Submit a market order. Never rests; whatever the opposite side
    /// cannot fill is discarded.
    pub fn add_market<S: TradeSink>(&mut self, side: Side, qty: Qty, sink: &mut S) -> OrderId {
        debug_assert!(qty > 0, "order quantity must be positive");

        let price = match side {
            Side::Buy => Price::MAX,
            Side::Sell => Price::MIN,
        };
        let id = self.next_order_id();
        let mut order = Order {
            id,
            price,
            qty,
            side,
            order_type: OrderType::Market,
            tif: TimeInForce::Ioc,
        };
        self.match_incoming(&mut order, sink);
        id
    }

    /// Cancel a resting order. Returns true iff the order was resting;
    /// a second cancel of the same id returns false.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let Some(&handle) = self.index.get(&id) else {
            return false;
        };
        let order = *self.arena.order(handle);

        let ladder = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Ok(pos) = ladder.rank(order.price) else {
            // Index points at a level that no longer exists; drop the
            // stale entry rather than corrupting the ladder.
            debug_assert!(false, "index entry without a price level");
            self.index.remove(&id);
            return false;
        };

        let level = &mut ladder.levels[pos].1;
        level.reduce_qty(order.qty);
        level.unlink(&mut self.arena, handle);
        let emptied = level.is_empty();
        if emptied {
            ladder.levels.remove(pos);
        }

        self.index.remove(&id);
        self.arena.remove(handle);
        true
    }

    #[inline(always)]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    #[inline(always)]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    #[inline(always)]
    pub fn best_bid_size(&self) -> Option<Qty> {
        self.bids.best_qty()
    }

    #[inline(always)]
    pub fn best_ask_size(&self) -> Option<Qty> {
        self.asks.best_qty()
    }

    /// Integer midpoint of the touch; None unless both sides are present.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    /// Whether `id` is currently resting on the book.
    #[inline(always)]
    pub fn is_resting(&self, id: OrderId) -> bool {
        self.index.contains_key(&id)
    }

    /// The resting order for `id`, if any.
    pub fn resting_order(&self, id: OrderId) -> Option<&Order> {
        self.index.get(&id).map(|&h| self.arena.order(h))
    }

    /// Number of resting orders across both sides.
    pub fn open_orders(&self) -> usize {
        self.arena.live()
    }

    /// Top `depth` levels per side, best first.
    pub fn depth(&self, depth: usize) -> Depth {
        let snap = |side: &BookSide| {
            side.iter_best_first()
                .take(depth)
                .map(|(px, lvl)| DepthLevel {
                    price: *px,
                    total_qty: lvl.total_qty,
                    orders: lvl.len(),
                })
                .collect()
        };
        Depth {
            symbol: self.symbol,
            bids: snap(&self.bids),
            asks: snap(&self.asks),
        }
    }

    /// Price-time priority matching loop. Walks the opposite side's best
    /// levels in order, oldest resting order first, trading at the
    /// resting price until the incoming order is exhausted or no longer
    /// crosses.
    fn match_incoming<S: TradeSink>(&mut self, incoming: &mut Order, sink: &mut S) {
        let OrderBook {
            bids,
            asks,
            arena,
            index,
            stats,
            symbol_id,
            symbol,
            ..
        } = self;
        let opposite = match incoming.side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        while incoming.qty > 0 {
            let Some(best_px) = opposite.best_price() else {
                break;
            };
            if incoming.order_type == OrderType::Limit {
                let crosses = match incoming.side {
                    Side::Buy => incoming.price >= best_px,
                    Side::Sell => incoming.price <= best_px,
                };
                if !crosses {
                    break;
                }
            }

            let Some(level) = opposite.best_level_mut() else {
                break;
            };
            let mut cursor = level.front();
            while !cursor.is_nil() && incoming.qty > 0 {
                let handle = cursor;
                let resting = arena.order_mut(handle);
                let traded = incoming.qty.min(resting.qty);
                incoming.qty -= traded;
                resting.qty -= traded;
                let resting_id = resting.id;
                let resting_done = resting.qty == 0;
                level.reduce_qty(traded);

                let (buy_id, sell_id) = match incoming.side {
                    Side::Buy => (incoming.id, resting_id),
                    Side::Sell => (resting_id, incoming.id),
                };
                stats.trade_count += 1;
                stats.traded_qty += traded;
                stats.last_trade_price = best_px;
                stats.has_last_trade = true;
                sink.on_trade(&Trade {
                    symbol_id: *symbol_id,
                    symbol: *symbol,
                    price: best_px,
                    qty: traded,
                    buy_id,
                    sell_id,
                });

                cursor = arena.node(handle).next;
                if resting_done {
                    level.unlink(arena, handle);
                    index.remove(&resting_id);
                    arena.remove(handle);
                }
            }

            let emptied = level.is_empty();
            if emptied {
                opposite.pop_best();
            }
        }
    }

    /// FOK pre-check: pure read summing opposite-side quantity at prices
    /// that cross the limit.
    fn can_fully_match(&self, side: Side, price: Price, qty: Qty) -> bool {
        if qty <= 0 {
            return true;
        }
        let opposite = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        let mut need = qty;
        for (px, level) in opposite.iter_best_first() {
            let crosses = match side {
                Side::Buy => *px <= price,
                Side::Sell => *px >= price,
            };
            if !crosses {
                break;
            }
            need -= level.total_qty;
            if need <= 0 {
                return true;
            }
        }
        false
    }

    /// Append the remainder of a GFD limit to its price level's tail and
    /// index it for cancellation.
    fn rest(&mut self, order: Order) {
        debug_assert!(order.qty > 0 && order.order_type == OrderType::Limit);
        let OrderBook {
            bids,
            asks,
            arena,
            index,
            ..
        } = self;
        let ladder = match order.side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        let handle = arena.insert(order);
        let level = ladder.get_or_insert(order.price);
        level.push_back(arena, handle, order.qty);
        index.insert(order.id, handle);
    }

    /// Consistency check used by tests: the index and the ladders must
    /// describe exactly the same set of resting orders, every cached
    /// aggregate must match, and nothing but GFD limits may rest.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        let mut seen = 0usize;
        for side in [&self.bids, &self.asks] {
            for window in side.levels.windows(2) {
                let (a, b) = (window[0].0, window[1].0);
                match side.side {
                    Side::Buy => assert!(a < b, "bid ladder out of order"),
                    Side::Sell => assert!(a > b, "ask ladder out of order"),
                }
            }
            for (px, level) in &side.levels {
                assert!(!level.is_empty(), "empty level left in ladder");
                let mut total = 0;
                let mut count = 0;
                for order in level.iter(&self.arena) {
                    assert!(order.qty > 0);
                    assert_eq!(order.price, *px);
                    assert_eq!(order.side, side.side);
                    assert_eq!(order.order_type, OrderType::Limit);
                    assert_eq!(order.tif, TimeInForce::Gfd);
                    let handle = self.index.get(&order.id).copied();
                    assert!(handle.is_some(), "resting order missing from index");
                    assert_eq!(self.arena.order(handle.unwrap()).id, order.id);
                    total += order.qty;
                    count += 1;
                }
                assert_eq!(level.total_qty, total, "level total_qty out of sync");
                assert_eq!(level.len(), count);
                seen += count;
            }
        }
        assert_eq!(self.index.len(), seen, "index has stale entries");
        assert_eq!(self.arena.live(), seen);
    }
}
