//! Optional per-user position tracking and pre-trade risk gating.
//!
//! Enabled at engine construction via
//! [`MatchingEngine::with_position_limit`](crate::engine::MatchingEngine::with_position_limit).
//! The tracker keeps a signed position and gross traded volume per
//! (user, symbol), an owner map for resting orders, and a transient
//! submitter hint so an aggressor's fills are attributed while its own id
//! is not yet in the owner map.

use hashbrown::HashMap;

use crate::book::Trade;
use crate::order::{OrderId, Qty, Side, SymbolId, UserId};

/// Signed position and gross traded volume for one (user, symbol) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserPosition {
    pub position: Qty,
    pub traded_volume: Qty,
}

pub(crate) struct PositionTracker {
    /// Resting order ownership. Order ids are per book, so the key must
    /// include the symbol.
    owners: HashMap<(SymbolId, OrderId), UserId>,
    positions: HashMap<UserId, HashMap<SymbolId, UserPosition>>,
    max_abs_position: Qty,
    /// (user, side) of the order currently inside an `add_*` call.
    submitter: Option<(UserId, Side)>,
}

impl PositionTracker {
    pub fn new(max_abs_position: Qty) -> Self {
        Self {
            owners: HashMap::new(),
            positions: HashMap::new(),
            max_abs_position,
            submitter: None,
        }
    }

    /// Pre-trade check: would the prospective signed delta push the user
    /// past the absolute position cap?
    pub fn check(&self, user: UserId, symbol: SymbolId, side: Side, qty: Qty) -> bool {
        let current = self
            .positions
            .get(&user)
            .and_then(|by_symbol| by_symbol.get(&symbol))
            .map_or(0, |p| p.position);
        let delta = if side.is_buy() { qty } else { -qty };
        (current + delta).abs() <= self.max_abs_position
    }

    pub fn begin_submit(&mut self, user: UserId, side: Side) {
        self.submitter = Some((user, side));
    }

    pub fn end_submit(&mut self) {
        self.submitter = None;
    }

    pub fn record_owner(&mut self, symbol: SymbolId, id: OrderId, user: UserId) {
        self.owners.insert((symbol, id), user);
    }

    pub fn forget_owner(&mut self, symbol: SymbolId, id: OrderId) {
        self.owners.remove(&(symbol, id));
    }

    pub fn owner(&self, symbol: SymbolId, id: OrderId) -> Option<UserId> {
        self.owners.get(&(symbol, id)).copied()
    }

    /// Attribute a trade to both counterparties. Resting orders are found
    /// in the owner map; the aggressor (whose id is not yet recorded) is
    /// attributed through the submitter hint, which stays set for the
    /// whole `add_*` call so every fill of a multi-fill aggressor lands.
    pub fn apply_trade(&mut self, trade: &Trade) {
        let buyer = self
            .owner(trade.symbol_id, trade.buy_id)
            .or_else(|| match self.submitter {
                Some((user, Side::Buy)) if !trade.buy_id.is_none() => Some(user),
                _ => None,
            });
        if let Some(user) = buyer {
            let pos = self.entry(user, trade.symbol_id);
            pos.position += trade.qty;
            pos.traded_volume += trade.qty;
        }

        let seller = self
            .owner(trade.symbol_id, trade.sell_id)
            .or_else(|| match self.submitter {
                Some((user, Side::Sell)) if !trade.sell_id.is_none() => Some(user),
                _ => None,
            });
        if let Some(user) = seller {
            let pos = self.entry(user, trade.symbol_id);
            pos.position -= trade.qty;
            pos.traded_volume += trade.qty;
        }
    }

    pub fn position(&self, user: UserId, symbol: SymbolId) -> Option<UserPosition> {
        self.positions
            .get(&user)
            .and_then(|by_symbol| by_symbol.get(&symbol))
            .copied()
    }

    fn entry(&mut self, user: UserId, symbol: SymbolId) -> &mut UserPosition {
        self.positions
            .entry(user)
            .or_default()
            .entry(symbol)
            .or_default()
    }
}
