//! Order types and identifiers.

/// Price in integer ticks. No floating point anywhere in the engine.
pub type Price = i64;

/// Quantity in base units. Orders always carry `qty > 0`; negative values
/// appear only as signed position deltas.
pub type Qty = i64;

/// Side of the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Get the opposite side.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline(always)]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

/// Order type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    Limit = 0,
    Market = 1,
}

/// Time-in-force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good-For-Day: rests on the book if unfilled.
    Gfd = 0,
    /// Immediate-Or-Cancel: fills what it can, drops the remainder.
    Ioc = 1,
    /// Fill-Or-Kill: fills entirely and immediately, or not at all.
    Fok = 2,
}

impl TimeInForce {
    /// Whether an unfilled remainder may rest on the book.
    #[inline(always)]
    pub const fn should_rest(self) -> bool {
        matches!(self, TimeInForce::Gfd)
    }
}

/// Unique order identifier, assigned per book, monotonically from 1.
/// `0` is reserved for "no order / rejected".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    /// The "no order / rejected" sentinel.
    pub const NONE: Self = Self(0);

    #[inline(always)]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// User identifier. Defaults to 1 when a protocol line omits it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct UserId(pub u64);

impl Default for UserId {
    fn default() -> Self {
        Self(1)
    }
}

/// Dense symbol identifier, assigned by the symbol index in first-seen order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An order as held by the matching core.
///
/// Market orders carry a price sentinel (`i64::MAX` for buys, `i64::MIN`
/// for sells) and `tif = Ioc`; a resting order is always a GFD limit with
/// `qty > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub price: Price,
    pub qty: Qty,
    pub side: Side,
    pub order_type: OrderType,
    pub tif: TimeInForce,
}
