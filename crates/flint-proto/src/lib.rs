//! # flint-proto
//!
//! Line-based CSV protocol in front of the matching engine.
//!
//! Event lines:
//!
//! ```text
//! L,symbol,B|S,price,qty,GFD|IOC|FOK         new limit (user defaulted)
//! L,user,symbol,B|S,price,qty,GFD|IOC|FOK    new limit with user
//! M,symbol,B|S,qty                           new market (user defaulted)
//! M,user,symbol,B|S,qty                      new market with user
//! C,symbol,orderId                           cancel
//! R,symbol,oldId,B|S,price,qty,GFD|IOC|FOK   replace
//! ```
//!
//! Inspection/REPL commands: `D,symbol[,depth]`, `U,user,symbol`, `q`.
//! Blank lines and lines starting with `#` parse to `None`; anything
//! malformed is a typed [`ParseError`] for the caller to log and skip.

mod parser;

pub use parser::{parse_command, parse_line, Command, ParseError, DEFAULT_DEPTH};
