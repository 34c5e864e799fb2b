//! CSV line parsing.
//!
//! Fields are split on `,` (no quoting) and whitespace-trimmed. Unused
//! event fields keep the engine defaults: side=Buy, price=0, qty=0, id=0,
//! tif=GFD, user=1.

use thiserror::Error;

use flint_core::{Event, OrderId, Price, Qty, Side, TimeInForce, UserId};

/// Depth used by `D,symbol` when none (or a non-positive one) is given.
pub const DEFAULT_DEPTH: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown event type in line: {0}")]
    UnknownType(String),
    #[error("wrong field count for {kind} line: {line}")]
    Arity { kind: char, line: String },
    #[error("invalid side `{0}`")]
    InvalidSide(String),
    #[error("invalid time-in-force `{0}`")]
    InvalidTif(String),
    #[error("invalid {field} `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

/// A full REPL command: an engine event or an inspection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(Event),
    /// `D,symbol[,depth]`: print the top levels per side, best first.
    Depth { symbol: String, depth: usize },
    /// `U,user,symbol`: show position and traded volume.
    Positions { user: UserId, symbol: String },
    /// `q` / `quit`.
    Quit,
}

fn parse_side(token: &str) -> Result<Side, ParseError> {
    match token {
        "B" => Ok(Side::Buy),
        "S" => Ok(Side::Sell),
        other => Err(ParseError::InvalidSide(other.to_owned())),
    }
}

fn parse_tif(token: &str) -> Result<TimeInForce, ParseError> {
    match token {
        "GFD" => Ok(TimeInForce::Gfd),
        "IOC" => Ok(TimeInForce::Ioc),
        "FOK" => Ok(TimeInForce::Fok),
        other => Err(ParseError::InvalidTif(other.to_owned())),
    }
}

fn parse_num<T: core::str::FromStr>(field: &'static str, token: &str) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: token.to_owned(),
    })
}

/// Prices and quantities must be strictly positive on the wire; the
/// engine only asserts this, it does not check it.
fn parse_positive(field: &'static str, token: &str) -> Result<i64, ParseError> {
    let value: i64 = parse_num(field, token)?;
    if value <= 0 {
        return Err(ParseError::InvalidNumber {
            field,
            value: token.to_owned(),
        });
    }
    Ok(value)
}

fn fields_of(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Parse one event line (`L`/`M`/`C`/`R`).
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(raw: &str) -> Result<Option<Event>, ParseError> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields = fields_of(line);
    match fields[0] {
        "L" => parse_limit(line, &fields).map(Some),
        "M" => parse_market(line, &fields).map(Some),
        "C" => parse_cancel(line, &fields).map(Some),
        "R" => parse_replace(line, &fields).map(Some),
        _ => Err(ParseError::UnknownType(line.to_owned())),
    }
}

fn parse_limit(line: &str, fields: &[&str]) -> Result<Event, ParseError> {
    // L,symbol,side,price,qty,tif  or  L,user,symbol,side,price,qty,tif
    let (user, rest) = match fields.len() {
        6 => (UserId::default(), &fields[1..]),
        7 => (UserId(parse_num("user id", fields[1])?), &fields[2..]),
        _ => {
            return Err(ParseError::Arity {
                kind: 'L',
                line: line.to_owned(),
            })
        }
    };
    let side = parse_side(rest[1])?;
    let price: Price = parse_positive("price", rest[2])?;
    let qty: Qty = parse_positive("qty", rest[3])?;
    let tif = parse_tif(rest[4])?;
    Ok(Event::new_limit(rest[0], side, price, qty, tif).with_user(user))
}

fn parse_market(line: &str, fields: &[&str]) -> Result<Event, ParseError> {
    // M,symbol,side,qty  or  M,user,symbol,side,qty
    let (user, rest) = match fields.len() {
        4 => (UserId::default(), &fields[1..]),
        5 => (UserId(parse_num("user id", fields[1])?), &fields[2..]),
        _ => {
            return Err(ParseError::Arity {
                kind: 'M',
                line: line.to_owned(),
            })
        }
    };
    let side = parse_side(rest[1])?;
    let qty: Qty = parse_positive("qty", rest[2])?;
    Ok(Event::new_market(rest[0], side, qty).with_user(user))
}

fn parse_cancel(line: &str, fields: &[&str]) -> Result<Event, ParseError> {
    // C,symbol,orderId
    if fields.len() != 3 {
        return Err(ParseError::Arity {
            kind: 'C',
            line: line.to_owned(),
        });
    }
    let id = OrderId(parse_num("order id", fields[2])?);
    Ok(Event::cancel(fields[1], id))
}

fn parse_replace(line: &str, fields: &[&str]) -> Result<Event, ParseError> {
    // R,symbol,oldId,side,price,qty,tif
    if fields.len() != 7 {
        return Err(ParseError::Arity {
            kind: 'R',
            line: line.to_owned(),
        });
    }
    let old_id = OrderId(parse_num("order id", fields[2])?);
    let side = parse_side(fields[3])?;
    let price: Price = parse_positive("price", fields[4])?;
    let qty: Qty = parse_positive("qty", fields[5])?;
    let tif = parse_tif(fields[6])?;
    Ok(Event::replace(fields[1], old_id, side, price, qty, tif))
}

/// Parse a REPL line: inspection commands, quit, or any event line.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_command(raw: &str) -> Result<Option<Command>, ParseError> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if matches!(line, "q" | "Q" | "quit" | "QUIT") {
        return Ok(Some(Command::Quit));
    }

    let fields = fields_of(line);
    match fields[0] {
        "D" => {
            if fields.len() < 2 || fields.len() > 3 {
                return Err(ParseError::Arity {
                    kind: 'D',
                    line: line.to_owned(),
                });
            }
            // A missing, malformed, or non-positive depth falls back to
            // the default rather than rejecting the whole line.
            let depth = fields
                .get(2)
                .and_then(|t| t.parse::<i64>().ok())
                .filter(|d| *d > 0)
                .map_or(DEFAULT_DEPTH, |d| d as usize);
            Ok(Some(Command::Depth {
                symbol: fields[1].to_owned(),
                depth,
            }))
        }
        "U" => {
            if fields.len() != 3 {
                return Err(ParseError::Arity {
                    kind: 'U',
                    line: line.to_owned(),
                });
            }
            let user = UserId(parse_num("user id", fields[1])?);
            Ok(Some(Command::Positions {
                user,
                symbol: fields[2].to_owned(),
            }))
        }
        _ => parse_line(line).map(|event| event.map(Command::Event)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_core::EventType;

    #[test]
    fn limit_without_user() {
        let event = parse_line("L,FOO,B,100,50,GFD").unwrap().unwrap();
        assert_eq!(event.kind, EventType::NewLimit);
        assert_eq!(event.symbol, "FOO");
        assert_eq!(event.side, Side::Buy);
        assert_eq!(event.price, 100);
        assert_eq!(event.qty, 50);
        assert_eq!(event.tif, TimeInForce::Gfd);
        assert_eq!(event.user_id, UserId(1));
    }

    #[test]
    fn limit_with_user_and_whitespace() {
        let event = parse_line(" L , 42 , FOO , S , 101 , 5 , FOK ").unwrap().unwrap();
        assert_eq!(event.user_id, UserId(42));
        assert_eq!(event.symbol, "FOO");
        assert_eq!(event.side, Side::Sell);
        assert_eq!(event.tif, TimeInForce::Fok);
    }

    #[test]
    fn market_forms() {
        let event = parse_line("M,FOO,S,25").unwrap().unwrap();
        assert_eq!(event.kind, EventType::NewMarket);
        assert_eq!(event.tif, TimeInForce::Ioc);
        assert_eq!(event.user_id, UserId(1));

        let event = parse_line("M,9,FOO,B,25").unwrap().unwrap();
        assert_eq!(event.user_id, UserId(9));
        assert_eq!(event.qty, 25);
    }

    #[test]
    fn cancel_and_replace() {
        let event = parse_line("C,FOO,7").unwrap().unwrap();
        assert_eq!(event.kind, EventType::Cancel);
        assert_eq!(event.id, OrderId(7));

        let event = parse_line("R,QUX,1,S,102,30,GFD").unwrap().unwrap();
        assert_eq!(event.kind, EventType::Replace);
        assert_eq!(event.id, OrderId(1));
        assert_eq!(event.price, 102);
        assert_eq!(event.qty, 30);
    }

    #[test]
    fn blanks_and_comments_are_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# L,FOO,B,100,50,GFD").unwrap(), None);
    }

    #[test]
    fn malformed_lines_are_typed_errors() {
        assert!(matches!(
            parse_line("X,FOO,B,100,50,GFD"),
            Err(ParseError::UnknownType(_))
        ));
        assert!(matches!(
            parse_line("L,FOO,B,100,50"),
            Err(ParseError::Arity { kind: 'L', .. })
        ));
        assert!(matches!(
            parse_line("L,FOO,X,100,50,GFD"),
            Err(ParseError::InvalidSide(_))
        ));
        assert!(matches!(
            parse_line("L,FOO,B,100,50,DAY"),
            Err(ParseError::InvalidTif(_))
        ));
        assert!(matches!(
            parse_line("L,FOO,B,abc,50,GFD"),
            Err(ParseError::InvalidNumber { field: "price", .. })
        ));
        assert!(matches!(
            parse_line("C,FOO"),
            Err(ParseError::Arity { kind: 'C', .. })
        ));
        assert!(matches!(
            parse_line("L,FOO,B,100,-5,GFD"),
            Err(ParseError::InvalidNumber { field: "qty", .. })
        ));
        assert!(matches!(
            parse_line("M,FOO,B,0"),
            Err(ParseError::InvalidNumber { field: "qty", .. })
        ));
    }

    #[test]
    fn depth_command_defaults() {
        assert_eq!(
            parse_command("D,FOO").unwrap(),
            Some(Command::Depth { symbol: "FOO".into(), depth: DEFAULT_DEPTH })
        );
        assert_eq!(
            parse_command("D,FOO,12").unwrap(),
            Some(Command::Depth { symbol: "FOO".into(), depth: 12 })
        );
        // Non-positive and junk depths fall back to the default.
        assert_eq!(
            parse_command("D,FOO,-3").unwrap(),
            Some(Command::Depth { symbol: "FOO".into(), depth: DEFAULT_DEPTH })
        );
        assert_eq!(
            parse_command("D,FOO,xyz").unwrap(),
            Some(Command::Depth { symbol: "FOO".into(), depth: DEFAULT_DEPTH })
        );
        assert!(parse_command("D").is_err());
    }

    #[test]
    fn positions_and_quit_commands() {
        assert_eq!(
            parse_command("U,42,FOO").unwrap(),
            Some(Command::Positions { user: UserId(42), symbol: "FOO".into() })
        );
        assert!(parse_command("U,FOO").is_err());
        assert_eq!(parse_command("q").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("QUIT").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn events_pass_through_commands() {
        let cmd = parse_command("L,FOO,B,100,50,IOC").unwrap().unwrap();
        match cmd {
            Command::Event(event) => assert_eq!(event.tif, TimeInForce::Ioc),
            other => panic!("expected event, got {other:?}"),
        }
    }
}
