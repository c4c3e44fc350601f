//! Trace line parsing: turns one input line into an [`Arrival`].

use std::fmt;

use crate::error::ParseError;

/// Maximum length, in bytes, of an opaque address/port token (§6).
const MAX_TOKEN_LEN: usize = 31;

/// The 4-tuple identifying a flow: source address, source port, destination address,
/// destination port. Lexical equality of all four fields defines flow identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub src_addr: String,
    pub src_port: String,
    pub dst_addr: String,
    pub dst_port: String,
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.src_addr, self.src_port, self.dst_addr, self.dst_port
        )
    }
}

/// One packet arrival, as read off the trace. Immutable once produced; the batch
/// reader copies what it needs into a queued packet and discards the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub time: u64,
    pub key: ConnectionKey,
    pub length: u64,
    /// The explicit weight literal, if the line carried a 7th field.
    pub weight: Option<f64>,
}

/// Parse one trace line.
///
/// A blank line, or any other line that doesn't split into 6 or 7 whitespace-separated
/// tokens, is a [`ParseError::MalformedLine`] — there is no tolerated shape besides an
/// arrival.
pub fn parse_line(line_number: u64, raw: &str) -> Result<Arrival, ParseError> {
    let trimmed = raw.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() != 6 && fields.len() != 7 {
        return Err(ParseError::MalformedLine {
            line: line_number,
            found: fields.len(),
            raw: raw.to_string(),
        });
    }

    let time = parse_u64(line_number, "T", fields[0], raw)?;
    let src_addr = parse_token(line_number, "src-addr", fields[1], raw)?;
    let src_port = parse_token(line_number, "src-port", fields[2], raw)?;
    let dst_addr = parse_token(line_number, "dst-addr", fields[3], raw)?;
    let dst_port = parse_token(line_number, "dst-port", fields[4], raw)?;
    let length = parse_u64(line_number, "L", fields[5], raw)?;

    let weight = match fields.get(6) {
        Some(token) => {
            let weight = parse_f64(line_number, "W", token, raw)?;
            if !(weight > 0.0) {
                return Err(ParseError::NonPositiveWeight {
                    line: line_number,
                    weight,
                    raw: raw.to_string(),
                });
            }
            Some(weight)
        }
        None => None,
    };

    Ok(Arrival {
        time,
        key: ConnectionKey {
            src_addr,
            src_port,
            dst_addr,
            dst_port,
        },
        length,
        weight,
    })
}

fn parse_token(
    line: u64,
    field: &'static str,
    token: &str,
    raw: &str,
) -> Result<String, ParseError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(ParseError::FieldTooLong {
            line,
            field,
            raw: raw.to_string(),
        });
    }
    Ok(token.to_string())
}

fn parse_u64(line: u64, field: &'static str, token: &str, raw: &str) -> Result<u64, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidField {
        line,
        field,
        raw: raw.to_string(),
    })
}

fn parse_f64(line: u64, field: &'static str, token: &str, raw: &str) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidField {
        line,
        field,
        raw: raw.to_string(),
    })
}
