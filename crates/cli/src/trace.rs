//! Memory trace records.
//!
//! A trace holds one record per line, `<op> <addr> [size]`:
//! 1. **Operations:** `I` fetch, `R` read, `W` write, `C` clean, `V` invalidate,
//!    `F` clean and invalidate (either case).
//! 2. **Operands:** `addr` is hexadecimal with an optional `0x` prefix; `size` is
//!    decimal and defaults to 8 bytes.
//! 3. **Comments:** Everything after `#` is ignored, as are blank lines.

use thiserror::Error;

use cachesim_core::CacheHierarchy;
use cachesim_core::common::AccessType;
use cachesim_core::common::constants::DEFAULT_ACCESS_BYTES;

/// A malformed trace record, identified by its 1-based line number.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TraceError {
    /// The operation letter is not one of `I R W C V F`.
    #[error("line {line}: unknown operation '{op}'")]
    UnknownOp {
        /// Line number.
        line: usize,
        /// The offending token.
        op: String,
    },

    /// The address is not a hexadecimal `u64`.
    #[error("line {line}: invalid address '{value}'")]
    InvalidAddress {
        /// Line number.
        line: usize,
        /// The offending token.
        value: String,
    },

    /// The size is not a decimal `u64`.
    #[error("line {line}: invalid size '{value}'")]
    InvalidSize {
        /// Line number.
        line: usize,
        /// The offending token.
        value: String,
    },

    /// The record has a missing address or trailing fields.
    #[error("line {line}: expected '<op> <addr> [size]'")]
    Malformed {
        /// Line number.
        line: usize,
    },
}

/// What a record asks of the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// A core access routed to the I$ or D$ port.
    Access(AccessType),
    /// Write back dirty lines, keep them resident.
    Clean,
    /// Drop lines without writing them back.
    Invalidate,
    /// Write back dirty lines, then drop them.
    Flush,
}

impl Op {
    fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "I" | "i" => Self::Access(AccessType::Fetch),
            "R" | "r" => Self::Access(AccessType::Read),
            "W" | "w" => Self::Access(AccessType::Write),
            "C" | "c" => Self::Clean,
            "V" | "v" => Self::Invalidate,
            "F" | "f" => Self::Flush,
            _ => return None,
        };
        Some(op)
    }
}

/// One parsed trace line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Operation.
    pub op: Op,
    /// First byte touched.
    pub addr: u64,
    /// Number of bytes touched.
    pub bytes: u64,
}

impl Record {
    /// Replays this record on `hierarchy`.
    ///
    /// Maintenance operations go to both first-level ports.
    pub fn apply(&self, hierarchy: &mut CacheHierarchy) {
        let (addr, bytes) = (self.addr, self.bytes);
        match self.op {
            Op::Access(kind) => hierarchy.trace(kind, addr, bytes),
            Op::Clean => hierarchy.flush(addr, bytes, true, false),
            Op::Invalidate => hierarchy.flush(addr, bytes, false, true),
            Op::Flush => hierarchy.flush(addr, bytes, true, true),
        }
    }
}

fn parse_addr(token: &str) -> Option<u64> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u64::from_str_radix(digits, 16).ok()
}

/// Parses line `line` of a trace.
///
/// # Returns
///
/// `None` for blank and comment-only lines.
///
/// # Errors
///
/// Returns a [`TraceError`] naming `line` if the record is malformed.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Record>, TraceError> {
    let body = text.split_once('#').map_or(text, |(body, _)| body);
    let mut fields = body.split_whitespace();
    let Some(op) = fields.next() else {
        return Ok(None);
    };

    let op = Op::from_token(op).ok_or_else(|| TraceError::UnknownOp {
        line,
        op: op.to_string(),
    })?;
    let addr = fields.next().ok_or(TraceError::Malformed { line })?;
    let addr = parse_addr(addr).ok_or_else(|| TraceError::InvalidAddress {
        line,
        value: addr.to_string(),
    })?;
    let bytes = match fields.next() {
        Some(size) => size.parse().map_err(|_| TraceError::InvalidSize {
            line,
            value: size.to_string(),
        })?,
        None => DEFAULT_ACCESS_BYTES,
    };
    if fields.next().is_some() {
        return Err(TraceError::Malformed { line });
    }

    Ok(Some(Record { op, addr, bytes }))
}

/// Parses a whole trace, stopping at the first malformed record.
///
/// # Errors
///
/// Returns the first [`TraceError`].
pub fn parse(input: &str) -> Result<Vec<Record>, TraceError> {
    input
        .lines()
        .enumerate()
        .filter_map(|(i, text)| parse_line(i + 1, text).transpose())
        .collect()
}
