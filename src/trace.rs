use std::fs;
use std::num::IntErrorKind;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Read,
    Write,
}

impl OpKind {
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// One memory operation of a trace.  Addresses need not be line-aligned;
/// alignment is implicit in the line mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOp {
    pub kind: OpKind,
    pub addr: u64,
}

impl MemOp {
    pub fn read(addr: u64) -> Self {
        Self {
            kind: OpKind::Read,
            addr,
        }
    }

    pub fn write(addr: u64) -> Self {
        Self {
            kind: OpKind::Write,
            addr,
        }
    }
}

#[derive(Debug, Error)]
pub enum TraceParseError {
    #[error("line {line}: expected `R <addr>` or `W <addr>`, got `{text}`")]
    BadLine { line: usize, text: String },

    #[error("line {line}: address `{text}` does not fit the 64-bit address space")]
    AddressOverflow { line: usize, text: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn load_trace(path: &Path) -> Result<Vec<MemOp>, TraceParseError> {
    parse_trace(&fs::read_to_string(path)?)
}

/// Parses the textual trace format: one `R <addr>` or `W <addr>` per line,
/// hex (0x-prefixed) or decimal addresses, `#` comments, blank lines
/// ignored.
pub fn parse_trace(text: &str) -> Result<Vec<MemOp>, TraceParseError> {
    let mut ops = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let body = raw.split('#').next().unwrap_or("").trim();
        if body.is_empty() {
            continue;
        }
        let mut fields = body.split_whitespace();
        let (op, addr) = match (fields.next(), fields.next(), fields.next()) {
            (Some(op), Some(addr), None) => (op, addr),
            _ => {
                return Err(TraceParseError::BadLine {
                    line,
                    text: body.to_string(),
                })
            }
        };
        let kind = match op.to_ascii_uppercase().as_str() {
            "R" | "READ" => OpKind::Read,
            "W" | "WRITE" => OpKind::Write,
            _ => {
                return Err(TraceParseError::BadLine {
                    line,
                    text: body.to_string(),
                })
            }
        };
        let addr = parse_addr(addr).map_err(|kind_err| match kind_err {
            IntErrorKind::PosOverflow => TraceParseError::AddressOverflow {
                line,
                text: addr.to_string(),
            },
            _ => TraceParseError::BadLine {
                line,
                text: body.to_string(),
            },
        })?;
        ops.push(MemOp { kind, addr });
    }
    Ok(ops)
}

fn parse_addr(text: &str) -> Result<u64, IntErrorKind> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| e.kind().clone())
}

#[cfg(test)]
mod tests {
    use super::{parse_trace, MemOp, TraceParseError};

    #[test]
    fn parses_reads_and_writes() {
        let ops = parse_trace("R 0x1000\nW 32\n# comment\n\nREAD 64 # inline\n").unwrap();
        assert_eq!(
            ops,
            vec![MemOp::read(0x1000), MemOp::write(32), MemOp::read(64)]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse_trace("R 0x10 extra\n").unwrap_err();
        assert!(matches!(err, TraceParseError::BadLine { line: 1, .. }));
        let err = parse_trace("X 0x10\n").unwrap_err();
        assert!(matches!(err, TraceParseError::BadLine { .. }));
    }

    #[test]
    fn oversized_address_is_overflow() {
        let err = parse_trace("R 0xffffffffffffffff1\n").unwrap_err();
        assert!(matches!(err, TraceParseError::AddressOverflow { .. }));
    }

    #[test]
    fn max_u64_address_parses() {
        let ops = parse_trace("R 0xffffffffffffffff\n").unwrap();
        assert_eq!(ops[0].addr, u64::MAX);
    }
}
