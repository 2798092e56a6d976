//! Trace file reader.
//!
//! One record per line, whitespace separated:
//! `<hex-address> <P_MEM_RD|P_MEM_WR> <cycle>`. Blank lines and lines
//! starting with `#` are skipped. Records must be sorted by cycle; the
//! harness issues each at its cycle, retrying under backpressure.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::common::error::ConfigError;
use crate::mem::packet::TransactionKind;

/// One parsed trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub addr: u64,
    pub kind: TransactionKind,
    pub cycle: u64,
}

/// Reads and parses a whole trace file.
pub fn read_trace(path: &str) -> Result<Vec<TraceRecord>, ConfigError> {
    let file = File::open(path).map_err(|e| ConfigError::Io(path.to_string(), e))?;
    let mut records = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ConfigError::Io(path.to_string(), e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        records.push(parse_record(line).map_err(|msg| ConfigError::Trace(line_no + 1, msg))?);
    }

    Ok(records)
}

fn parse_record(line: &str) -> Result<TraceRecord, String> {
    let mut fields = line.split_whitespace();

    let addr_text = fields.next().ok_or("missing address field")?;
    let addr = u64::from_str_radix(addr_text.trim_start_matches("0x"), 16)
        .map_err(|_| format!("bad hex address '{}'", addr_text))?;

    let kind = match fields.next().ok_or("missing operation field")? {
        "P_MEM_RD" => TransactionKind::Read,
        "P_MEM_WR" => TransactionKind::Write,
        other => return Err(format!("unknown operation '{}'", other)),
    };

    let cycle_text = fields.next().ok_or("missing cycle field")?;
    let cycle = cycle_text
        .parse::<u64>()
        .map_err(|_| format!("bad cycle '{}'", cycle_text))?;

    if fields.next().is_some() {
        return Err("trailing fields".to_string());
    }

    Ok(TraceRecord { addr, kind, cycle })
}
