//! Statistics collection for one memory channel.
//!
//! Tracks per-bank access counts, per-rank energy accumulators, and the
//! binned latency histograms. Counters are per-epoch and reset after every
//! dump; grand totals accumulate across the run. The CSV sink mirrors the
//! per-epoch dump into a machine-readable file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Per-channel counters and energy accumulators.
///
/// Energy is accumulated in `mA * cycles * devices`; multiplying by Vdd and
/// dividing by elapsed cycles at dump time yields milliwatts.
pub struct ChannelStats {
    num_banks: usize,
    bin_size: u64,

    /// Bursts moved across the data bus (reads returned + writes sent).
    pub total_transactions: u64,

    reads_per_bank: Vec<u64>,
    writes_per_bank: Vec<u64>,
    grand_total_accesses: Vec<u64>,
    epoch_latency: Vec<u64>,

    pub background_energy: Vec<u64>,
    pub burst_energy: Vec<u64>,
    pub actpre_energy: Vec<u64>,
    pub refresh_energy: Vec<u64>,

    latencies: BTreeMap<u64, u64>,
    access_latencies: BTreeMap<u64, u64>,
}

impl ChannelStats {
    pub fn new(num_ranks: usize, num_banks: usize, bin_size: u64) -> Self {
        Self {
            num_banks,
            bin_size,
            total_transactions: 0,
            reads_per_bank: vec![0; num_ranks * num_banks],
            writes_per_bank: vec![0; num_ranks * num_banks],
            grand_total_accesses: vec![0; num_ranks * num_banks],
            epoch_latency: vec![0; num_ranks * num_banks],
            background_energy: vec![0; num_ranks],
            burst_energy: vec![0; num_ranks],
            actpre_energy: vec![0; num_ranks],
            refresh_energy: vec![0; num_ranks],
            latencies: BTreeMap::new(),
            access_latencies: BTreeMap::new(),
        }
    }

    fn seq(&self, rank: usize, bank: usize) -> usize {
        rank * self.num_banks + bank
    }

    pub fn add_read(&mut self, rank: usize, bank: usize) {
        let i = self.seq(rank, bank);
        self.reads_per_bank[i] += 1;
    }

    pub fn add_write(&mut self, rank: usize, bank: usize) {
        let i = self.seq(rank, bank);
        self.writes_per_bank[i] += 1;
    }

    pub fn reads(&self, rank: usize, bank: usize) -> u64 {
        self.reads_per_bank[self.seq(rank, bank)]
    }

    pub fn writes(&self, rank: usize, bank: usize) -> u64 {
        self.writes_per_bank[self.seq(rank, bank)]
    }

    pub fn grand_total_accesses(&self, rank: usize, bank: usize) -> u64 {
        self.grand_total_accesses[self.seq(rank, bank)]
    }

    pub fn epoch_latency(&self, rank: usize, bank: usize) -> u64 {
        self.epoch_latency[self.seq(rank, bank)]
    }

    /// Records a completed read's total latency into the per-bank epoch
    /// accumulator and the binned histogram.
    pub fn insert_latency(&mut self, latency: u64, rank: usize, bank: usize) {
        let i = self.seq(rank, bank);
        self.epoch_latency[i] += latency;
        let bin = latency / self.bin_size * self.bin_size;
        *self.latencies.entry(bin).or_insert(0) += 1;
    }

    /// Records a completed read's access latency (activation to return).
    pub fn insert_access_latency(&mut self, latency: u64) {
        let bin = latency / self.bin_size * self.bin_size;
        *self.access_latencies.entry(bin).or_insert(0) += 1;
    }

    pub fn latency_histogram(&self) -> &BTreeMap<u64, u64> {
        &self.latencies
    }

    pub fn access_latency_histogram(&self) -> &BTreeMap<u64, u64> {
        &self.access_latencies
    }

    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Folds the epoch counters into the grand totals and clears them.
    /// Histograms and `total_transactions` persist across epochs.
    pub fn reset_epoch(&mut self) {
        for i in 0..self.reads_per_bank.len() {
            self.grand_total_accesses[i] += self.reads_per_bank[i] + self.writes_per_bank[i];
            self.reads_per_bank[i] = 0;
            self.writes_per_bank[i] = 0;
            self.epoch_latency[i] = 0;
        }
        for rank in 0..self.background_energy.len() {
            self.background_energy[rank] = 0;
            self.burst_energy[rank] = 0;
            self.actpre_energy[rank] = 0;
            self.refresh_energy[rank] = 0;
        }
    }
}

/// Column-oriented CSV sink for the per-epoch dumps.
///
/// The header is built from the first row's field names; every later row
/// must supply the same fields in the same order. Write errors are reported
/// once on stderr and further output is dropped.
pub struct CsvWriter {
    out: BufWriter<File>,
    header: Vec<String>,
    row: Vec<String>,
    header_written: bool,
    failed: bool,
}

impl CsvWriter {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            header: Vec::new(),
            row: Vec::new(),
            header_written: false,
            failed: false,
        })
    }

    /// Builds an indexed column name such as `Bandwidth[0][1][3]`.
    pub fn indexed(base: &str, indices: &[usize]) -> String {
        let mut name = String::from(base);
        for idx in indices {
            name.push_str(&format!("[{}]", idx));
        }
        name
    }

    /// Adds one field to the current row.
    pub fn field(&mut self, name: String, value: f64) {
        if !self.header_written {
            self.header.push(name);
        }
        self.row.push(format!("{:.4}", value));
    }

    /// Flushes the current row (and, the first time, the header).
    pub fn end_row(&mut self) {
        if !self.header_written {
            let header = self.header.join(",");
            self.write_line(&header);
            self.header_written = true;
        }
        let row = self.row.join(",");
        self.write_line(&row);
        self.row.clear();
    }

    /// Writes a raw line, used for the histogram markers and entries.
    pub fn write_line(&mut self, line: &str) {
        if self.failed {
            return;
        }
        if writeln!(self.out, "{}", line).is_err() {
            eprintln!("[!] CSV output failed; further rows dropped");
            self.failed = true;
        }
    }

    pub fn flush(&mut self) {
        self.out.flush().ok();
    }
}
