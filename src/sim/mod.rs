//! Trace-driven simulation harness.
//!
//! Drives one `MemorySystem` per configured channel off a shared cycle
//! clock: due trace records are issued in file order (stalling the stream
//! under backpressure), every channel ticks once per cycle, and the run
//! ends when the trace has drained and every channel is idle — or at the
//! cycle cap.

/// Trace file reader.
pub mod trace;

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use crate::common::addr::AddressMapping;
use crate::common::error::ModelFault;
use crate::config::Config;
use crate::mem::MemorySystem;
use crate::stats::CsvWriter;
use self::trace::TraceRecord;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct SimSummary {
    pub cycles: u64,
    pub records_issued: usize,
    pub reads_returned: u64,
    pub writes_completed: u64,
}

/// Multi-channel trace simulator.
pub struct TraceSimulator {
    channels: Vec<MemorySystem>,
    mapping: AddressMapping,
    records: Vec<TraceRecord>,
    reads_returned: Rc<Cell<u64>>,
    writes_completed: Rc<Cell<u64>>,
}

impl TraceSimulator {
    /// Builds the channels and registers counting callbacks on each.
    ///
    /// When `csv_path` is set and the system profile enables
    /// `vis_file_output`, channel `n` writes to `<csv_path>.chan<n>`.
    pub fn new(
        cfg: Arc<Config>,
        records: Vec<TraceRecord>,
        csv_path: Option<&str>,
    ) -> std::io::Result<Self> {
        let reads_returned = Rc::new(Cell::new(0u64));
        let writes_completed = Rc::new(Cell::new(0u64));

        let mut channels = Vec::new();
        for chan in 0..cfg.system.num_chans as u32 {
            let csv = match csv_path {
                Some(base) if cfg.system.vis_file_output => {
                    let path = format!("{}.chan{}", base, chan);
                    Some(CsvWriter::new(Path::new(&path))?)
                }
                _ => None,
            };
            let mut system = MemorySystem::new(cfg.clone(), chan, csv);

            let reads = reads_returned.clone();
            let writes = writes_completed.clone();
            system.register_callbacks(
                Some(Box::new(move |_id, _addr, _cycle| {
                    reads.set(reads.get() + 1);
                })),
                Some(Box::new(move |_id, _addr, _cycle| {
                    writes.set(writes.get() + 1);
                })),
                None,
            );
            channels.push(system);
        }

        let mapping = AddressMapping::new(&cfg);
        Ok(Self {
            channels,
            mapping,
            records,
            reads_returned,
            writes_completed,
        })
    }

    /// Runs until the trace drains and all channels go idle, or until
    /// `max_cycles`. Ends with the final statistics dump per channel.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<SimSummary, ModelFault> {
        let mut next_record = 0;
        let mut cycle = 0u64;

        loop {
            // Issue due records in file order; a full queue stalls the
            // stream until a later cycle.
            while next_record < self.records.len() && self.records[next_record].cycle <= cycle {
                let record = self.records[next_record];
                let chan = self.mapping.map(record.addr).chan % self.channels.len();
                if !self.channels[chan].add_transaction(record.kind, record.addr) {
                    break;
                }
                next_record += 1;
            }

            for channel in &mut self.channels {
                channel.update()?;
            }
            cycle += 1;

            let drained =
                next_record == self.records.len() && self.channels.iter().all(|c| c.is_idle());
            let capped = max_cycles.is_some_and(|cap| cycle >= cap);
            if drained || capped {
                break;
            }
        }

        for channel in &mut self.channels {
            channel.print_stats();
        }

        Ok(SimSummary {
            cycles: cycle,
            records_issued: next_record,
            reads_returned: self.reads_returned.get(),
            writes_completed: self.writes_completed.get(),
        })
    }
}
