//! The memory-system model: one channel per instance.
//!
//! A `MemorySystem` bundles a `MemoryController` with the channel clock and
//! the callbacks the CPU model registered. Channels never interact; a
//! multi-channel configuration is a vector of independent instances driven
//! by the same harness clock.

/// Per-bank state machine and timing guards.
pub mod bank;

/// Per-(rank, bank) command queues and issue scheduling.
pub mod command_queue;

/// The cycle-accurate controller: tick loop, buses, energy, return path.
pub mod controller;

/// Transaction and bus-packet value types.
pub mod packet;

/// Rank model: read-return latency, refresh and power-down flags.
pub mod rank;

use std::sync::Arc;

use crate::common::error::ModelFault;
use crate::config::Config;
use crate::stats::CsvWriter;
use self::controller::MemoryController;
use self::packet::{Transaction, TransactionKind};

/// Read-completion / write-completion notification:
/// `(system_id, physical_address, cycle)`.
pub type TransactionCallback = Box<dyn FnMut(u32, u64, u64)>;

/// Per-rank power report at each statistics dump:
/// `(background_w, burst_w, refresh_w, actpre_w)`.
pub type PowerCallback = Box<dyn FnMut(f64, f64, f64, f64)>;

/// Callbacks registered by the CPU model at init. All optional; an absent
/// callback is a no-op.
#[derive(Default)]
pub struct Callbacks {
    pub read_done: Option<TransactionCallback>,
    pub write_done: Option<TransactionCallback>,
    pub report_power: Option<PowerCallback>,
}

/// One independent memory channel.
pub struct MemorySystem {
    pub system_id: u32,
    cfg: Arc<Config>,
    pub controller: MemoryController,
    current_clock_cycle: u64,
}

impl MemorySystem {
    pub fn new(cfg: Arc<Config>, system_id: u32, csv: Option<CsvWriter>) -> Self {
        let controller = MemoryController::new(cfg.clone(), system_id, csv);
        Self {
            system_id,
            cfg,
            controller,
            current_clock_cycle: 0,
        }
    }

    /// Registers the CPU model's completion and power callbacks.
    pub fn register_callbacks(
        &mut self,
        read_done: Option<TransactionCallback>,
        write_done: Option<TransactionCallback>,
        report_power: Option<PowerCallback>,
    ) {
        self.controller.callbacks = Callbacks {
            read_done,
            write_done,
            report_power,
        };
    }

    pub fn will_accept_transaction(&self) -> bool {
        self.controller.will_accept_transaction()
    }

    /// Submits a read or write request. Returns false under backpressure.
    pub fn add_transaction(&mut self, kind: TransactionKind, addr: u64) -> bool {
        self.controller
            .add_transaction(Transaction::new(kind, addr, 0), self.current_clock_cycle)
    }

    /// Advances the channel by one memory clock cycle, dumping epoch
    /// statistics on epoch boundaries.
    pub fn update(&mut self) -> Result<(), ModelFault> {
        let now = self.current_clock_cycle;
        if now > 0 && now % self.cfg.system.epoch_length == 0 {
            self.controller.print_stats(false, now);
        }
        self.controller.update(now)?;
        self.current_clock_cycle += 1;
        Ok(())
    }

    pub fn current_clock_cycle(&self) -> u64 {
        self.current_clock_cycle
    }

    /// Final statistics dump, including the latency histograms.
    pub fn print_stats(&mut self) {
        self.controller.print_stats(true, self.current_clock_cycle);
    }

    /// True when no request is queued, in flight, or awaiting return.
    pub fn is_idle(&self) -> bool {
        self.controller.is_idle()
    }
}
