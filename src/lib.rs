//! Cycle-accurate DRAM / STT-MRAM memory-system simulator.
//!
//! This crate models a JEDEC-style memory channel at single-cycle
//! granularity: transactions arriving from a CPU model are decomposed into
//! ACTIVATE / READ / WRITE / PRECHARGE / REFRESH commands, scheduled onto a
//! modeled command bus against per-bank timing guards, and completed over a
//! modeled data bus. Per-rank energy is accounted from JEDEC IDD currents.
//!
//! # Architecture
//!
//! * **Core**: command queue, bank state matrix, bus arbitration, and the
//!   controller tick driving them once per memory clock cycle.
//! * **Technology**: conventional DRAM timing/energy, or SMART STT-MRAM
//!   (sensing deferred to the first column access, free precharge).
//! * **Front-end**: trace-driven harness and CLI; one channel per
//!   `MemorySystem` instance.
//!
//! # Modules
//!
//! * `common`: address mapping and error types.
//! * `config`: device and system profiles, derived timing.
//! * `mem`: the memory model (controller, command queue, banks, ranks).
//! * `sim`: trace reader and multi-channel harness.
//! * `stats`: counters, histograms, and the CSV sink.

/// Address decomposition and the error taxonomy.
pub mod common;

/// Device/system profile loading, validation, and derived timing.
pub mod config;

/// The memory model: controller, command queue, bank and rank state.
pub mod mem;

/// Trace-driven simulation harness.
pub mod sim;

/// Statistics collection and CSV output.
pub mod stats;
