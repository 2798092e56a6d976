//! Integration tests for the memory controller tick loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use mramsim::common::addr::MappingScheme;
use mramsim::config::{Config, DeviceProfile, SystemProfile, Technology};
use mramsim::mem::packet::TransactionKind;
use mramsim::mem::MemorySystem;

/// One rank, eight banks, open-page, column bits in the low address bits so
/// that consecutive bursts stay in one row.
fn test_config(technology: Technology) -> Arc<Config> {
    let device = DeviceProfile {
        technology,
        ..Default::default()
    };
    let system = SystemProfile {
        num_ranks: 1,
        address_mapping: MappingScheme::ChanRankRowBankCol,
        epoch_length: 10_000_000,
        ..Default::default()
    };
    Arc::new(Config::new(device, system).unwrap())
}

/// Builds a channel that records every read completion as (addr, cycle).
fn system_with_log(cfg: Arc<Config>) -> (MemorySystem, Rc<RefCell<Vec<(u64, u64)>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut system = MemorySystem::new(cfg, 0, None);
    let sink = log.clone();
    system.register_callbacks(
        Some(Box::new(move |_id, addr, cycle| {
            sink.borrow_mut().push((addr, cycle));
        })),
        None,
        None,
    );
    (system, log)
}

fn run_until(system: &mut MemorySystem, cycle: u64) {
    while system.current_clock_cycle() < cycle {
        system.update().expect("model fault");
    }
}

/// A single read to a cold bank completes after
/// 1 + tRCD + CL + BL/2 cycles: ACTIVATE at cycle 1, READ at 1 + tRCD,
/// data on the bus at 1 + tRCD + CL, return BL/2 later.
#[test]
fn test_single_read_cold_bank() {
    let cfg = test_config(Technology::Conventional);
    let (mut system, log) = system_with_log(cfg);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 200);

    assert_eq!(log.borrow().as_slice(), &[(0x1000, 25)]);
    assert_eq!(system.controller.command_queue.row_buffer_misses(0, 0), 1);
    assert_eq!(system.controller.command_queue.row_buffer_hits(0, 0), 0);
    assert!(system.is_idle());
}

/// A second read to the already-open row skips its ACTIVATE and counts as
/// a row-buffer hit; exactly one ACTIVATE issues in total.
#[test]
fn test_two_reads_same_row() {
    let cfg = test_config(Technology::Conventional);
    let (mut system, log) = system_with_log(cfg);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 1);
    assert!(system.add_transaction(TransactionKind::Read, 0x1040));
    run_until(&mut system, 200);

    assert_eq!(log.borrow().as_slice(), &[(0x1000, 25), (0x1040, 29)]);
    assert_eq!(system.controller.command_queue.row_buffer_misses(0, 0), 1);
    assert_eq!(system.controller.command_queue.row_buffer_hits(0, 0), 1);
}

/// Reads to two different rows of the same bank force a precharge between
/// them, honoring tRAS before the precharge and tRP before the reactivate:
/// READ1 at 11, PRECHARGE at 1 + tRAS = 25, ACTIVATE at 35, READ2 at 45.
#[test]
fn test_two_reads_row_conflict() {
    let cfg = test_config(Technology::Conventional);
    let (mut system, log) = system_with_log(cfg);

    // Row bits start above col (10) + bank (3) + offset (6).
    let row1_addr = 0x1000u64 + (1 << 19);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 1);
    assert!(system.add_transaction(TransactionKind::Read, row1_addr));
    run_until(&mut system, 300);

    assert_eq!(log.borrow().as_slice(), &[(0x1000, 25), (row1_addr, 59)]);
    assert_eq!(system.controller.command_queue.row_buffer_misses(0, 0), 2);
    assert_eq!(system.controller.command_queue.row_buffer_hits(0, 0), 0);
}

/// A full transaction queue rejects new work until admission frees a slot.
#[test]
fn test_transaction_queue_backpressure() {
    let device = DeviceProfile::default();
    let system_profile = SystemProfile {
        num_ranks: 1,
        trans_queue_depth: 2,
        address_mapping: MappingScheme::ChanRankRowBankCol,
        epoch_length: 10_000_000,
        ..Default::default()
    };
    let cfg = Arc::new(Config::new(device, system_profile).unwrap());
    let (mut system, _log) = system_with_log(cfg);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    assert!(system.add_transaction(TransactionKind::Read, 0x2000));
    assert!(!system.will_accept_transaction());
    assert!(!system.add_transaction(TransactionKind::Read, 0x3000));

    // One update admits one transaction into the command queue.
    system.update().unwrap();
    assert!(system.will_accept_transaction());
    assert!(system.add_transaction(TransactionKind::Read, 0x3000));
}

/// Concurrent reads to the same address return in issue order.
#[test]
fn test_same_address_reads_fifo() {
    let cfg = test_config(Technology::Conventional);
    let (mut system, log) = system_with_log(cfg);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 1);
    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 200);

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], (0x1000, 25));
    assert_eq!(log[1].0, 0x1000);
    assert!(log[1].1 > 25);
    assert_eq!(system.controller.pending_read_count(), 0);
}

/// A write's data follows its WRITE command after WL cycles and the
/// completion callback fires once the burst finishes.
#[test]
fn test_write_data_done_timing() {
    let cfg = test_config(Technology::Conventional);
    let done = Rc::new(RefCell::new(Vec::new()));
    let mut system = MemorySystem::new(cfg, 0, None);
    let sink = done.clone();
    system.register_callbacks(
        None,
        Some(Box::new(move |_id, addr, cycle| {
            sink.borrow_mut().push((addr, cycle));
        })),
        None,
    );

    assert!(system.add_transaction(TransactionKind::Write, 0x1000));
    run_until(&mut system, 200);

    // WRITE issues at 1 + tRCD = 11; data at 11 + WL = 20; done at 24.
    assert_eq!(done.borrow().as_slice(), &[(0x1000, 24)]);
    assert_eq!(system.controller.stats.total_transactions, 1);
    assert!(system.is_idle());
}

/// Close-page decomposition auto-precharges after every access: a second
/// read to the same row still pays a full activate.
#[test]
fn test_close_page_always_misses() {
    let device = DeviceProfile::default();
    let system_profile = SystemProfile {
        num_ranks: 1,
        row_buffer_policy: mramsim::config::RowBufferPolicy::ClosePage,
        address_mapping: MappingScheme::ChanRankRowBankCol,
        epoch_length: 10_000_000,
        ..Default::default()
    };
    let cfg = Arc::new(Config::new(device, system_profile).unwrap());
    let (mut system, log) = system_with_log(cfg);

    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    run_until(&mut system, 100);
    assert!(system.add_transaction(TransactionKind::Read, 0x1040));
    run_until(&mut system, 400);

    assert_eq!(log.borrow().len(), 2);
    assert_eq!(system.controller.command_queue.row_buffer_misses(0, 0), 2);
    assert_eq!(system.controller.command_queue.row_buffer_hits(0, 0), 0);
}

/// Reads to two different banks pipeline on the data bus and return in
/// data-arrival order, not admission order.
#[test]
fn test_reads_different_banks_pipeline() {
    let cfg = test_config(Technology::Conventional);
    let (mut system, log) = system_with_log(cfg);

    // Bank bits sit above the 10 column bits.
    let bank1_addr = 0x1000u64 + (1 << 16);
    assert!(system.add_transaction(TransactionKind::Read, 0x1000));
    assert!(system.add_transaction(TransactionKind::Read, bank1_addr));
    run_until(&mut system, 300);

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].0, 0x1000);
    assert_eq!(log[1].0, bank1_addr);
    assert!(log[0].1 < log[1].1);
    // Bursts never overlap: returns are at least BL/2 apart.
    assert!(log[1].1 - log[0].1 >= 4);
}
