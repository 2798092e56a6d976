//! Integration tests for the bank state machine.

use std::sync::Arc;

use mramsim::config::{Config, DeviceProfile, SystemProfile, Technology};
use mramsim::mem::bank::{BankMode, BankState};
use mramsim::mem::packet::CommandKind;

fn test_config(technology: Technology) -> Arc<Config> {
    let device = DeviceProfile {
        technology,
        ..Default::default()
    };
    Arc::new(Config::new(device, SystemProfile::default()).unwrap())
}

/// A fresh bank sits idle with all guards open.
#[test]
fn test_bank_initial_state() {
    let bank = BankState::new();
    assert_eq!(bank.mode, BankMode::Idle);
    assert_eq!(bank.open_row, None);
    assert_eq!(bank.state_countdown, 0);
    assert_eq!(bank.next_activate, 0);
    assert_eq!(bank.next_read, 0);
}

/// Auto-precharge on conventional DRAM: the restore interval elapses, then
/// the bank precharges over tRP and lands idle.
#[test]
fn test_auto_precharge_conventional() {
    let cfg = test_config(Technology::Conventional);
    let mut bank = BankState::new();
    bank.mode = BankMode::RowActive;
    bank.open_row = Some(42);
    bank.last_command = Some(CommandKind::ReadP);
    bank.state_countdown = 3;

    bank.tick(&cfg);
    bank.tick(&cfg);
    assert_eq!(bank.mode, BankMode::RowActive);

    bank.tick(&cfg);
    assert_eq!(bank.mode, BankMode::Precharging);
    assert_eq!(bank.open_row, None);
    assert_eq!(bank.last_command, Some(CommandKind::Precharge));
    assert_eq!(bank.state_countdown, cfg.device.t_rp);

    for _ in 0..cfg.device.t_rp {
        bank.tick(&cfg);
    }
    assert_eq!(bank.mode, BankMode::Idle);
}

/// Auto-precharge under SMART: no restore phase, the bank drops straight
/// to idle when the access interval elapses.
#[test]
fn test_auto_precharge_smart() {
    let cfg = test_config(Technology::Smart);
    let mut bank = BankState::new();
    bank.mode = BankMode::RowActive;
    bank.open_row = Some(42);
    bank.last_command = Some(CommandKind::WriteP);
    bank.state_countdown = 1;

    bank.tick(&cfg);
    assert_eq!(bank.mode, BankMode::Idle);
    assert_eq!(bank.open_row, None);
    assert_eq!(bank.state_countdown, 0);
}

/// A refreshing bank returns to idle when tRFC elapses.
#[test]
fn test_refresh_completion() {
    let cfg = test_config(Technology::Conventional);
    let mut bank = BankState::new();
    bank.mode = BankMode::Refreshing;
    bank.last_command = Some(CommandKind::Refresh);
    bank.state_countdown = cfg.device.t_rfc;

    for _ in 0..cfg.device.t_rfc - 1 {
        bank.tick(&cfg);
    }
    assert_eq!(bank.mode, BankMode::Refreshing);
    bank.tick(&cfg);
    assert_eq!(bank.mode, BankMode::Idle);
}

/// Ticking an idle bank with no countdown is a no-op.
#[test]
fn test_tick_without_countdown() {
    let cfg = test_config(Technology::Conventional);
    let mut bank = BankState::new();
    bank.tick(&cfg);
    assert_eq!(bank.mode, BankMode::Idle);
    assert_eq!(bank.state_countdown, 0);
}
