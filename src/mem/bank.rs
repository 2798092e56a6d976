//! Per-bank state machine and timing guards.
//!
//! Each (rank, bank) pair carries one `BankState`: the current mode of the
//! bank array, the open row if any, and a set of "not before" timestamps
//! that gate every command kind. Explicit commands update the guards from
//! the controller; implicit transitions (auto-precharge completion, end of
//! precharge or refresh) fire here when `state_countdown` reaches zero.

use crate::config::Config;
use crate::mem::packet::CommandKind;

/// Operating mode of one bank array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankMode {
    #[default]
    Idle,
    RowActive,
    Precharging,
    Refreshing,
    PowerDown,
}

/// Timing and row-buffer state of one bank.
#[derive(Debug, Clone, Default)]
pub struct BankState {
    pub mode: BankMode,
    /// Row latched in the sense amps; `Some` exactly while `RowActive`.
    pub open_row: Option<u64>,
    pub last_command: Option<CommandKind>,
    /// Cycles until the implicit transition for `last_command` fires.
    pub state_countdown: u64,

    pub next_read: u64,
    pub next_write: u64,
    pub next_activate: u64,
    pub next_precharge: u64,
    pub next_power_up: u64,
}

impl BankState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the implicit-transition countdown by one cycle.
    ///
    /// Auto-precharge commands leave the bank restoring for
    /// `read_to_pre_delay`/`write_to_pre_delay`; when that elapses the bank
    /// precharges (instantly under SMART, over `t_rp` otherwise).
    pub fn tick(&mut self, cfg: &Config) {
        if self.state_countdown == 0 {
            return;
        }
        self.state_countdown -= 1;
        if self.state_countdown > 0 {
            return;
        }

        match self.last_command {
            Some(CommandKind::ReadP) | Some(CommandKind::WriteP) => {
                self.open_row = None;
                if cfg.is_smart() {
                    self.mode = BankMode::Idle;
                    self.last_command = Some(CommandKind::Precharge);
                } else {
                    self.mode = BankMode::Precharging;
                    self.last_command = Some(CommandKind::Precharge);
                    self.state_countdown = cfg.device.t_rp;
                }
            }
            Some(CommandKind::Precharge) | Some(CommandKind::Refresh) => {
                self.mode = BankMode::Idle;
            }
            _ => {}
        }
    }
}
