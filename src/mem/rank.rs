//! Rank model: the far end of the command bus.
//!
//! A rank receives command packets from the controller, schedules read data
//! for the return trip, and tracks the power-down and refresh-waiting flags
//! the controller consults for energy accounting and wake-up.

use std::sync::Arc;

use crate::config::Config;
use crate::mem::packet::{BusPacket, CommandKind};

/// One rank of ganged devices sharing a chip select.
pub struct Rank {
    pub id: usize,
    cfg: Arc<Config>,

    /// Set by the controller when this rank's refresh interval expires;
    /// cleared when the REFRESH command arrives.
    pub refresh_waiting: bool,
    pub powered_down: bool,

    /// Read bursts awaiting their access latency, oldest first.
    /// Each entry holds the DATA packet and the cycle it claims the bus.
    read_return: Vec<(BusPacket, u64)>,
}

impl Rank {
    pub fn new(id: usize, cfg: Arc<Config>) -> Self {
        Self {
            id,
            cfg,
            refresh_waiting: false,
            powered_down: false,
            read_return: Vec::new(),
        }
    }

    /// Accepts one packet from the command or data bus.
    ///
    /// READ/READ_P schedule the answering DATA burst so that it occupies
    /// the data bus exactly `read_latency` cycles after the command was
    /// issued (the command spent `t_cmd` on the command bus already).
    pub fn receive_from_bus(&mut self, packet: BusPacket, now: u64) {
        match packet.kind {
            CommandKind::Read | CommandKind::ReadP => {
                let ready_at = now + self.cfg.timing.read_latency - self.cfg.device.t_cmd;
                let data = BusPacket {
                    kind: CommandKind::Data,
                    seq: 0,
                    ..packet
                };
                self.read_return.push((data, ready_at));
            }
            CommandKind::Refresh => {
                self.refresh_waiting = false;
            }
            // Activates, precharges, and arriving write bursts need no
            // rank-side bookkeeping; bank state lives with the controller.
            CommandKind::Activate
            | CommandKind::Precharge
            | CommandKind::Write
            | CommandKind::WriteP
            | CommandKind::Data => {}
        }
    }

    /// Takes the oldest read burst whose access latency has elapsed.
    pub fn take_ready_data(&mut self, now: u64) -> Option<BusPacket> {
        match self.read_return.first() {
            Some((_, ready_at)) if *ready_at <= now => Some(self.read_return.remove(0).0),
            _ => None,
        }
    }

    /// True while read data is still in flight inside this rank.
    pub fn has_pending_data(&self) -> bool {
        !self.read_return.is_empty()
    }

    pub fn power_down(&mut self) {
        self.powered_down = true;
    }

    pub fn power_up(&mut self) {
        self.powered_down = false;
    }
}
