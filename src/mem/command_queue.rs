//! Per-(rank, bank) command queues and the issue scheduler.
//!
//! Decomposed commands wait here until their bank's timing guards allow
//! issue. `pop` picks at most one command per cycle: refresh housekeeping
//! first (closing open banks, then the REFRESH itself), then the oldest
//! issuable command under the configured scheduling policy, and finally —
//! under open-page — a precharge for any open row with no remaining hits.
//!
//! Row-buffer accounting lives here: a miss is counted when an ACTIVATE
//! issues, a hit when a column command issues against an already-open row
//! and its now-redundant ACTIVATE is dropped from the queue.

use std::sync::Arc;

use crate::config::{Config, RowBufferPolicy, SchedulerPolicy};
use crate::mem::bank::{BankMode, BankState};
use crate::mem::packet::{BusPacket, CommandKind};

/// Two-dimensional buffer of pending bus packets, indexed by (rank, bank).
pub struct CommandQueue {
    cfg: Arc<Config>,
    queues: Vec<Vec<Vec<BusPacket>>>,

    row_buffer_hits: Vec<Vec<u64>>,
    row_buffer_misses: Vec<Vec<u64>>,

    /// Rank whose refresh interval has expired, if any. While set, no new
    /// work is issued to that rank until its REFRESH goes out.
    refresh_rank: Option<usize>,

    /// Round-robin cursor for the rank-then-bank policy.
    next_rank: usize,

    /// Monotonic arrival stamp for FCFS ordering.
    seq: u64,
}

impl CommandQueue {
    pub fn new(cfg: Arc<Config>) -> Self {
        let ranks = cfg.num_ranks();
        let banks = cfg.num_banks();
        Self {
            cfg,
            queues: vec![vec![Vec::new(); banks]; ranks],
            row_buffer_hits: vec![vec![0; banks]; ranks],
            row_buffer_misses: vec![vec![0; banks]; ranks],
            refresh_rank: None,
            next_rank: 0,
            seq: 0,
        }
    }

    /// Whether `count` more commands fit in the (rank, bank) queue.
    ///
    /// Admission is all-or-nothing: the controller reserves room for the
    /// whole (ACTIVATE, column) pair before enqueuing either.
    pub fn has_room_for(&self, count: usize, rank: usize, bank: usize) -> bool {
        self.queues[rank][bank].len() + count <= self.cfg.system.cmd_queue_depth
    }

    /// Appends a packet in arrival order.
    pub fn enqueue(&mut self, mut packet: BusPacket) {
        packet.seq = self.seq;
        self.seq += 1;
        self.queues[packet.rank][packet.bank].push(packet);
    }

    /// Marks a rank as due for refresh; its queues drain no new work until
    /// the REFRESH command has issued.
    pub fn need_refresh(&mut self, rank: usize) {
        self.refresh_rank = Some(rank);
    }

    pub fn refresh_pending(&self) -> Option<usize> {
        self.refresh_rank
    }

    /// True when no command is pending for any bank of `rank`.
    pub fn is_empty(&self, rank: usize) -> bool {
        self.queues[rank].iter().all(|q| q.is_empty())
    }

    /// True when every queue in every rank is empty.
    pub fn is_fully_empty(&self) -> bool {
        (0..self.cfg.num_ranks()).all(|r| self.is_empty(r))
    }

    pub fn row_buffer_hits(&self, rank: usize, bank: usize) -> u64 {
        self.row_buffer_hits[rank][bank]
    }

    pub fn row_buffer_misses(&self, rank: usize, bank: usize) -> u64 {
        self.row_buffer_misses[rank][bank]
    }

    pub fn total_row_buffer_hits(&self) -> u64 {
        self.row_buffer_hits.iter().flatten().sum()
    }

    pub fn total_row_buffer_misses(&self) -> u64 {
        self.row_buffer_misses.iter().flatten().sum()
    }

    /// Clears the per-epoch row-buffer counters.
    pub fn reset_row_buffer_stats(&mut self) {
        for per_rank in &mut self.row_buffer_hits {
            per_rank.iter_mut().for_each(|c| *c = 0);
        }
        for per_rank in &mut self.row_buffer_misses {
            per_rank.iter_mut().for_each(|c| *c = 0);
        }
    }

    /// Returns the next command the bank states permit this cycle, if any.
    pub fn pop(&mut self, banks: &[Vec<BankState>], now: u64) -> Option<BusPacket> {
        if let Some(rank) = self.refresh_rank {
            if let Some(packet) = self.try_refresh(rank, banks, now) {
                return Some(packet);
            }
        }
        if let Some(packet) = self.scan_regular(banks, now) {
            return Some(packet);
        }
        self.try_close_rows(banks, now)
    }

    /// Refresh housekeeping for the rank whose interval expired.
    ///
    /// Open banks are drained of pending hits to their open row, then
    /// precharged; once every bank sits idle past its `next_activate`, the
    /// REFRESH itself goes out and the gate lifts.
    fn try_refresh(
        &mut self,
        rank: usize,
        banks: &[Vec<BankState>],
        now: u64,
    ) -> Option<BusPacket> {
        let num_banks = self.cfg.num_banks();
        let mut send_refresh = true;

        for bank in 0..num_banks {
            let state = &banks[rank][bank];
            match state.mode {
                BankMode::RowActive => {
                    send_refresh = false;
                    let open_row = state.open_row.unwrap_or(0);

                    // Let queued hits to the open row go first; an ACTIVATE
                    // to that row means the pair will simply re-open it
                    // after the refresh, so the bank may close now.
                    let mut close_row = true;
                    let mut pop_at = None;
                    for (i, packet) in self.queues[rank][bank].iter().enumerate() {
                        if packet.row != open_row {
                            continue;
                        }
                        if packet.kind == CommandKind::Activate {
                            break;
                        }
                        close_row = false;
                        if Self::issuable(packet, banks, now) {
                            pop_at = Some(i);
                        }
                        break;
                    }

                    if let Some(i) = pop_at {
                        let packet = self.queues[rank][bank].remove(i);
                        return Some(packet);
                    }
                    if close_row && now >= state.next_precharge {
                        return Some(Self::synthesize(
                            CommandKind::Precharge,
                            rank,
                            bank,
                            open_row,
                        ));
                    }
                    return None;
                }
                BankMode::Idle if now >= state.next_activate => {}
                _ => {
                    send_refresh = false;
                    break;
                }
            }
        }

        if send_refresh {
            self.refresh_rank = None;
            return Some(Self::synthesize(CommandKind::Refresh, rank, 0, 0));
        }
        None
    }

    /// Scans the queues for the oldest issuable packet under the configured
    /// scheduling policy, skipping any rank gated behind a refresh.
    fn scan_regular(&mut self, banks: &[Vec<BankState>], now: u64) -> Option<BusPacket> {
        let num_ranks = self.cfg.num_ranks();
        let num_banks = self.cfg.num_banks();

        match self.cfg.system.scheduler_policy {
            SchedulerPolicy::RankThenBank => {
                for offset in 0..num_ranks {
                    let rank = (self.next_rank + offset) % num_ranks;
                    if self.refresh_rank == Some(rank) {
                        continue;
                    }
                    let mut best: Option<(usize, usize, u64)> = None;
                    for bank in 0..num_banks {
                        if let Some((idx, seq)) = self.candidate(rank, bank, banks, now) {
                            if best.map_or(true, |(_, _, s)| seq < s) {
                                best = Some((bank, idx, seq));
                            }
                        }
                    }
                    if let Some((bank, idx, _)) = best {
                        self.next_rank = (rank + 1) % num_ranks;
                        return Some(self.finalize_pop(rank, bank, idx));
                    }
                }
                None
            }
            SchedulerPolicy::Fcfs => {
                let mut best: Option<(usize, usize, usize, u64)> = None;
                for rank in 0..num_ranks {
                    if self.refresh_rank == Some(rank) {
                        continue;
                    }
                    for bank in 0..num_banks {
                        if let Some((idx, seq)) = self.candidate(rank, bank, banks, now) {
                            if best.map_or(true, |(_, _, _, s)| seq < s) {
                                best = Some((rank, bank, idx, seq));
                            }
                        }
                    }
                }
                best.map(|(rank, bank, idx, _)| self.finalize_pop(rank, bank, idx))
            }
        }
    }

    /// First issuable packet in one bank queue that no older command to the
    /// same row is still waiting ahead of.
    fn candidate(
        &self,
        rank: usize,
        bank: usize,
        banks: &[Vec<BankState>],
        now: u64,
    ) -> Option<(usize, u64)> {
        let queue = &self.queues[rank][bank];
        for (i, packet) in queue.iter().enumerate() {
            if !Self::issuable(packet, banks, now) {
                continue;
            }
            let overtakes = queue[..i]
                .iter()
                .any(|prev| prev.kind != CommandKind::Activate && prev.row == packet.row);
            if overtakes {
                continue;
            }
            return Some((i, packet.seq));
        }
        None
    }

    /// Removes the chosen packet and settles row-buffer accounting.
    ///
    /// A column command taken while its row was already open leaves a
    /// redundant ACTIVATE behind it in the queue; that ACTIVATE is dropped
    /// and the access counts as a row-buffer hit. An issued ACTIVATE counts
    /// as a miss.
    fn finalize_pop(&mut self, rank: usize, bank: usize, idx: usize) -> BusPacket {
        let packet = self.queues[rank][bank].remove(idx);
        match packet.kind {
            CommandKind::Activate => {
                self.row_buffer_misses[rank][bank] += 1;
            }
            kind if kind.is_column() => {
                let queue = &mut self.queues[rank][bank];
                if let Some(stale) = queue[..idx]
                    .iter()
                    .position(|p| p.kind == CommandKind::Activate && p.addr == packet.addr)
                {
                    queue.remove(stale);
                    self.row_buffer_hits[rank][bank] += 1;
                }
            }
            _ => {}
        }
        packet
    }

    /// Under open-page, precharges a bank whose open row has no pending
    /// work while other rows wait behind it.
    fn try_close_rows(&self, banks: &[Vec<BankState>], now: u64) -> Option<BusPacket> {
        if self.cfg.system.row_buffer_policy != RowBufferPolicy::OpenPage {
            return None;
        }
        for rank in 0..self.cfg.num_ranks() {
            if self.refresh_rank == Some(rank) {
                continue;
            }
            for bank in 0..self.cfg.num_banks() {
                let state = &banks[rank][bank];
                if state.mode != BankMode::RowActive {
                    continue;
                }
                let queue = &self.queues[rank][bank];
                let open_row = state.open_row.unwrap_or(0);
                let row_pending = queue.iter().any(|p| p.row == open_row);
                if !queue.is_empty() && !row_pending && now >= state.next_precharge {
                    return Some(Self::synthesize(
                        CommandKind::Precharge,
                        rank,
                        bank,
                        open_row,
                    ));
                }
            }
        }
        None
    }

    /// Issuability test against the owning bank's guards.
    fn issuable(packet: &BusPacket, banks: &[Vec<BankState>], now: u64) -> bool {
        let state = &banks[packet.rank][packet.bank];
        match packet.kind {
            CommandKind::Activate => state.mode == BankMode::Idle && now >= state.next_activate,
            CommandKind::Read | CommandKind::ReadP => {
                state.mode == BankMode::RowActive
                    && now >= state.next_read
                    && state.open_row == Some(packet.row)
            }
            CommandKind::Write | CommandKind::WriteP => {
                state.mode == BankMode::RowActive
                    && now >= state.next_write
                    && state.open_row == Some(packet.row)
            }
            CommandKind::Precharge => {
                state.mode == BankMode::RowActive && now >= state.next_precharge
            }
            CommandKind::Refresh | CommandKind::Data => false,
        }
    }

    fn synthesize(kind: CommandKind, rank: usize, bank: usize, row: u64) -> BusPacket {
        BusPacket {
            kind,
            addr: 0,
            row,
            col: 0,
            rank,
            bank,
            data: 0,
            seq: 0,
        }
    }
}
