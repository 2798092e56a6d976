//! The cycle-accurate memory controller.
//!
//! Owns the bank state matrix, the command queue, the rank array, and both
//! modeled buses. `update` advances the channel by exactly one memory clock
//! cycle: implicit bank transitions, bus countdowns, the write-data FIFO,
//! the refresh gate, one command issue, one transaction admission, energy
//! accounting, power management, and the read return path, in that order.
//!
//! The conventional/SMART technology split is confined to three places:
//! the ACTIVATE handler, the PRECHARGE handler, and the first column
//! command after an ACTIVATE (where SMART pays the deferred sensing
//! energy).

use std::sync::Arc;

use crate::common::addr::AddressMapping;
use crate::common::error::ModelFault;
use crate::config::Config;
use crate::mem::bank::{BankMode, BankState};
use crate::mem::command_queue::CommandQueue;
use crate::mem::packet::{BusPacket, CommandKind, Transaction, TransactionKind};
use crate::mem::rank::Rank;
use crate::mem::Callbacks;
use crate::stats::{ChannelStats, CsvWriter};

/// A burst occupying the shared data bus.
struct DataTransfer {
    packet: BusPacket,
    cycles_left: u64,
    /// True for read data heading back to the controller, false for write
    /// data heading out to a rank.
    inbound: bool,
}

pub struct MemoryController {
    cfg: Arc<Config>,
    system_id: u32,
    mapping: AddressMapping,

    banks: Vec<Vec<BankState>>,
    pub command_queue: CommandQueue,
    ranks: Vec<Rank>,

    transaction_queue: Vec<Transaction>,
    pending_reads: Vec<Transaction>,
    return_queue: Vec<Transaction>,

    write_data_to_send: Vec<BusPacket>,
    write_data_countdown: Vec<u64>,

    outgoing_cmd: Option<BusPacket>,
    cmd_cycles_left: u64,
    data_bus: Option<DataTransfer>,

    refresh_countdown: Vec<u64>,
    refresh_rank: usize,

    pub callbacks: Callbacks,
    pub stats: ChannelStats,
    csv: Option<CsvWriter>,
}

impl MemoryController {
    pub fn new(cfg: Arc<Config>, system_id: u32, csv: Option<CsvWriter>) -> Self {
        let num_ranks = cfg.num_ranks();
        let num_banks = cfg.num_banks();

        let banks = vec![vec![BankState::new(); num_banks]; num_ranks];
        let ranks = (0..num_ranks).map(|r| Rank::new(r, cfg.clone())).collect();

        // Stagger refreshes so the ranks never pause simultaneously.
        let slice = cfg.timing.refresh_cycles / num_ranks as u64;
        let refresh_countdown = (0..num_ranks as u64).map(|r| slice * (r + 1)).collect();

        let stats = ChannelStats::new(num_ranks, num_banks, cfg.system.histogram_bin_size);
        let command_queue = CommandQueue::new(cfg.clone());
        let mapping = AddressMapping::new(&cfg);

        Self {
            cfg,
            system_id,
            mapping,
            banks,
            command_queue,
            ranks,
            transaction_queue: Vec::new(),
            pending_reads: Vec::new(),
            return_queue: Vec::new(),
            write_data_to_send: Vec::new(),
            write_data_countdown: Vec::new(),
            outgoing_cmd: None,
            cmd_cycles_left: 0,
            data_bus: None,
            refresh_countdown,
            refresh_rank: 0,
            callbacks: Callbacks::default(),
            stats,
            csv,
        }
    }

    /// True while the transaction queue has room.
    pub fn will_accept_transaction(&self) -> bool {
        self.transaction_queue.len() < self.cfg.system.trans_queue_depth
    }

    /// Enqueues a request, stamping its arrival cycle. Returns false under
    /// backpressure; the caller retries on a later cycle.
    pub fn add_transaction(&mut self, mut trans: Transaction, now: u64) -> bool {
        if !self.will_accept_transaction() {
            return false;
        }
        trans.time_added = now;
        self.transaction_queue.push(trans);
        true
    }

    /// Advances the channel by one memory clock cycle.
    pub fn update(&mut self, now: u64) -> Result<(), ModelFault> {
        let cfg = self.cfg.clone();
        let num_ranks = cfg.num_ranks();

        // Implicit bank transitions (auto-precharge, precharge, refresh).
        for per_rank in &mut self.banks {
            for bank in per_rank {
                bank.tick(&cfg);
            }
        }

        // Command in flight reaches its rank after t_cmd cycles.
        if self.outgoing_cmd.is_some() {
            self.cmd_cycles_left -= 1;
            if self.cmd_cycles_left == 0 {
                let packet = self.outgoing_cmd.take().unwrap();
                self.ranks[packet.rank].receive_from_bus(packet, now);
            }
        }

        // Data burst in flight completes.
        let transfer_done = match self.data_bus.as_mut() {
            Some(transfer) => {
                transfer.cycles_left -= 1;
                transfer.cycles_left == 0
            }
            None => false,
        };
        if transfer_done {
            let transfer = self.data_bus.take().unwrap();
            if transfer.inbound {
                self.receive_from_bus(transfer.packet, now)?;
            } else {
                if let Some(cb) = self.callbacks.write_done.as_mut() {
                    cb(self.system_id, transfer.packet.addr, now);
                }
                self.ranks[transfer.packet.rank].receive_from_bus(transfer.packet, now);
            }
        }

        // Read data leaving a rank claims the data bus for bl/2 beats.
        for rank in &mut self.ranks {
            if let Some(packet) = rank.take_ready_data(now) {
                if self.data_bus.is_some() {
                    return Err(ModelFault::DataBusCollision { cycle: now });
                }
                self.data_bus = Some(DataTransfer {
                    packet,
                    cycles_left: cfg.device.bl / 2,
                    inbound: true,
                });
            }
        }

        // Write data follows its command after wl cycles.
        if !self.write_data_countdown.is_empty() {
            for countdown in &mut self.write_data_countdown {
                *countdown -= 1;
            }
            if self.write_data_countdown[0] == 0 {
                if self.data_bus.is_some() {
                    return Err(ModelFault::DataBusCollision { cycle: now });
                }
                self.write_data_countdown.remove(0);
                let packet = self.write_data_to_send.remove(0);
                self.stats.total_transactions += 1;
                self.stats.add_write(packet.rank, packet.bank);
                self.data_bus = Some(DataTransfer {
                    packet,
                    cycles_left: cfg.device.bl / 2,
                    inbound: false,
                });
            }
        }

        // Refresh gate: expire intervals, pre-wake powered-down ranks.
        let due = self.refresh_rank;
        if self.refresh_countdown[due] == 0 {
            self.command_queue.need_refresh(due);
            self.ranks[due].refresh_waiting = true;
            self.refresh_countdown[due] = cfg.timing.refresh_cycles;
            self.refresh_rank = (due + 1) % num_ranks;
        } else if self.ranks[due].powered_down && self.refresh_countdown[due] <= cfg.device.t_xp {
            self.ranks[due].refresh_waiting = true;
        }

        // Issue at most one command.
        if let Some(packet) = self.command_queue.pop(&self.banks, now) {
            self.verify_guard(&packet, now)?;
            if packet.kind.is_write() {
                self.write_data_to_send.push(packet.data_twin());
                self.write_data_countdown.push(cfg.timing.write_latency);
            }
            self.apply_command(&packet, now);
            if cfg.system.trace_commands {
                println!("[Cmd] cycle {:>8} {}", now, packet);
            }
            if self.outgoing_cmd.is_some() {
                return Err(ModelFault::CommandBusCollision { cycle: now });
            }
            self.cmd_cycles_left = cfg.device.t_cmd;
            self.outgoing_cmd = Some(packet);
        }

        // Admit at most one transaction whose command pair fits.
        for i in 0..self.transaction_queue.len() {
            let decoded = self.mapping.map(self.transaction_queue[i].addr);
            if !self.command_queue.has_room_for(2, decoded.rank, decoded.bank) {
                continue;
            }
            let trans = self.transaction_queue.remove(i);
            let activate = BusPacket::new(CommandKind::Activate, trans.addr, &decoded, 0);
            let column_kind = trans.column_command(cfg.system.row_buffer_policy);
            let column = BusPacket::new(column_kind, trans.addr, &decoded, trans.data);

            // Reads are parked before the commands go in, so the ACTIVATE
            // handler can stamp their activation cycle.
            if trans.kind == TransactionKind::Read {
                self.pending_reads.push(trans);
            }
            self.command_queue.enqueue(activate);
            self.command_queue.enqueue(column);
            break;
        }

        // Background energy, chosen per rank by bank activity.
        for r in 0..num_ranks {
            let bank_open = self.banks[r]
                .iter()
                .any(|b| matches!(b.mode, BankMode::RowActive | BankMode::Refreshing));
            let idd = if bank_open {
                cfg.device.idd3n
            } else if self.ranks[r].powered_down {
                cfg.device.idd2p
            } else {
                cfg.device.idd2n
            };
            self.stats.background_energy[r] += idd * cfg.system.num_devices;
        }

        // Low-power management.
        if cfg.system.use_low_power {
            for r in 0..num_ranks {
                if self.command_queue.is_empty(r) && !self.ranks[r].refresh_waiting {
                    let all_idle = self.banks[r].iter().all(|b| b.mode == BankMode::Idle);
                    if all_idle {
                        self.ranks[r].power_down();
                        for bank in &mut self.banks[r] {
                            bank.mode = BankMode::PowerDown;
                            bank.next_power_up = now + cfg.device.t_cke;
                        }
                    }
                } else if self.ranks[r].powered_down && now >= self.banks[r][0].next_power_up {
                    self.ranks[r].power_up();
                    for bank in &mut self.banks[r] {
                        bank.mode = BankMode::Idle;
                        bank.next_activate = now + cfg.device.t_xp;
                    }
                }
            }
        }

        // Return path: hand at most one completed read back per cycle.
        if !self.return_queue.is_empty() {
            let returned = self.return_queue.remove(0);
            self.stats.total_transactions += 1;

            let idx = self
                .pending_reads
                .iter()
                .position(|t| t.addr == returned.addr)
                .ok_or(ModelFault::UnmatchedReadReturn {
                    cycle: now,
                    addr: returned.addr,
                })?;
            let pending = self.pending_reads.remove(idx);
            let decoded = self.mapping.map(returned.addr);

            let total_latency = now - pending.time_added;
            self.stats
                .insert_latency(total_latency, decoded.rank, decoded.bank);
            let access_start = pending.time_act_issued.unwrap_or(pending.time_added);
            self.stats.insert_access_latency(now - access_start);

            if let Some(cb) = self.callbacks.read_done.as_mut() {
                cb(self.system_id, returned.addr, now);
            }
        }

        for countdown in &mut self.refresh_countdown {
            *countdown = countdown.saturating_sub(1);
        }

        Ok(())
    }

    /// Ingests read data from the data bus and queues its return.
    fn receive_from_bus(&mut self, packet: BusPacket, now: u64) -> Result<(), ModelFault> {
        if packet.kind != CommandKind::Data {
            return Err(ModelFault::UnexpectedPacket {
                cycle: now,
                kind: packet.kind.name(),
            });
        }
        self.stats.add_read(packet.rank, packet.bank);
        self.return_queue.push(Transaction::new(
            TransactionKind::ReturnData,
            packet.addr,
            packet.data,
        ));
        Ok(())
    }

    /// Re-checks the popped command against its bank guards. A failure here
    /// is a scheduler bug, never a property of the modeled hardware.
    fn verify_guard(&self, packet: &BusPacket, now: u64) -> Result<(), ModelFault> {
        let state = &self.banks[packet.rank][packet.bank];
        let ok = match packet.kind {
            CommandKind::Activate => {
                state.mode == BankMode::Idle && now >= state.next_activate
            }
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
            CommandKind::Refresh => self.banks[packet.rank]
                .iter()
                .all(|b| b.mode == BankMode::Idle && now >= b.next_activate),
            CommandKind::Data => false,
        };
        if ok {
            Ok(())
        } else {
            Err(ModelFault::GuardViolation {
                cycle: now,
                what: packet.kind.name(),
            })
        }
    }

    /// Sensing energy of one activate/restore cycle.
    fn act_energy(&self) -> u64 {
        let dev = &self.cfg.device;
        (dev.idd0 * dev.t_rc)
            .saturating_sub(dev.idd3n * dev.t_ras + dev.idd2n * (dev.t_rc - dev.t_ras))
            * self.cfg.system.num_devices
    }

    /// Applies the issued command's side effects: bank state, every bank's
    /// timing guards, and the energy accounts.
    fn apply_command(&mut self, packet: &BusPacket, now: u64) {
        let cfg = self.cfg.clone();
        let dev = &cfg.device;
        let timing = &cfg.timing;
        let num_ranks = cfg.num_ranks();
        let num_banks = cfg.num_banks();
        let (rank, bank) = (packet.rank, packet.bank);

        match packet.kind {
            CommandKind::Read | CommandKind::ReadP => {
                // A read that skipped its ACTIVATE starts its access here.
                for trans in &mut self.pending_reads {
                    if trans.addr == packet.addr && trans.time_act_issued.is_none() {
                        trans.time_act_issued = Some(now);
                        break;
                    }
                }

                // SMART defers the sensing energy to the first column
                // access after the activate.
                if cfg.is_smart()
                    && self.banks[rank][bank].last_command == Some(CommandKind::Activate)
                {
                    let sensing = self.act_energy();
                    self.stats.actpre_energy[rank] += sensing;
                }
                self.stats.burst_energy[rank] +=
                    dev.idd4r.saturating_sub(dev.idd3n) * dev.bl / 2 * cfg.system.num_devices;

                {
                    let state = &mut self.banks[rank][bank];
                    if packet.kind == CommandKind::ReadP {
                        state.next_activate =
                            state.next_activate.max(now + timing.read_autopre_delay);
                        state.last_command = Some(CommandKind::ReadP);
                        state.state_countdown = timing.read_to_pre_delay;
                    } else {
                        state.next_precharge =
                            state.next_precharge.max(now + timing.read_to_pre_delay);
                        state.last_command = Some(CommandKind::Read);
                    }
                }

                for r in 0..num_ranks {
                    for b in 0..num_banks {
                        let state = &mut self.banks[r][b];
                        if r != rank {
                            // Crossing ranks pays the bus turnaround.
                            if state.mode == BankMode::RowActive {
                                state.next_read =
                                    state.next_read.max(now + dev.bl / 2 + dev.t_rtrs);
                                state.next_write =
                                    state.next_write.max(now + timing.read_to_write_delay);
                            }
                        } else {
                            state.next_read =
                                state.next_read.max(now + dev.t_ccd.max(dev.bl / 2));
                            state.next_write =
                                state.next_write.max(now + timing.read_to_write_delay);
                        }
                    }
                }

                // Hold column access off until the auto-precharge has
                // demonstrably closed the bank.
                if packet.kind == CommandKind::ReadP {
                    let state = &mut self.banks[rank][bank];
                    state.next_read = state.next_activate;
                    state.next_write = state.next_activate;
                }
            }

            CommandKind::Write | CommandKind::WriteP => {
                if cfg.is_smart()
                    && self.banks[rank][bank].last_command == Some(CommandKind::Activate)
                {
                    let sensing = self.act_energy();
                    self.stats.actpre_energy[rank] += sensing;
                }
                self.stats.burst_energy[rank] +=
                    dev.idd4w.saturating_sub(dev.idd3n) * dev.bl / 2 * cfg.system.num_devices;

                {
                    let state = &mut self.banks[rank][bank];
                    if packet.kind == CommandKind::WriteP {
                        state.next_activate =
                            state.next_activate.max(now + timing.write_autopre_delay);
                        state.last_command = Some(CommandKind::WriteP);
                        state.state_countdown = timing.write_to_pre_delay;
                    } else {
                        state.next_precharge =
                            state.next_precharge.max(now + timing.write_to_pre_delay);
                        state.last_command = Some(CommandKind::Write);
                    }
                }

                for r in 0..num_ranks {
                    for b in 0..num_banks {
                        let state = &mut self.banks[r][b];
                        if r != rank {
                            if state.mode == BankMode::RowActive {
                                state.next_write =
                                    state.next_write.max(now + dev.bl / 2 + dev.t_rtrs);
                                state.next_read =
                                    state.next_read.max(now + timing.write_to_read_delay_r);
                            }
                        } else {
                            state.next_write =
                                state.next_write.max(now + dev.t_ccd.max(dev.bl / 2));
                            state.next_read =
                                state.next_read.max(now + timing.write_to_read_delay_b);
                        }
                    }
                }

                if packet.kind == CommandKind::WriteP {
                    let state = &mut self.banks[rank][bank];
                    state.next_read = state.next_activate;
                    state.next_write = state.next_activate;
                }
            }

            CommandKind::Activate => {
                // The activation cycle anchors access-latency measurement.
                for trans in &mut self.pending_reads {
                    if trans.addr == packet.addr {
                        trans.time_act_issued = Some(now);
                        break;
                    }
                }

                // Conventional parts pay the full activate/restore energy
                // up front; SMART only decodes here.
                if !cfg.is_smart() {
                    let sensing = self.act_energy();
                    self.stats.actpre_energy[rank] += sensing;
                }

                let state = &mut self.banks[rank][bank];
                state.mode = BankMode::RowActive;
                state.last_command = Some(CommandKind::Activate);
                state.open_row = Some(packet.row);

                if cfg.is_smart() {
                    state.next_activate = state.next_activate.max(now + dev.t_rrd);
                    state.next_precharge = now;
                    state.next_read = state.next_read.max(now);
                    state.next_write = state.next_write.max(now);
                } else {
                    state.next_activate = state.next_activate.max(now + dev.t_rc);
                    state.next_precharge = state.next_precharge.max(now + dev.t_ras);
                    state.next_read = state.next_read.max(now + (dev.t_rcd - dev.al));
                    state.next_write = state.next_write.max(now + (dev.t_rcd - dev.al));
                }

                for b in 0..num_banks {
                    if b != bank {
                        let sibling = &mut self.banks[rank][b];
                        sibling.next_activate = sibling.next_activate.max(now + dev.t_rrd);
                    }
                }
            }

            CommandKind::Precharge => {
                let state = &mut self.banks[rank][bank];
                state.open_row = None;
                state.last_command = Some(CommandKind::Precharge);
                if cfg.is_smart() {
                    // No restore phase: the bank is immediately ready.
                    state.mode = BankMode::Idle;
                    state.state_countdown = 0;
                    state.next_activate = now;
                } else {
                    state.mode = BankMode::Precharging;
                    state.state_countdown = dev.t_rp;
                    state.next_activate = state.next_activate.max(now + dev.t_rp);
                }
            }

            CommandKind::Refresh => {
                self.stats.refresh_energy[rank] +=
                    dev.idd5.saturating_sub(dev.idd3n) * dev.t_rfc * cfg.system.num_devices;
                for state in &mut self.banks[rank] {
                    state.mode = BankMode::Refreshing;
                    state.last_command = Some(CommandKind::Refresh);
                    state.open_row = None;
                    state.state_countdown = dev.t_rfc;
                    state.next_activate = now + dev.t_rfc;
                }
            }

            CommandKind::Data => {}
        }
    }

    /// True when nothing is queued, in flight, or awaiting return.
    pub fn is_idle(&self) -> bool {
        self.transaction_queue.is_empty()
            && self.pending_reads.is_empty()
            && self.return_queue.is_empty()
            && self.write_data_to_send.is_empty()
            && self.command_queue.is_fully_empty()
            && self.outgoing_cmd.is_none()
            && self.data_bus.is_none()
            && self.ranks.iter().all(|r| !r.has_pending_data())
    }

    pub fn bank_state(&self, rank: usize, bank: usize) -> &BankState {
        &self.banks[rank][bank]
    }

    pub fn pending_read_count(&self) -> usize {
        self.pending_reads.len()
    }

    /// Dumps statistics for the epoch ending at `now`, fires the power
    /// callback per rank, mirrors everything to the CSV sink, and resets
    /// the epoch counters. Histograms print only on the final dump.
    pub fn print_stats(&mut self, final_stats: bool, now: u64) {
        let cfg = self.cfg.clone();
        let num_ranks = cfg.num_ranks();
        let num_banks = cfg.num_banks();
        let epoch = cfg.system.epoch_length;

        let cycles_elapsed = if now % epoch == 0 { epoch } else { now % epoch };
        let bytes_per_transaction = cfg.bytes_per_transaction();
        let total_bytes = self.stats.total_transactions * bytes_per_transaction;
        let seconds_this_epoch = cycles_elapsed as f64 * cfg.device.t_ck * 1e-9;

        let mut bandwidth = vec![0.0f64; num_ranks * num_banks];
        let mut average_latency = vec![0.0f64; num_ranks * num_banks];
        let mut reads_per_rank = vec![0u64; num_ranks];
        let mut writes_per_rank = vec![0u64; num_ranks];
        let mut total_bandwidth = 0.0;

        for r in 0..num_ranks {
            for b in 0..num_banks {
                let accesses = self.stats.reads(r, b) + self.stats.writes(r, b);
                let gb = accesses as f64 * bytes_per_transaction as f64
                    / (1024.0 * 1024.0 * 1024.0);
                let i = r * num_banks + b;
                bandwidth[i] = gb / seconds_this_epoch;
                average_latency[i] = if self.stats.reads(r, b) > 0 {
                    self.stats.epoch_latency(r, b) as f64 / self.stats.reads(r, b) as f64
                        * cfg.device.t_ck
                } else {
                    0.0
                };
                total_bandwidth += bandwidth[i];
                reads_per_rank[r] += self.stats.reads(r, b);
                writes_per_rank[r] += self.stats.writes(r, b);
            }
        }

        println!(" =======================================================");
        println!(
            " ============= Statistics [channel {}, cycle {}] =============",
            self.system_id, now
        );
        println!(
            "   Total Return Transactions : {} ({} bytes), aggregate {:.3} GB/s",
            self.stats.total_transactions, total_bytes, total_bandwidth
        );

        let total_hits = self.command_queue.total_row_buffer_hits();
        let total_misses = self.command_queue.total_row_buffer_misses();
        let hit_rate = if total_hits + total_misses > 0 {
            total_hits as f64 / (total_hits + total_misses) as f64 * 100.0
        } else {
            0.0
        };
        println!("   ---- Row Buffer ----");
        println!("   Hits   : {}", total_hits);
        println!("   Misses : {}", total_misses);
        println!("   Rate   : {:.2}%", hit_rate);

        for r in 0..num_ranks {
            println!("   -Rank {}:", r);
            println!(
                "     Reads  : {:<10} ({} bytes)",
                reads_per_rank[r],
                reads_per_rank[r] * bytes_per_transaction
            );
            println!(
                "     Writes : {:<10} ({} bytes)",
                writes_per_rank[r],
                writes_per_rank[r] * bytes_per_transaction
            );
            for b in 0..num_banks {
                let i = r * num_banks + b;
                println!(
                    "     Bank {:<2} {:.3} GB/s  {:.1} ns  RowBuffer ACT/hits: {}/{}",
                    b,
                    bandwidth[i],
                    average_latency[i],
                    self.command_queue.row_buffer_misses(r, b),
                    self.command_queue.row_buffer_hits(r, b),
                );
            }

            // IDD counters accumulate in mA*cycles; scale to watts.
            let to_watts = cfg.device.vdd / cycles_elapsed as f64 / 1000.0;
            let background = self.stats.background_energy[r] as f64 * to_watts;
            let burst = self.stats.burst_energy[r] as f64 * to_watts;
            let refresh = self.stats.refresh_energy[r] as f64 * to_watts;
            let actpre = self.stats.actpre_energy[r] as f64 * to_watts;
            let average = background + burst + refresh + actpre;

            if let Some(cb) = self.callbacks.report_power.as_mut() {
                cb(background, burst, refresh, actpre);
            }

            println!("     Power (watts)  avg {:.4}", average);
            println!("       -Background  {:.4}", background);
            println!("       -Act/Pre     {:.4}", actpre);
            println!("       -Burst       {:.4}", burst);
            println!("       -Refresh     {:.4}", refresh);

            if let Some(csv) = self.csv.as_mut() {
                let chan = self.system_id as usize;
                csv.field(CsvWriter::indexed("Background_Power", &[chan, r]), background);
                csv.field(CsvWriter::indexed("ACT_PRE_Power", &[chan, r]), actpre);
                csv.field(CsvWriter::indexed("Burst_Power", &[chan, r]), burst);
                csv.field(CsvWriter::indexed("Refresh_Power", &[chan, r]), refresh);
                let mut rank_bandwidth = 0.0;
                for b in 0..num_banks {
                    let i = r * num_banks + b;
                    csv.field(CsvWriter::indexed("Bandwidth", &[chan, r, b]), bandwidth[i]);
                    csv.field(
                        CsvWriter::indexed("Average_Latency", &[chan, r, b]),
                        average_latency[i],
                    );
                    rank_bandwidth += bandwidth[i];
                }
                csv.field(
                    CsvWriter::indexed("Rank_Aggregate_Bandwidth", &[chan, r]),
                    rank_bandwidth,
                );
            }
        }

        if let Some(csv) = self.csv.as_mut() {
            let chan = self.system_id as usize;
            csv.field(CsvWriter::indexed("Aggregate_Bandwidth", &[chan]), total_bandwidth);
            csv.field(
                CsvWriter::indexed("Average_Bandwidth", &[chan]),
                total_bandwidth / (num_ranks * num_banks) as f64,
            );
            csv.end_row();
        }

        if final_stats {
            let bin = self.stats.bin_size();
            println!("   ---- Latency histogram ({} bins) ----", self.stats.latency_histogram().len());
            if let Some(csv) = self.csv.as_mut() {
                csv.write_line("!!HISTOGRAM_DATA");
            }
            for (&lat, &count) in self.stats.latency_histogram() {
                println!("     [{}-{}] : {}", lat, lat + bin - 1, count);
                if let Some(csv) = self.csv.as_mut() {
                    csv.write_line(&format!("{}={}", lat, count));
                }
            }

            println!(
                "   ---- Access latency histogram ({} bins) ----",
                self.stats.access_latency_histogram().len()
            );
            if let Some(csv) = self.csv.as_mut() {
                csv.write_line("!!ACCESS_HISTOGRAM_DATA");
            }
            for (&lat, &count) in self.stats.access_latency_histogram() {
                println!("     [{}-{}] : {}", lat, lat + bin - 1, count);
                if let Some(csv) = self.csv.as_mut() {
                    csv.write_line(&format!("ACCESS_{}={}", lat, count));
                }
            }

            println!("   ---- Grand total bank accesses ----");
            for r in 0..num_ranks {
                for b in 0..num_banks {
                    let grand = self.stats.grand_total_accesses(r, b)
                        + self.stats.reads(r, b)
                        + self.stats.writes(r, b);
                    println!("     rank {} bank {}: {}", r, b, grand);
                }
            }
        }

        println!(
            "   Pending read transactions : {}",
            self.pending_reads.len()
        );

        if let Some(csv) = self.csv.as_mut() {
            csv.flush();
        }

        self.stats.reset_epoch();
        self.command_queue.reset_row_buffer_stats();
    }
}
