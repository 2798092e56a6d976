//! Configuration for the memory-system simulator.
//!
//! Two TOML profiles parameterize a simulation:
//! 1. **Device profile:** electrical and timing constants of one memory part
//!    (JEDEC timing, IDD currents, geometry, technology flag).
//! 2. **System profile:** topology, queue depths, scheduling and row-buffer
//!    policy, address mapping, reporting knobs.
//!
//! `Config::load` parses both, validates them, and precomputes the derived
//! delays the controller consults every cycle.

use serde::Deserialize;
use std::fs;

use crate::common::addr::MappingScheme;
use crate::common::error::ConfigError;

/// Memory technology variants.
///
/// Selects when sensing energy is paid and which timing constraints apply
/// at ACTIVATE and PRECHARGE. See the controller for the per-command
/// differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Technology {
    /// Conventional DRAM (or conventional STT-MRAM): sensing energy is paid
    /// at ACTIVATE, precharge restores the row over `t_rp`.
    #[default]
    #[serde(alias = "DRAM", alias = "dram")]
    Conventional,

    /// SMART STT-MRAM: ACTIVATE only decodes, sensing is deferred to the
    /// first READ/WRITE, and precharge completes immediately.
    #[serde(alias = "SMART", alias = "smart")]
    Smart,
}

/// Row-buffer management policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RowBufferPolicy {
    /// Rows stay open after a column access; later accesses to the same row
    /// are hits.
    #[default]
    #[serde(alias = "open_page")]
    OpenPage,

    /// Every column access auto-precharges (READ_P / WRITE_P).
    #[serde(alias = "close_page")]
    ClosePage,
}

/// Command scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SchedulerPolicy {
    /// Round-robin across ranks; oldest issuable command within the rank.
    #[default]
    #[serde(alias = "rank_then_bank")]
    RankThenBank,

    /// Oldest issuable command across all ranks and banks.
    #[serde(alias = "fcfs", alias = "FCFS")]
    Fcfs,
}

/// Electrical, timing, and geometry constants of one memory device.
///
/// All timing fields are in memory-clock cycles except `t_ck` and
/// `refresh_period` (nanoseconds). Currents are in mA, `vdd` in volts.
/// Defaults describe a DDR3-1333 x8 part.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub t_ck: f64,
    pub cl: u64,
    pub al: u64,
    /// Write latency, command to first data beat. Defaults to `cl - 1`.
    pub wl: Option<u64>,
    pub bl: u64,
    pub t_ras: u64,
    pub t_rcd: u64,
    pub t_rrd: u64,
    pub t_rc: u64,
    pub t_rp: u64,
    pub t_ccd: u64,
    pub t_rtp: u64,
    pub t_wtr: u64,
    pub t_wr: u64,
    pub t_rtrs: u64,
    pub t_rfc: u64,
    pub t_cke: u64,
    pub t_xp: u64,
    pub t_cmd: u64,
    pub refresh_period: f64,

    pub idd0: u64,
    pub idd1: u64,
    pub idd2p: u64,
    pub idd2q: u64,
    pub idd2n: u64,
    pub idd3pf: u64,
    pub idd3ps: u64,
    pub idd3n: u64,
    pub idd4w: u64,
    pub idd4r: u64,
    pub idd5: u64,
    pub idd6: u64,
    pub idd6l: u64,
    pub idd7: u64,
    pub vdd: f64,

    pub num_banks: u64,
    pub num_rows: u64,
    pub num_cols: u64,
    pub device_width: u64,

    pub technology: Technology,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            t_ck: 1.5,
            cl: 10,
            al: 0,
            wl: None,
            bl: 8,
            t_ras: 24,
            t_rcd: 10,
            t_rrd: 4,
            t_rc: 34,
            t_rp: 10,
            t_ccd: 4,
            t_rtp: 5,
            t_wtr: 5,
            t_wr: 10,
            t_rtrs: 1,
            t_rfc: 107,
            t_cke: 4,
            t_xp: 5,
            t_cmd: 1,
            refresh_period: 7800.0,
            idd0: 85,
            idd1: 110,
            idd2p: 12,
            idd2q: 35,
            idd2n: 37,
            idd3pf: 40,
            idd3ps: 10,
            idd3n: 45,
            idd4w: 135,
            idd4r: 135,
            idd5: 215,
            idd6: 12,
            idd6l: 16,
            idd7: 290,
            vdd: 1.5,
            num_banks: 8,
            num_rows: 32768,
            num_cols: 1024,
            device_width: 8,
            technology: Technology::Conventional,
        }
    }
}

/// Topology, queueing, and policy knobs of the modeled memory system.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemProfile {
    pub num_chans: u64,
    pub num_ranks: u64,
    /// Devices ganged per rank to fill the data bus.
    pub num_devices: u64,
    pub jedec_data_bus_bits: u64,

    pub trans_queue_depth: usize,
    pub cmd_queue_depth: usize,

    pub row_buffer_policy: RowBufferPolicy,
    pub scheduler_policy: SchedulerPolicy,
    pub address_mapping: MappingScheme,

    /// Automatic per-rank power-down when idle.
    pub use_low_power: bool,

    /// Print every issued command to stdout.
    pub trace_commands: bool,

    /// Emit per-epoch CSV rows and final histograms to the CSV sink.
    pub vis_file_output: bool,

    pub epoch_length: u64,
    pub histogram_bin_size: u64,
}

impl Default for SystemProfile {
    fn default() -> Self {
        Self {
            num_chans: 1,
            num_ranks: 2,
            num_devices: 8,
            jedec_data_bus_bits: 64,
            trans_queue_depth: 32,
            cmd_queue_depth: 32,
            row_buffer_policy: RowBufferPolicy::OpenPage,
            scheduler_policy: SchedulerPolicy::RankThenBank,
            address_mapping: MappingScheme::RowColRankBankChan,
            use_low_power: false,
            trace_commands: false,
            vis_file_output: false,
            epoch_length: 100_000,
            histogram_bin_size: 10,
        }
    }
}

/// Delays derived once at init from the device profile.
///
/// These are the composite constraints the bank guards are updated with on
/// every issued command; keeping them precomputed keeps the tick loop free
/// of arithmetic over raw JEDEC parameters.
#[derive(Debug, Clone)]
pub struct Timing {
    pub read_latency: u64,
    pub write_latency: u64,
    pub read_to_pre_delay: u64,
    pub write_to_pre_delay: u64,
    pub read_autopre_delay: u64,
    pub write_autopre_delay: u64,
    pub read_to_write_delay: u64,
    pub write_to_read_delay_b: u64,
    pub write_to_read_delay_r: u64,
    pub refresh_cycles: u64,
}

impl Timing {
    fn derive(dev: &DeviceProfile) -> Self {
        let rl = dev.cl + dev.al;
        let wl = dev.wl.unwrap_or(dev.cl - 1);
        Self {
            read_latency: rl,
            write_latency: wl,
            read_to_pre_delay: dev.al + dev.bl / 2 + dev.t_rtp.max(dev.t_ccd) - dev.t_ccd,
            write_to_pre_delay: wl + dev.bl / 2 + dev.t_wr,
            read_autopre_delay: dev.al + dev.t_rtp + dev.t_rp,
            write_autopre_delay: wl + dev.bl / 2 + dev.t_wr + dev.t_rp,
            read_to_write_delay: (rl + dev.bl / 2 + dev.t_rtrs).saturating_sub(wl),
            write_to_read_delay_b: wl + dev.bl / 2 + dev.t_wtr,
            write_to_read_delay_r: (wl + dev.bl / 2 + dev.t_rtrs).saturating_sub(rl),
            refresh_cycles: (dev.refresh_period / dev.t_ck).round() as u64,
        }
    }
}

/// Validated configuration: both profiles plus derived timing.
#[derive(Debug, Clone)]
pub struct Config {
    pub device: DeviceProfile,
    pub system: SystemProfile,
    pub timing: Timing,
}

fn require_pow2(what: &'static str, val: u64) -> Result<(), ConfigError> {
    if val == 0 || !val.is_power_of_two() {
        return Err(ConfigError::Topology(what, val));
    }
    Ok(())
}

impl Config {
    /// Loads and validates the two profiles from TOML files.
    pub fn load(device_path: &str, system_path: &str) -> Result<Self, ConfigError> {
        let device_text = fs::read_to_string(device_path)
            .map_err(|e| ConfigError::Io(device_path.to_string(), e))?;
        let device: DeviceProfile = toml::from_str(&device_text)
            .map_err(|e| ConfigError::Parse(device_path.to_string(), e))?;

        let system_text = fs::read_to_string(system_path)
            .map_err(|e| ConfigError::Io(system_path.to_string(), e))?;
        let system: SystemProfile = toml::from_str(&system_text)
            .map_err(|e| ConfigError::Parse(system_path.to_string(), e))?;

        Self::new(device, system)
    }

    /// Validates in-memory profiles and derives the composite delays.
    pub fn new(device: DeviceProfile, system: SystemProfile) -> Result<Self, ConfigError> {
        if device.t_rc < device.t_ras {
            return Err(ConfigError::Timing("t_rc must be >= t_ras"));
        }
        if device.t_ras < device.t_rcd {
            return Err(ConfigError::Timing("t_ras must be >= t_rcd"));
        }
        if device.al > device.t_rcd {
            return Err(ConfigError::Timing("al must not exceed t_rcd"));
        }
        if device.bl % 2 != 0 || device.bl == 0 {
            return Err(ConfigError::Timing("bl must be a nonzero even beat count"));
        }
        if device.t_cmd == 0 {
            return Err(ConfigError::Timing("t_cmd must be nonzero"));
        }
        if device.cl + device.al <= device.t_cmd {
            return Err(ConfigError::Timing("read latency must exceed t_cmd"));
        }
        if device.cl == 0 || device.wl.unwrap_or(device.cl - 1) == 0 {
            return Err(ConfigError::Timing("cl and wl must be nonzero"));
        }
        if device.t_ck <= 0.0 || device.refresh_period < device.t_ck {
            return Err(ConfigError::Timing(
                "refresh_period must cover at least one t_ck",
            ));
        }

        require_pow2("num_chans", system.num_chans)?;
        require_pow2("num_ranks", system.num_ranks)?;
        require_pow2("num_banks", device.num_banks)?;
        require_pow2("num_rows", device.num_rows)?;
        require_pow2("num_cols", device.num_cols)?;
        require_pow2("jedec_data_bus_bits", system.jedec_data_bus_bits)?;
        if system.num_devices == 0 {
            return Err(ConfigError::Topology("num_devices", 0));
        }
        if system.trans_queue_depth == 0 {
            return Err(ConfigError::Topology("trans_queue_depth", 0));
        }
        if system.cmd_queue_depth < 2 {
            return Err(ConfigError::Topology(
                "cmd_queue_depth",
                system.cmd_queue_depth as u64,
            ));
        }
        if system.epoch_length == 0 {
            return Err(ConfigError::Topology("epoch_length", 0));
        }
        if system.histogram_bin_size == 0 {
            return Err(ConfigError::Topology("histogram_bin_size", 0));
        }

        let timing = Timing::derive(&device);
        Ok(Self {
            device,
            system,
            timing,
        })
    }

    /// True when the device profile selects the SMART STT-MRAM variant.
    pub fn is_smart(&self) -> bool {
        self.device.technology == Technology::Smart
    }

    pub fn num_ranks(&self) -> usize {
        self.system.num_ranks as usize
    }

    pub fn num_banks(&self) -> usize {
        self.device.num_banks as usize
    }

    /// Bytes moved by one full burst across the channel data bus.
    pub fn bytes_per_transaction(&self) -> u64 {
        self.system.jedec_data_bus_bits * self.device.bl / 8
    }
}
