//! Integration tests for profile loading, validation, derived timing, and
//! address mapping.

use std::sync::Arc;

use mramsim::common::addr::{AddressMapping, MappingScheme};
use mramsim::common::error::ConfigError;
use mramsim::config::{Config, DeviceProfile, SystemProfile, Technology};

/// Derived delays follow the composite-constraint formulas.
#[test]
fn test_derived_timing_defaults() {
    let cfg = Config::new(DeviceProfile::default(), SystemProfile::default()).unwrap();
    let t = &cfg.timing;

    assert_eq!(t.read_latency, 10);
    assert_eq!(t.write_latency, 9);
    assert_eq!(t.read_to_pre_delay, 5); // al + bl/2 + max(tRTP,tCCD) - tCCD
    assert_eq!(t.write_to_pre_delay, 23); // wl + bl/2 + tWR
    assert_eq!(t.read_autopre_delay, 15); // al + tRTP + tRP
    assert_eq!(t.write_autopre_delay, 33); // wl + bl/2 + tWR + tRP
    assert_eq!(t.read_to_write_delay, 6); // rl + bl/2 + tRTRS - wl
    assert_eq!(t.write_to_read_delay_b, 18); // wl + bl/2 + tWTR
    assert_eq!(t.write_to_read_delay_r, 4); // wl + bl/2 + tRTRS - rl
    assert_eq!(t.refresh_cycles, 5200); // 7800 ns / 1.5 ns
}

/// An explicit write latency overrides the cl - 1 default.
#[test]
fn test_explicit_write_latency() {
    let device = DeviceProfile {
        wl: Some(7),
        ..Default::default()
    };
    let cfg = Config::new(device, SystemProfile::default()).unwrap();
    assert_eq!(cfg.timing.write_latency, 7);
}

/// Impossible timing aborts at init.
#[test]
fn test_validation_rejects_trc_below_tras() {
    let device = DeviceProfile {
        t_rc: 20,
        t_ras: 24,
        ..Default::default()
    };
    let err = Config::new(device, SystemProfile::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Timing(_)));
}

#[test]
fn test_validation_rejects_odd_burst_length() {
    let device = DeviceProfile {
        bl: 7,
        ..Default::default()
    };
    let err = Config::new(device, SystemProfile::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Timing(_)));
}

#[test]
fn test_validation_rejects_non_pow2_banks() {
    let device = DeviceProfile {
        num_banks: 6,
        ..Default::default()
    };
    let err = Config::new(device, SystemProfile::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Topology("num_banks", 6)));
}

#[test]
fn test_validation_rejects_zero_ranks() {
    let system = SystemProfile {
        num_ranks: 0,
        ..Default::default()
    };
    let err = Config::new(DeviceProfile::default(), system).unwrap_err();
    assert!(matches!(err, ConfigError::Topology("num_ranks", 0)));
}

#[test]
fn test_validation_rejects_zero_trans_queue() {
    let system = SystemProfile {
        trans_queue_depth: 0,
        ..Default::default()
    };
    let err = Config::new(DeviceProfile::default(), system).unwrap_err();
    assert!(matches!(err, ConfigError::Topology("trans_queue_depth", 0)));
}

/// Partial TOML fills the rest from the part defaults.
#[test]
fn test_device_profile_toml_defaults() {
    let device: DeviceProfile = toml::from_str(
        r#"
        technology = "SMART"
        t_rcd = 12
        "#,
    )
    .unwrap();
    assert_eq!(device.technology, Technology::Smart);
    assert_eq!(device.t_rcd, 12);
    assert_eq!(device.cl, 10);
    assert_eq!(device.num_banks, 8);
}

#[test]
fn test_system_profile_toml_policies() {
    let system: SystemProfile = toml::from_str(
        r#"
        num_ranks = 4
        row_buffer_policy = "close_page"
        scheduler_policy = "fcfs"
        address_mapping = "chan:rank:row:bank:col"
        "#,
    )
    .unwrap();
    assert_eq!(system.num_ranks, 4);
    assert_eq!(
        system.row_buffer_policy,
        mramsim::config::RowBufferPolicy::ClosePage
    );
    assert_eq!(
        system.scheduler_policy,
        mramsim::config::SchedulerPolicy::Fcfs
    );
    assert_eq!(system.address_mapping, MappingScheme::ChanRankRowBankCol);
}

/// Field extraction for the column-low scheme: col sits just above the
/// 6 burst-offset bits, then bank, row, rank.
#[test]
fn test_mapping_chan_rank_row_bank_col() {
    let system = SystemProfile {
        num_ranks: 2,
        address_mapping: MappingScheme::ChanRankRowBankCol,
        ..Default::default()
    };
    let cfg = Arc::new(Config::new(DeviceProfile::default(), system).unwrap());
    let mapping = AddressMapping::new(&cfg);

    let addr = (((1u64 << 15 | 3) << 3 | 2) << 10 | 5) << 6;
    let decoded = mapping.map(addr);
    assert_eq!(decoded.chan, 0);
    assert_eq!(decoded.rank, 1);
    assert_eq!(decoded.row, 3);
    assert_eq!(decoded.bank, 2);
    assert_eq!(decoded.col, 5);
}

/// Field extraction for the default bank-low interleaving scheme.
#[test]
fn test_mapping_row_col_rank_bank_chan() {
    let system = SystemProfile {
        num_ranks: 2,
        address_mapping: MappingScheme::RowColRankBankChan,
        ..Default::default()
    };
    let cfg = Arc::new(Config::new(DeviceProfile::default(), system).unwrap());
    let mapping = AddressMapping::new(&cfg);

    // Low to high: chan (0 bits), bank (3), rank (1), col (10), row (15).
    let addr = (((7u64 << 10 | 9) << 1 | 1) << 3 | 4) << 6;
    let decoded = mapping.map(addr);
    assert_eq!(decoded.bank, 4);
    assert_eq!(decoded.rank, 1);
    assert_eq!(decoded.col, 9);
    assert_eq!(decoded.row, 7);
}

/// Errors render a readable diagnostic.
#[test]
fn test_config_error_display() {
    let err = ConfigError::Timing("t_rc must be >= t_ras");
    assert!(err.to_string().contains("t_rc"));

    let err = ConfigError::Topology("num_banks", 6);
    assert!(err.to_string().contains("num_banks"));
}
