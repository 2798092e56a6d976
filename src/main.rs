//! Memory-system simulator CLI.
//!
//! Loads a device profile and a system profile, reads a trace file, and
//! drives the modeled channels cycle by cycle until the trace drains.
//!
//! # Usage
//!
//! ```text
//! mramsim --device configs/DDR3_1333.toml --system configs/system.toml \
//!         --trace traces/example.trc [--cycles N] [--csv out.csv]
//! ```

use clap::Parser;
use std::process;
use std::sync::Arc;

extern crate mramsim;

use mramsim::config::Config;
use mramsim::sim::trace;
use mramsim::sim::TraceSimulator;

/// Command-line arguments for the memory-system simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-accurate DRAM / STT-MRAM simulator")]
struct Args {
    /// Device profile (timing, currents, geometry, technology).
    #[arg(short, long, default_value = "configs/DDR3_1333.toml")]
    device: String,

    /// System profile (topology, queues, policies).
    #[arg(short, long, default_value = "configs/system.toml")]
    system: String,

    /// Trace file to replay.
    #[arg(short, long)]
    trace: String,

    /// Stop after this many cycles even if the trace has not drained.
    #[arg(long)]
    cycles: Option<u64>,

    /// Base path for per-channel CSV output (needs vis_file_output).
    #[arg(long)]
    csv: Option<String>,
}

fn main() {
    let args = Args::parse();

    let config = Config::load(&args.device, &args.system).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: {}", e);
        process::exit(1);
    });
    let config = Arc::new(config);

    println!("Global Configuration");
    println!("--------------------");
    println!("Device:");
    println!("  Technology:         {:?}", config.device.technology);
    println!(
        "  tCK:                {} ns ({} MHz)",
        config.device.t_ck,
        (1000.0 / config.device.t_ck) as u64
    );
    println!(
        "  CL/AL/BL:           {}/{}/{}",
        config.device.cl, config.device.al, config.device.bl
    );
    println!(
        "  tRCD/tRP/tRAS/tRC:  {}/{}/{}/{}",
        config.device.t_rcd, config.device.t_rp, config.device.t_ras, config.device.t_rc
    );
    println!("System:");
    println!("  Channels:           {}", config.system.num_chans);
    println!("  Ranks:              {}", config.system.num_ranks);
    println!("  Banks per rank:     {}", config.device.num_banks);
    println!("  Transaction queue:  {}", config.system.trans_queue_depth);
    println!("  Row buffer policy:  {:?}", config.system.row_buffer_policy);
    println!("  Scheduler policy:   {:?}", config.system.scheduler_policy);
    println!("  Address mapping:    {:?}", config.system.address_mapping);
    println!("--------------------");

    let records = trace::read_trace(&args.trace).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: {}", e);
        process::exit(1);
    });
    println!("[Trace] {} records from {}", records.len(), args.trace);

    let mut simulator = TraceSimulator::new(config, records, args.csv.as_deref())
        .unwrap_or_else(|e| {
            eprintln!("[!] FATAL: cannot open CSV output: {}", e);
            process::exit(1);
        });

    match simulator.run(args.cycles) {
        Ok(summary) => {
            println!(
                "[Sim] {} cycles, {} records issued, {} reads returned, {} writes completed",
                summary.cycles,
                summary.records_issued,
                summary.reads_returned,
                summary.writes_completed
            );
        }
        Err(fault) => {
            eprintln!("\n[!] FATAL MODEL FAULT: {}", fault);
            process::exit(2);
        }
    }
}
