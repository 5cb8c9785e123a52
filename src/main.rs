use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use tiersim::config::{Config, SimConfig};
use tiersim::stats::SimReport;
use tiersim::trace;
use tiersim::traffic::{summarize, TraceGenConfig, TraceGenerator};
use tiersim::{MemOp, Simulator};

#[derive(Parser)]
#[command(version, about)]
struct TiersimArgs {
    /// TOML configuration with [sim] and [trace] sections.
    config_path: Option<PathBuf>,

    /// Replay a trace file (`R <addr>` / `W <addr>` lines) instead of
    /// generating one.
    #[arg(long)]
    trace_file: Option<PathBuf>,

    /// Write the run summary as pretty-printed JSON.
    #[arg(long)]
    out_json: Option<PathBuf>,

    #[arg(long)]
    kind: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
}

pub fn main() {
    env_logger::init();
    let argv = TiersimArgs::parse();

    let root: Option<toml::Value> = argv.config_path.as_ref().map(|path| {
        fs::read_to_string(path)
            .expect("cannot read config file")
            .parse()
            .expect("invalid config TOML")
    });
    let section = |name: &str| root.as_ref().and_then(|value| value.get(name));

    let sim_config = SimConfig::from_section(section("sim"));
    let mut trace_config = TraceGenConfig::from_section(section("trace"));
    trace_config.line_bytes = sim_config.line_bytes;
    if let Some(kind) = argv.kind {
        trace_config.kind = kind;
    }
    if let Some(seed) = argv.seed {
        trace_config.seed = seed;
    }

    let ops: Vec<MemOp> = match &argv.trace_file {
        Some(path) => trace::load_trace(path).expect("cannot load trace file"),
        None => TraceGenerator::new(&trace_config).generate(),
    };
    let summary = summarize(&ops, sim_config.line_bytes);
    info!(
        "trace: {} ops ({} reads / {} writes), {} unique lines, {:.1}% sequential",
        summary.total,
        summary.reads,
        summary.writes,
        summary.unique_lines,
        summary.sequential_fraction * 100.0
    );

    let sim = Simulator::new(sim_config).expect("invalid simulator config");
    let metrics = match sim.run(&ops) {
        Ok(metrics) => metrics,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    };

    let report = SimReport::from_metrics(&metrics);
    println!("{report}");
    if let Some(path) = argv.out_json {
        let payload = serde_json::to_string_pretty(&report).expect("cannot serialize report");
        fs::write(&path, payload).expect("cannot write summary");
        info!("summary written to {}", path.display());
    }
}
