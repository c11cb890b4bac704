use std::path::Path;
use std::process;

use env_logger::Env;
use memsys_lib::error::SimulatorResult;
use memsys_lib::memory::{AccessType, Memsys, MemsysPolicy, SimMode};
use memsys_lib::report;
use memsys_lib::run_wrapper::run_trace;

const ASSOCIATIVITIES: [usize; 5] = [1, 2, 4, 8, 16];

fn main() {
    env_logger::init_from_env(Env::default().filter_or("MEMSIM_LOG", "warn"));

    let trace_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("You should specify exactly one trace file");
            process::exit(1);
        }
    };

    if let Err(e) = run_eval(Path::new(&trace_path)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_eval(trace_path: &Path) -> SimulatorResult<()> {
    let output_path = report::eval_output_path(
        Path::new("eval"),
        "sweep_eval",
        trace_path,
        "csv",
    )?;

    let mut writer = csv::Writer::from_path(&output_path)?;
    writer.write_record([
        "Mode",
        "L1 ways",
        "Cache",
        "Read miss %",
        "Write miss %",
        "Dirty evicts",
        "IFetch avg delay",
        "Load avg delay",
        "Store avg delay",
    ])?;

    for mode in SimMode::ALL {
        for assoc in ASSOCIATIVITIES {
            let policy = MemsysPolicy {
                mode,
                dcache_assoc: assoc,
                icache_assoc: assoc,
                // Every mode accepts traces from both cores
                num_cores: 2,
                ..MemsysPolicy::default()
            };
            eprintln!("Running mode {} with {}-way L1s", mode, assoc);

            let mut memsys = Memsys::make(policy)?;
            let history = run_trace(&mut memsys, trace_path)?;

            for cache in memsys.caches() {
                writer.write_record([
                    &mode.to_string(),
                    &assoc.to_string(),
                    &cache.label,
                    &format!("{:.3}", 100.0 * cache.history.read_miss_rate()),
                    &format!("{:.3}", 100.0 * cache.history.write_miss_rate()),
                    &cache.history.dirty_evicts.to_string(),
                    &format!("{:.3}", history.avg_delay(AccessType::IFetch)),
                    &format!("{:.3}", history.avg_delay(AccessType::Load)),
                    &format!("{:.3}", history.avg_delay(AccessType::Store)),
                ])?;
            }
        }
    }

    writer.flush()?;
    eprintln!("Wrote {}", output_path.display());
    Ok(())
}
