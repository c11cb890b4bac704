use std::io;
use std::process;

use env_logger::Env;
use memsys_lib::error::SimulatorResult;
use memsys_lib::flags::MemsimArgs;
use memsys_lib::memory::Memsys;
use memsys_lib::report;
use memsys_lib::run_wrapper;

fn main() {
    let flags = MemsimArgs::from_env_or_exit();

    let level = if flags.verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().filter_or("MEMSIM_LOG", level));

    if let Err(e) = run(flags) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(flags: MemsimArgs) -> SimulatorResult<()> {
    let trace_path = flags.trace.clone();
    let policy = flags.into_policy()?;

    let mut memsys = Memsys::make(policy)?;
    run_wrapper::run_trace(&mut memsys, &trace_path)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::print_memsys_stats(&mut out, &memsys)?;

    Ok(())
}
