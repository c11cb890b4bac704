//! Statistics printing.
//!
//! Every counter is printed as `<HEADER>_<NAME> : <value>` so that the
//! output of different runs can be diffed or grepped line by line.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::memory::cache::Cache;
use crate::memory::dram::DramHistory;
use crate::memory::{AccessType, Memsys};

pub fn print_cache_stats(
    out: &mut impl Write,
    cache: &Cache,
    header: &str,
) -> io::Result<()> {
    let history = &cache.history;
    writeln!(out)?;
    writeln!(out, "{}_READ_ACCESS    \t\t : {:10}", header, history.read_access)?;
    writeln!(out, "{}_WRITE_ACCESS   \t\t : {:10}", header, history.write_access)?;
    writeln!(out, "{}_READ_MISS      \t\t : {:10}", header, history.read_miss)?;
    writeln!(out, "{}_WRITE_MISS     \t\t : {:10}", header, history.write_miss)?;
    writeln!(
        out,
        "{}_READ_MISS_PERC  \t\t : {:10.3}",
        header,
        100.0 * history.read_miss_rate()
    )?;
    writeln!(
        out,
        "{}_WRITE_MISS_PERC \t\t : {:10.3}",
        header,
        100.0 * history.write_miss_rate()
    )?;
    writeln!(out, "{}_DIRTY_EVICTS   \t\t : {:10}", header, history.dirty_evicts)
}

pub fn print_dram_stats(
    out: &mut impl Write,
    history: &DramHistory,
    header: &str,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}_READ_ACCESS\t\t : {:10}", header, history.read_access)?;
    writeln!(out, "{}_WRITE_ACCESS\t\t : {:10}", header, history.write_access)?;
    writeln!(
        out,
        "{}_READ_DELAY_AVG\t\t : {:10.3}",
        header,
        history.read_delay_avg()
    )?;
    writeln!(
        out,
        "{}_WRITE_DELAY_AVG\t\t : {:10.3}",
        header,
        history.write_delay_avg()
    )
}

/// Print the coordinator counters followed by every cache
/// and the backing store, if the mode has one
pub fn print_memsys_stats(out: &mut impl Write, memsys: &Memsys) -> io::Result<()> {
    let header = "MEMSYS";
    let history = &memsys.history;

    writeln!(out)?;
    writeln!(out, "{}_IFETCH_ACCESS  \t\t : {:10}", header, history.ifetch_access)?;
    writeln!(out, "{}_LOAD_ACCESS    \t\t : {:10}", header, history.load_access)?;
    writeln!(out, "{}_STORE_ACCESS   \t\t : {:10}", header, history.store_access)?;
    writeln!(
        out,
        "{}_IFETCH_AVGDELAY\t\t : {:10.3}",
        header,
        history.avg_delay(AccessType::IFetch)
    )?;
    writeln!(
        out,
        "{}_LOAD_AVGDELAY  \t\t : {:10.3}",
        header,
        history.avg_delay(AccessType::Load)
    )?;
    writeln!(
        out,
        "{}_STORE_AVGDELAY \t\t : {:10.3}",
        header,
        history.avg_delay(AccessType::Store)
    )?;

    for cache in memsys.caches() {
        print_cache_stats(out, cache, &cache.label)?;
    }
    if let Some(dram) = memsys.dram() {
        print_dram_stats(out, &dram.history(), "DRAM")?;
    }
    Ok(())
}

/// Where an evaluation run over `trace_path` writes its `<prefix>_<trace>.<ext>`
/// file. `out_dir` is created if missing.
pub fn eval_output_path(
    out_dir: &Path,
    prefix: &str,
    trace_path: &Path,
    ext: &str,
) -> io::Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let trace_base_name = trace_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    Ok(out_dir.join(format!("{}_{}.{}", prefix, trace_base_name, ext)))
}
