//! A trace-driven simulation wrapper

use std::path::Path;

use log::info;

use crate::error::SimulatorResult;
use crate::error::TraceError;
use crate::memory::{AccessType, Addr, Memsys, MemsysHistory};

/// One access of a trace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    pub access_type: AccessType,
    pub address: Addr,
    pub core_id: usize,
}

/// Parse trace text.
///
/// Each line is `op address [core]` where op is `i` (instruction fetch),
/// `r` (load) or `w` (store) and the address is hexadecimal starting
/// with `0x`. Empty lines and lines starting with `#` are skipped.
pub fn parse_operations(
    content: &str,
    trace_path: &Path,
) -> Result<Vec<TraceRecord>, TraceError> {
    let mut operations = Vec::new();
    let parse_error = |line_num: usize, reason: String| {
        TraceError::ParseError(trace_path.into(), line_num + 1, reason)
    };

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(parse_error(
                line_num,
                "expected 'op address [core]'".to_string(),
            ));
        }

        let access_type = match parts[0] {
            "i" => AccessType::IFetch,
            "r" => AccessType::Load,
            "w" => AccessType::Store,
            op => {
                return Err(parse_error(
                    line_num,
                    format!("invalid operation '{}': expected 'i', 'r' or 'w'", op),
                ))
            }
        };

        let address = parts[1]
            .strip_prefix("0x")
            .ok_or_else(|| {
                parse_error(
                    line_num,
                    "expected hexadecimal address starting with '0x'".to_string(),
                )
            })
            .and_then(|digits| {
                Addr::from_str_radix(digits, 16).map_err(|_| {
                    parse_error(line_num, "invalid hexadecimal address".to_string())
                })
            })?;

        let core_id = match parts.get(2) {
            Some(core) => core.parse::<usize>().map_err(|_| {
                parse_error(line_num, format!("invalid core id '{}'", core))
            })?,
            None => 0,
        };

        operations.push(TraceRecord { access_type, address, core_id });
    }

    Ok(operations)
}

/// Fetch operations from the trace file
pub fn fetch_operations(trace_path: &Path) -> Result<Vec<TraceRecord>, TraceError> {
    let content = std::fs::read_to_string(trace_path)
        .map_err(|e| TraceError::FileReadError(trace_path.into(), e))?;
    parse_operations(&content, trace_path)
}

/// Feed the records through the memory system, one per logical cycle
pub fn run(memsys: &mut Memsys, operations: &[TraceRecord]) -> MemsysHistory {
    for (cycle, record) in operations.iter().enumerate() {
        memsys.access(
            record.address,
            record.access_type,
            record.core_id,
            cycle as u64,
        );
    }
    memsys.history
}

/// Run simulation on the given trace file
pub fn run_trace(
    memsys: &mut Memsys,
    trace_path: &Path,
) -> SimulatorResult<MemsysHistory> {
    let operations = fetch_operations(trace_path)?;

    // Reject the whole trace up front rather than stopping midway
    let num_cores = memsys.policy().num_cores;
    if let Some((index, record)) = operations
        .iter()
        .enumerate()
        .find(|(_, record)| record.core_id >= num_cores)
    {
        return Err(TraceError::CoreOutOfRange(
            trace_path.into(),
            index + 1,
            record.core_id,
            num_cores,
        )
        .into());
    }

    info!("running {} accesses from {}", operations.len(), trace_path.display());
    Ok(run(memsys, &operations))
}
