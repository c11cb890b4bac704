use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::memory::dram::DramPolicy;
use crate::memory::replacement::ReplacementPolicy;
use crate::memory::{MemsysPolicy, SimMode, WritebackTiming};

xflags::xflags! {
    /// Multi-core cache hierarchy simulator.
    cmd memsim-args {
        /// Path to the access trace. One access per line: `op address [core]`,
        /// op is i (ifetch), r (load) or w (store).
        required trace: PathBuf

        /// Operating mode.
        /// A: D-cache only, no timing (default)
        /// B: shared I/D-caches, L2, fixed-latency DRAM
        /// C: as B with a row-buffer DRAM
        /// D: per-core I/D-caches, shared L2 and DRAM (2 cores)
        /// E: as D, L2 uses --l2-repl
        optional -m, --mode mode: ModeArg

        /// Cache line size in bytes.
        optional --line-size bytes: u64
        /// D-cache capacity in bytes.
        optional --dcache-size bytes: u64
        /// D-cache associativity.
        optional --dcache-assoc ways: usize
        /// I-cache capacity in bytes.
        optional --icache-size bytes: u64
        /// I-cache associativity.
        optional --icache-assoc ways: usize
        /// L2 capacity in bytes.
        optional --l2-size bytes: u64
        /// L2 associativity.
        optional --l2-assoc ways: usize

        /// Replacement policy: 0/LRU (default), 1/RAND, 2/SWP.
        optional --repl policy: ReplArg
        /// L2 replacement policy in modes D/E.
        optional --l2-repl policy: ReplArg
        /// Ways of every set reserved for core 0 under SWP.
        optional --swp-core0-ways ways: usize

        /// Number of cores issuing accesses.
        optional --cores n: usize
        /// Backing store model: FIXED or ROWBUF. Defaults by mode.
        optional --dram model: DramArg
        /// Seed for random replacement.
        optional --seed seed: u64
        /// Do not add write-back latency to the triggering access.
        optional --hidden-writeback

        /// Enables verbose mode, logging misses and evictions.
        optional -v, --verbose
    }
}

#[derive(Debug, Clone)]
pub struct ModeArg(SimMode);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(ModeArg(SimMode::A)),
            "B" => Ok(ModeArg(SimMode::B)),
            "C" => Ok(ModeArg(SimMode::C)),
            "D" => Ok(ModeArg(SimMode::D)),
            "E" => Ok(ModeArg(SimMode::E)),
            _ => Err(format!(
                "Invalid mode: '{}'. Expected one of A, B, C, D, E.",
                s
            )),
        }
    }
}

impl From<ModeArg> for SimMode {
    fn from(val: ModeArg) -> Self {
        val.0
    }
}

/// Replacement policy selector, resolved once the SWP quota is known
#[derive(Debug, Clone, Copy)]
pub struct ReplArg(u64);

impl FromStr for ReplArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LRU" => Ok(ReplArg(0)),
            "RAND" | "RANDOM" => Ok(ReplArg(1)),
            "SWP" => Ok(ReplArg(2)),
            "DWP" => Ok(ReplArg(3)),
            other => other.parse().map(ReplArg).map_err(|_| {
                format!(
                    "Invalid replacement policy: '{}'. Expected 0-2, LRU, RAND or SWP.",
                    s
                )
            }),
        }
    }
}

impl ReplArg {
    pub fn into_policy(
        self,
        core0_ways: usize,
    ) -> Result<ReplacementPolicy, ConfigError> {
        ReplacementPolicy::from_selector(self.0, core0_ways)
    }
}

#[derive(Debug, Clone)]
pub enum DramArg {
    Fixed,
    RowBuffer,
}

impl FromStr for DramArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIXED" => Ok(DramArg::Fixed),
            "ROWBUF" => Ok(DramArg::RowBuffer),
            _ => Err(format!(
                "Invalid DRAM model: '{}'. Expected 'FIXED' or 'ROWBUF'.",
                s
            )),
        }
    }
}

impl From<DramArg> for DramPolicy {
    fn from(val: DramArg) -> Self {
        match val {
            DramArg::Fixed => DramPolicy::FixedLatency,
            DramArg::RowBuffer => DramPolicy::RowBuffer,
        }
    }
}

impl MemsimArgs {
    /// Build the run configuration, starting from the defaults.
    /// Modes D/E default to two cores.
    pub fn into_policy(self) -> Result<MemsysPolicy, ConfigError> {
        let defaults = MemsysPolicy::default();
        let mode: SimMode = self.mode.map(Into::into).unwrap_or(defaults.mode);
        let core0_ways = self.swp_core0_ways.unwrap_or(0);
        let default_cores = if mode.is_multicore() { 2 } else { 1 };

        let repl_policy = match self.repl {
            Some(arg) => arg.into_policy(core0_ways)?,
            None => defaults.repl_policy,
        };
        let l2_repl_policy = match self.l2_repl {
            Some(arg) => arg.into_policy(core0_ways)?,
            None => defaults.l2_repl_policy,
        };

        Ok(MemsysPolicy {
            mode,
            line_size: self.line_size.unwrap_or(defaults.line_size),
            dcache_size: self.dcache_size.unwrap_or(defaults.dcache_size),
            dcache_assoc: self.dcache_assoc.unwrap_or(defaults.dcache_assoc),
            icache_size: self.icache_size.unwrap_or(defaults.icache_size),
            icache_assoc: self.icache_assoc.unwrap_or(defaults.icache_assoc),
            l2_size: self.l2_size.unwrap_or(defaults.l2_size),
            l2_assoc: self.l2_assoc.unwrap_or(defaults.l2_assoc),
            repl_policy,
            l2_repl_policy,
            num_cores: self.cores.unwrap_or(default_cores),
            dram: self.dram.map(Into::into),
            writeback_timing: if self.hidden_writeback {
                WritebackTiming::Hidden
            } else {
                WritebackTiming::Serialized
            },
            seed: self.seed.unwrap_or(defaults.seed),
        })
    }
}
