//! Memory hierarchy

pub mod cache;
pub mod dram;
pub mod l2;
pub mod mmu;
pub mod multicore;
pub mod replacement;
pub mod shared;
pub mod single;

use std::fmt;

use log::info;

use cache::{Cache, CachePolicy};
use dram::{BackingStore, DramPolicy};
use replacement::ReplacementPolicy;

use crate::error::ConfigError;

/// Byte or line address
pub type Addr = u64;

pub const DCACHE_HIT_LATENCY: u64 = 1;
pub const ICACHE_HIT_LATENCY: u64 = 1;
pub const L2CACHE_HIT_LATENCY: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    IFetch,
    Load,
    Store,
}

impl AccessType {
    pub fn is_write(self) -> bool {
        self == AccessType::Store
    }
}

/// Operating mode, fixed for the whole run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SimMode {
    /// D-cache only, no timing
    #[default]
    A,
    /// Shared I/D-caches, L2 and fixed-latency DRAM
    B,
    /// As B with a row-buffer DRAM
    C,
    /// Per-core I/D-caches, shared L2 and DRAM
    D,
    /// As D, with the L2 replacement policy set separately
    E,
}

impl SimMode {
    pub const ALL: [SimMode; 5] =
        [SimMode::A, SimMode::B, SimMode::C, SimMode::D, SimMode::E];

    pub fn is_multicore(self) -> bool {
        matches!(self, SimMode::D | SimMode::E)
    }

    /// Backing store used when the policy does not pick one
    pub fn default_dram(self) -> DramPolicy {
        match self {
            SimMode::A | SimMode::B => DramPolicy::FixedLatency,
            _ => DramPolicy::RowBuffer,
        }
    }
}

impl fmt::Display for SimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether write-back sub-accesses add to the returned delay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WritebackTiming {
    #[default]
    Serialized,
    /// Performed and counted, but free
    Hidden,
}

impl WritebackTiming {
    /// Latency a write-back contributes to the triggering access
    pub fn charge(self, latency: u64) -> u64 {
        match self {
            WritebackTiming::Serialized => latency,
            WritebackTiming::Hidden => 0,
        }
    }
}

/// Configuration of one simulation run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemsysPolicy {
    pub mode: SimMode,
    pub line_size: u64,

    pub dcache_size: u64,
    pub dcache_assoc: usize,
    pub icache_size: u64,
    pub icache_assoc: usize,
    pub l2_size: u64,
    pub l2_assoc: usize,

    /// Replacement policy of the L1 caches, and of L2 in modes B/C
    pub repl_policy: ReplacementPolicy,
    /// Replacement policy of L2 in modes D/E
    pub l2_repl_policy: ReplacementPolicy,

    pub num_cores: usize,
    /// Backing store model, or the mode's default
    pub dram: Option<DramPolicy>,
    pub writeback_timing: WritebackTiming,
    pub seed: u64,
}

impl Default for MemsysPolicy {
    fn default() -> Self {
        Self {
            mode: SimMode::A,
            line_size: 64,
            dcache_size: 32 * 1024,
            dcache_assoc: 8,
            icache_size: 32 * 1024,
            icache_assoc: 8,
            l2_size: 1024 * 1024,
            l2_assoc: 16,
            repl_policy: ReplacementPolicy::Lru,
            l2_repl_policy: ReplacementPolicy::Lru,
            num_cores: 1,
            dram: None,
            writeback_timing: WritebackTiming::Serialized,
            seed: 0,
        }
    }
}

impl MemsysPolicy {
    pub fn dcache_policy(&self) -> CachePolicy {
        CachePolicy::make(
            self.dcache_size,
            self.line_size,
            self.dcache_assoc,
            self.repl_policy,
        )
    }

    pub fn icache_policy(&self) -> CachePolicy {
        CachePolicy::make(
            self.icache_size,
            self.line_size,
            self.icache_assoc,
            self.repl_policy,
        )
    }

    pub fn l2_policy(&self) -> CachePolicy {
        let replacement = if self.mode.is_multicore() {
            self.l2_repl_policy
        } else {
            self.repl_policy
        };
        CachePolicy::make(self.l2_size, self.line_size, self.l2_assoc, replacement)
    }

    pub fn dram_policy(&self) -> DramPolicy {
        self.dram.unwrap_or_else(|| self.mode.default_dram())
    }

    /// Check everything the chosen mode will build
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_cores == 0 {
            return Err(ConfigError::NoCores);
        }
        if self.mode.is_multicore() && self.num_cores != mmu::NUM_CORES {
            return Err(ConfigError::CoreCount {
                mode: self.mode.to_string(),
                expected: mmu::NUM_CORES,
                cores: self.num_cores,
            });
        }
        if self.mode.is_multicore() && self.line_size > mmu::PAGE_SIZE {
            return Err(ConfigError::LineLargerThanPage {
                line_size: self.line_size,
                page_size: mmu::PAGE_SIZE,
            });
        }

        self.dcache_policy().validate("DCACHE")?;
        if self.mode != SimMode::A {
            self.icache_policy().validate("ICACHE")?;
            self.l2_policy().validate("L2CACHE")?;
        }
        Ok(())
    }
}

/// Per access kind counters kept by the coordinator
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MemsysHistory {
    pub ifetch_access: u64,
    pub ifetch_delay: u64,
    pub load_access: u64,
    pub load_delay: u64,
    pub store_access: u64,
    pub store_delay: u64,
}

impl MemsysHistory {
    pub fn record(&mut self, access_type: AccessType, delay: u64) {
        let (count, total) = match access_type {
            AccessType::IFetch => (&mut self.ifetch_access, &mut self.ifetch_delay),
            AccessType::Load => (&mut self.load_access, &mut self.load_delay),
            AccessType::Store => (&mut self.store_access, &mut self.store_delay),
        };
        *count += 1;
        *total += delay;
    }

    pub fn avg_delay(&self, access_type: AccessType) -> f64 {
        let (count, total) = match access_type {
            AccessType::IFetch => (self.ifetch_access, self.ifetch_delay),
            AccessType::Load => (self.load_access, self.load_delay),
            AccessType::Store => (self.store_access, self.store_delay),
        };
        if count == 0 {
            return 0.0;
        }
        total as f64 / count as f64
    }
}

/// One routing algorithm per operating mode
pub trait MemoryHierarchy {
    /// Route one line access and return its delay.
    /// `now` is the logical time used for LRU ordering.
    fn access(
        &mut self,
        lineaddr: Addr,
        access_type: AccessType,
        core_id: usize,
        now: u64,
    ) -> u64;

    /// Owned caches in report order
    fn caches(&self) -> Vec<&Cache>;

    fn dram(&self) -> Option<&dyn BackingStore>;
}

/// The memory system coordinator
pub struct Memsys {
    policy: MemsysPolicy,
    hierarchy: Box<dyn MemoryHierarchy>,
    pub history: MemsysHistory,
}

impl Memsys {
    pub fn make(policy: MemsysPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;

        let hierarchy: Box<dyn MemoryHierarchy> = match policy.mode {
            SimMode::A => Box::new(single::SingleLevel::make(&policy)?),
            SimMode::B | SimMode::C => {
                Box::new(shared::SharedHierarchy::make(&policy)?)
            }
            SimMode::D | SimMode::E => {
                Box::new(multicore::PerCoreHierarchy::make(&policy)?)
            }
        };

        info!(
            "memory system: mode {} with {} core(s), {}B lines, {} replacement",
            policy.mode, policy.num_cores, policy.line_size, policy.repl_policy
        );
        for cache in hierarchy.caches() {
            info!(
                "  {}: {} sets x {} ways, {}",
                cache.label,
                cache.num_sets(),
                cache.num_ways(),
                cache.policy.replacement
            );
        }

        Ok(Self { policy, hierarchy, history: MemsysHistory::default() })
    }

    pub fn policy(&self) -> &MemsysPolicy {
        &self.policy
    }

    /// Service one byte-address access and return its delay
    pub fn access(
        &mut self,
        addr: Addr,
        access_type: AccessType,
        core_id: usize,
        now: u64,
    ) -> u64 {
        assert!(
            core_id < self.policy.num_cores,
            "core {} out of range for {} core(s)",
            core_id,
            self.policy.num_cores
        );

        // All cache transactions happen at line granularity
        let lineaddr = addr / self.policy.line_size;
        let delay = self.hierarchy.access(lineaddr, access_type, core_id, now);
        self.history.record(access_type, delay);
        delay
    }

    pub fn caches(&self) -> Vec<&Cache> {
        self.hierarchy.caches()
    }

    /// Find an owned cache by its report label
    pub fn cache(&self, label: &str) -> Option<&Cache> {
        self.caches().into_iter().find(|cache| cache.label == label)
    }

    pub fn dram(&self) -> Option<&dyn BackingStore> {
        self.hierarchy.dram()
    }
}
