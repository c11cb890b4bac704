//! Shared L1 hierarchy (modes B and C).
//!
//! One I-cache and one D-cache for the whole machine in front of a shared L2
//! and backing store. Cores are told apart only through the core id stored
//! with each line.

use super::cache::Cache;
use super::dram::BackingStore;
use super::l2::{access_l1, SharedL2};
use super::{
    AccessType, Addr, MemoryHierarchy, MemsysPolicy, DCACHE_HIT_LATENCY,
    ICACHE_HIT_LATENCY,
};
use crate::error::ConfigError;

pub struct SharedHierarchy {
    pub icache: Cache,
    pub dcache: Cache,
    pub l2: SharedL2,
}

impl SharedHierarchy {
    pub fn make(policy: &MemsysPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            icache: Cache::make("ICACHE", policy.icache_policy(), policy.seed)?,
            dcache: Cache::make(
                "DCACHE",
                policy.dcache_policy(),
                policy.seed.wrapping_add(1),
            )?,
            l2: SharedL2::make(
                policy.l2_policy(),
                policy.dram_policy(),
                policy.writeback_timing,
                policy.seed.wrapping_add(2),
            )?,
        })
    }
}

impl MemoryHierarchy for SharedHierarchy {
    fn access(
        &mut self,
        lineaddr: Addr,
        access_type: AccessType,
        core_id: usize,
        now: u64,
    ) -> u64 {
        match access_type {
            // Fetches are always reads
            AccessType::IFetch => access_l1(
                &mut self.icache,
                ICACHE_HIT_LATENCY,
                &mut self.l2,
                lineaddr,
                false,
                core_id,
                now,
            ),
            AccessType::Load | AccessType::Store => access_l1(
                &mut self.dcache,
                DCACHE_HIT_LATENCY,
                &mut self.l2,
                lineaddr,
                access_type.is_write(),
                core_id,
                now,
            ),
        }
    }

    fn caches(&self) -> Vec<&Cache> {
        vec![&self.icache, &self.dcache, &self.l2.cache]
    }

    fn dram(&self) -> Option<&dyn BackingStore> {
        Some(self.l2.dram.as_ref())
    }
}
