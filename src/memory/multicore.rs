//! Per-core hierarchy (modes D and E).
//!
//! Each core has a private I-cache and D-cache. Both cores share one L2 and
//! one backing store. Accesses arrive with virtual line addresses and are
//! remapped page by page so the same virtual page of the two cores never
//! shares a physical frame.

use log::trace;

use super::cache::Cache;
use super::dram::BackingStore;
use super::l2::{access_l1, SharedL2};
use super::mmu::MMU;
use super::{
    AccessType, Addr, MemoryHierarchy, MemsysPolicy, DCACHE_HIT_LATENCY,
    ICACHE_HIT_LATENCY,
};
use crate::error::ConfigError;

pub struct PerCoreHierarchy {
    pub icaches: Vec<Cache>,
    pub dcaches: Vec<Cache>,
    pub l2: SharedL2,
    pub mmu: MMU,
}

impl PerCoreHierarchy {
    pub fn make(policy: &MemsysPolicy) -> Result<Self, ConfigError> {
        let mut icaches = Vec::with_capacity(policy.num_cores);
        let mut dcaches = Vec::with_capacity(policy.num_cores);
        for core_id in 0..policy.num_cores {
            let seed = policy.seed.wrapping_add(2 * core_id as u64);
            icaches.push(Cache::make(
                &format!("ICACHE_{}", core_id),
                policy.icache_policy(),
                seed,
            )?);
            dcaches.push(Cache::make(
                &format!("DCACHE_{}", core_id),
                policy.dcache_policy(),
                seed.wrapping_add(1),
            )?);
        }

        Ok(Self {
            icaches,
            dcaches,
            l2: SharedL2::make(
                policy.l2_policy(),
                policy.dram_policy(),
                policy.writeback_timing,
                policy.seed.wrapping_add(2 * policy.num_cores as u64),
            )?,
            mmu: MMU::make(policy.line_size),
        })
    }
}

impl MemoryHierarchy for PerCoreHierarchy {
    fn access(
        &mut self,
        v_lineaddr: Addr,
        access_type: AccessType,
        core_id: usize,
        now: u64,
    ) -> u64 {
        let p_lineaddr = self.mmu.translate(v_lineaddr, core_id);
        trace!(
            "core {} {:?} v={:#x} p={:#x}",
            core_id,
            access_type,
            v_lineaddr,
            p_lineaddr
        );

        let (l1, hit_latency) = match access_type {
            AccessType::IFetch => (&mut self.icaches[core_id], ICACHE_HIT_LATENCY),
            AccessType::Load | AccessType::Store => {
                (&mut self.dcaches[core_id], DCACHE_HIT_LATENCY)
            }
        };
        access_l1(
            l1,
            hit_latency,
            &mut self.l2,
            p_lineaddr,
            access_type.is_write(),
            core_id,
            now,
        )
    }

    fn caches(&self) -> Vec<&Cache> {
        let mut caches = Vec::new();
        for (icache, dcache) in self.icaches.iter().zip(&self.dcaches) {
            caches.push(icache);
            caches.push(dcache);
        }
        caches.push(&self.l2.cache);
        caches
    }

    fn dram(&self) -> Option<&dyn BackingStore> {
        Some(self.l2.dram.as_ref())
    }
}
