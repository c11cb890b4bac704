//! Shared L2 and backing store, and the L1 miss protocol into them.
//!
//! Every level boundary follows the same rule: on a miss the requested line
//! is installed; if that evicted a dirty line of the same core, the evicted
//! line's tag is written to the next level first; then the requested line is
//! fetched from the next level. A write never reads the backing store.

use log::debug;

use super::cache::{Cache, CachePolicy, Outcome};
use super::dram::{make_dram, BackingStore, DramPolicy};
use super::{Addr, WritebackTiming, L2CACHE_HIT_LATENCY};
use crate::error::ConfigError;

pub struct SharedL2 {
    pub cache: Cache,
    pub dram: Box<dyn BackingStore>,
    pub writeback_timing: WritebackTiming,
}

impl SharedL2 {
    pub fn make(
        policy: CachePolicy,
        dram: DramPolicy,
        writeback_timing: WritebackTiming,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            cache: Cache::make("L2CACHE", policy, seed)?,
            dram: make_dram(dram, policy.line_size),
            writeback_timing,
        })
    }

    /// Access L2 on behalf of an L1 miss or an L1 write-back
    pub fn access(
        &mut self,
        lineaddr: Addr,
        is_writeback: bool,
        core_id: usize,
        now: u64,
    ) -> u64 {
        let mut delay = L2CACHE_HIT_LATENCY;
        let outcome = self.cache.access(lineaddr, is_writeback, core_id, now);
        if outcome == Outcome::Miss {
            let evicted =
                self.cache.install(lineaddr, is_writeback, core_id, now);
            if let Some(victim) =
                evicted.filter(|line| line.needs_writeback(core_id))
            {
                debug!("L2CACHE write-back tag={:#x} to DRAM", victim.tag);
                let latency = self.dram.access(victim.tag, true);
                delay += self.writeback_timing.charge(latency);
            }
            // A write miss allocates dirty without reading DRAM
            if !is_writeback {
                delay += self.dram.access(lineaddr, false);
            }
        }
        delay
    }
}

/// Access a private or shared L1 backed by the shared L2
pub fn access_l1(
    l1: &mut Cache,
    hit_latency: u64,
    l2: &mut SharedL2,
    lineaddr: Addr,
    is_write: bool,
    core_id: usize,
    now: u64,
) -> u64 {
    let mut delay = hit_latency;
    if l1.access(lineaddr, is_write, core_id, now) == Outcome::Miss {
        let evicted = l1.install(lineaddr, is_write, core_id, now);
        if let Some(victim) = evicted.filter(|line| line.needs_writeback(core_id))
        {
            debug!("{} write-back tag={:#x} to L2CACHE", l1.label, victim.tag);
            let latency = l2.access(victim.tag, true, core_id, now);
            delay += l2.writeback_timing.charge(latency);
        }
        delay += l2.access(lineaddr, is_write, core_id, now);
    }
    delay
}
