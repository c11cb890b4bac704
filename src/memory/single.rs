//! Single data cache hierarchy (mode A)

use super::cache::{Cache, Outcome};
use super::dram::BackingStore;
use super::{AccessType, Addr, MemoryHierarchy, MemsysPolicy};
use crate::error::ConfigError;

/// A lone D-cache. Timing is not modeled, so every access costs nothing.
pub struct SingleLevel {
    pub dcache: Cache,
}

impl SingleLevel {
    pub fn make(policy: &MemsysPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            dcache: Cache::make("DCACHE", policy.dcache_policy(), policy.seed)?,
        })
    }
}

impl MemoryHierarchy for SingleLevel {
    fn access(
        &mut self,
        lineaddr: Addr,
        access_type: AccessType,
        core_id: usize,
        now: u64,
    ) -> u64 {
        // There is no I-cache in this mode
        if access_type == AccessType::IFetch {
            return 0;
        }

        let is_write = access_type.is_write();
        if self.dcache.access(lineaddr, is_write, core_id, now) == Outcome::Miss
        {
            self.dcache.install(lineaddr, is_write, core_id, now);
        }
        0
    }

    fn caches(&self) -> Vec<&Cache> {
        vec![&self.dcache]
    }

    fn dram(&self) -> Option<&dyn BackingStore> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memsys;

    fn small_policy() -> MemsysPolicy {
        // 1KB, 4 ways -> 4 sets
        MemsysPolicy {
            dcache_size: 1024,
            dcache_assoc: 4,
            ..MemsysPolicy::default()
        }
    }

    #[test]
    fn test_four_cold_misses_then_hit() {
        let mut memsys = Memsys::make(small_policy()).unwrap();
        for (now, lineaddr) in [0u64, 1, 2, 3, 0].iter().enumerate() {
            let delay = memsys.access(lineaddr * 64, AccessType::Load, 0, now as u64);
            assert_eq!(delay, 0);
        }
        let dcache = memsys.cache("DCACHE").unwrap();
        assert_eq!(dcache.history.read_access, 5);
        assert_eq!(dcache.history.read_miss, 4);
    }

    #[test]
    fn test_ifetch_is_a_no_op() {
        let mut memsys = Memsys::make(small_policy()).unwrap();
        assert_eq!(memsys.access(0x400, AccessType::IFetch, 0, 0), 0);
        let dcache = memsys.cache("DCACHE").unwrap();
        assert_eq!(dcache.history.read_access, 0);
        assert_eq!(memsys.history.ifetch_access, 1);
        assert!(memsys.dram().is_none());
    }

    #[test]
    fn test_store_miss_installs_dirty() {
        let mut memsys = Memsys::make(small_policy()).unwrap();
        memsys.access(0x80, AccessType::Store, 0, 0);
        memsys.access(0x80, AccessType::Store, 0, 1);
        let dcache = memsys.cache("DCACHE").unwrap();
        assert_eq!(dcache.history.write_access, 2);
        assert_eq!(dcache.history.write_miss, 1);
        let lineaddr = 0x80 / 64;
        let way = dcache.lookup(lineaddr, 0).unwrap();
        assert!(dcache.set(dcache.get_index(lineaddr))[way].dirty);
    }
}
