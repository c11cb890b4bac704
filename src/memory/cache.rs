//! Cache implementation

use log::{debug, trace};

use super::replacement::{ReplacementPolicy, Replacer};
use super::Addr;
use crate::error::ConfigError;

/// Largest associativity a cache may be built with
pub const MAX_WAYS: usize = 16;

pub fn get_log_2(value: u64) -> usize {
    assert!(value > 0);
    63 - value.leading_zeros() as usize
}

pub fn is_pow_2(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub fn get_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
}

/// One way of a set. No data is stored, only bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub dirty: bool,

    pub tag: Addr,
    pub core_id: usize,

    pub last_access: u64,
}

impl CacheLine {
    /// An evicted line must be written to the next level
    /// iff it is valid, dirty and owned by the requesting core
    pub fn needs_writeback(&self, core_id: usize) -> bool {
        self.valid && self.dirty && self.core_id == core_id
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CacheHistory {
    pub read_access: u64,
    pub write_access: u64,
    pub read_miss: u64,
    pub write_miss: u64,
    pub dirty_evicts: u64,
}

impl CacheHistory {
    pub fn read_miss_rate(&self) -> f64 {
        if self.read_access == 0 {
            return 0.0;
        }
        self.read_miss as f64 / self.read_access as f64
    }

    pub fn write_miss_rate(&self) -> f64 {
        if self.write_access == 0 {
            return 0.0;
        }
        self.write_miss as f64 / self.write_access as f64
    }

    fn record_access(&mut self, is_write: bool) {
        if is_write {
            self.write_access += 1;
        } else {
            self.read_access += 1;
        }
    }

    fn record_miss(&mut self, is_write: bool) {
        if is_write {
            self.write_miss += 1;
        } else {
            self.read_miss += 1;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// Capacity in bytes
    pub size: u64,
    pub line_size: u64,
    pub associativity: usize,
    pub replacement: ReplacementPolicy,
}

impl Default for CachePolicy {
    /// 32KB 8-way L1 with 64-byte lines
    fn default() -> Self {
        Self::make(32 * 1024, 64, 8, ReplacementPolicy::Lru)
    }
}

impl CachePolicy {
    pub fn make(
        size: u64,
        line_size: u64,
        associativity: usize,
        replacement: ReplacementPolicy,
    ) -> Self {
        Self { size, line_size, associativity, replacement }
    }

    /// Number of sets, valid only after `validate` succeeds
    pub fn num_sets(&self) -> u64 {
        self.size / (self.line_size * self.associativity as u64)
    }

    /// Reject any geometry that cannot be built exactly.
    /// `cache` names the offending cache in the error.
    pub fn validate(&self, cache: &str) -> Result<(), ConfigError> {
        if self.associativity == 0 {
            return Err(ConfigError::ZeroWays { cache: cache.to_string() });
        }
        if self.associativity > MAX_WAYS {
            return Err(ConfigError::TooManyWays {
                cache: cache.to_string(),
                ways: self.associativity,
                max: MAX_WAYS,
            });
        }
        if !is_pow_2(self.line_size) {
            return Err(ConfigError::NotPowerOfTwo {
                param: "line size".to_string(),
                value: self.line_size,
            });
        }
        let mismatch = || ConfigError::CapacityMismatch {
            cache: cache.to_string(),
            size: self.size,
            line_size: self.line_size,
            ways: self.associativity,
        };
        let set_bytes = self
            .line_size
            .checked_mul(self.associativity as u64)
            .ok_or_else(mismatch)?;
        if self.size == 0 || self.size % set_bytes != 0 {
            return Err(mismatch());
        }
        if !is_pow_2(self.num_sets()) {
            return Err(ConfigError::NotPowerOfTwo {
                param: format!("{} set count", cache),
                value: self.num_sets(),
            });
        }
        self.replacement.validate(cache, self.associativity)
    }
}

/// Set-associative cache over line addresses.
///
/// A line address looks like this:
/// | tag | index |
/// with log2(number of sets) index bits.
pub struct Cache {
    pub label: String,
    pub policy: CachePolicy,

    pub history: CacheHistory,

    num_sets: usize,
    index_bits: usize,
    index_mask: Addr,

    // Set i occupies lines[i * ways..(i + 1) * ways]
    lines: Vec<CacheLine>,

    replacer: Replacer,
}

impl Cache {
    pub fn make(
        label: &str,
        policy: CachePolicy,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        policy.validate(label)?;

        let num_sets = policy.num_sets() as usize;
        let index_bits = get_log_2(num_sets as u64);

        Ok(Self {
            label: label.to_string(),
            policy,
            history: CacheHistory::default(),
            num_sets,
            index_bits,
            index_mask: get_mask(index_bits),
            lines: vec![CacheLine::default(); num_sets * policy.associativity],
            replacer: Replacer::make(policy.replacement, seed),
        })
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    pub fn num_ways(&self) -> usize {
        self.policy.associativity
    }

    pub fn get_index(&self, lineaddr: Addr) -> usize {
        (lineaddr & self.index_mask) as usize
    }

    pub fn get_tag(&self, lineaddr: Addr) -> Addr {
        lineaddr.checked_shr(self.index_bits as u32).unwrap_or(0)
    }

    /// The lines of set `index`
    pub fn set(&self, index: usize) -> &[CacheLine] {
        let ways = self.num_ways();
        &self.lines[index * ways..(index + 1) * ways]
    }

    /// Return the way holding the line, without touching any state
    pub fn lookup(&self, lineaddr: Addr, core_id: usize) -> Option<usize> {
        let tag = self.get_tag(lineaddr);
        self.set(self.get_index(lineaddr)).iter().position(|line| {
            line.valid && line.tag == tag && line.core_id == core_id
        })
    }

    pub fn is_in_cache(&self, lineaddr: Addr, core_id: usize) -> bool {
        self.lookup(lineaddr, core_id).is_some()
    }

    /// Probe the cache. A hit refreshes the line's access time
    /// and marks it dirty on a write. Statistics are always updated.
    pub fn access(
        &mut self,
        lineaddr: Addr,
        is_write: bool,
        core_id: usize,
        now: u64,
    ) -> Outcome {
        self.history.record_access(is_write);

        match self.lookup(lineaddr, core_id) {
            Some(way) => {
                let i = self.get_index(lineaddr) * self.num_ways() + way;
                let line = &mut self.lines[i];
                if is_write {
                    line.dirty = true;
                }
                line.last_access = now;
                trace!("{} hit {:#x} core={}", self.label, lineaddr, core_id);
                Outcome::Hit
            }
            None => {
                self.history.record_miss(is_write);
                debug!(
                    "{} miss {:#x} core={} write={}",
                    self.label,
                    lineaddr,
                    core_id,
                    is_write
                );
                Outcome::Miss
            }
        }
    }

    /// Way to fill in set `index`: the first invalid way if any,
    /// otherwise whatever the replacement policy chooses
    pub fn find_victim(&mut self, index: usize, core_id: usize) -> usize {
        let ways = self.num_ways();
        let set = &self.lines[index * ways..(index + 1) * ways];
        if let Some(way) = set.iter().position(|line| !line.valid) {
            return way;
        }
        self.replacer.select(set, core_id)
    }

    /// Install the line unconditionally; the caller has already seen a miss.
    /// Returns the line that was replaced if it was valid.
    pub fn install(
        &mut self,
        lineaddr: Addr,
        is_write: bool,
        core_id: usize,
        now: u64,
    ) -> Option<CacheLine> {
        let index = self.get_index(lineaddr);
        let way = self.find_victim(index, core_id);
        let new_line = CacheLine {
            valid: true,
            dirty: is_write,
            tag: self.get_tag(lineaddr),
            core_id,
            last_access: now,
        };

        let i = index * self.num_ways() + way;
        let replaced = std::mem::replace(&mut self.lines[i], new_line);
        if !replaced.valid {
            return None;
        }

        if replaced.dirty {
            self.history.dirty_evicts += 1;
        }
        debug!(
            "{} evict set={} way={} tag={:#x} core={} dirty={}",
            self.label, index, way, replaced.tag, replaced.core_id, replaced.dirty
        );
        Some(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache(size: u64, ways: usize) -> Cache {
        let policy = CachePolicy::make(size, 64, ways, ReplacementPolicy::Lru);
        Cache::make("DCACHE", policy, 0).unwrap()
    }

    /// Access and install on miss, as a single-level hierarchy does
    fn touch(cache: &mut Cache, lineaddr: Addr, is_write: bool, now: u64) -> Outcome {
        let outcome = cache.access(lineaddr, is_write, 0, now);
        if outcome == Outcome::Miss {
            cache.install(lineaddr, is_write, 0, now);
        }
        outcome
    }

    #[test]
    fn test_get_log_2() {
        for n in 1..123457u64 {
            let expected = {
                let mut count = 0;
                let mut t = n;
                while t > 1 {
                    count += 1;
                    t >>= 1;
                }
                count
            };
            assert_eq!(expected, get_log_2(n));
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert_eq!(CachePolicy::default().validate("DCACHE"), Ok(()));
        assert_eq!(CachePolicy::default().num_sets(), 64);
    }

    #[test]
    fn test_rejects_too_many_ways() {
        let policy = CachePolicy::make(64 * 1024, 64, 32, ReplacementPolicy::Lru);
        assert_eq!(
            Cache::make("L2CACHE", policy, 0).err(),
            Some(ConfigError::TooManyWays {
                cache: "L2CACHE".to_string(),
                ways: 32,
                max: MAX_WAYS,
            })
        );
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let odd_sets = CachePolicy::make(3 * 64 * 4, 64, 4, ReplacementPolicy::Lru);
        assert!(matches!(
            odd_sets.validate("DCACHE"),
            Err(ConfigError::NotPowerOfTwo { .. })
        ));
        let ragged = CachePolicy::make(1000, 64, 4, ReplacementPolicy::Lru);
        assert!(matches!(
            ragged.validate("DCACHE"),
            Err(ConfigError::CapacityMismatch { .. })
        ));
        let no_ways = CachePolicy::make(1024, 64, 0, ReplacementPolicy::Lru);
        assert!(matches!(no_ways.validate("DCACHE"), Err(ConfigError::ZeroWays { .. })));
    }

    #[test]
    fn test_rejects_overflowing_set_size() {
        use crate::memory::{Memsys, MemsysPolicy};

        let huge_lines =
            CachePolicy::make(32 * 1024, 1 << 63, 2, ReplacementPolicy::Lru);
        assert!(matches!(
            huge_lines.validate("DCACHE"),
            Err(ConfigError::CapacityMismatch { line_size, ways: 2, .. })
                if line_size == 1 << 63
        ));

        let policy = MemsysPolicy {
            line_size: 1 << 63,
            dcache_assoc: 2,
            ..MemsysPolicy::default()
        };
        assert!(Memsys::make(policy).is_err());
    }

    #[test]
    fn test_tag_index_split() {
        // 64 sets -> 6 index bits
        let cache = make_cache(32 * 1024, 8);
        assert_eq!(cache.get_index(0x1234_5678), 0x38);
        assert_eq!(cache.get_tag(0x1234_5678), 0x1234_5678 >> 6);

        // A single set uses the whole line address as tag
        let cache = make_cache(256, 4);
        assert_eq!(cache.num_sets(), 1);
        assert_eq!(cache.get_index(0xdead), 0);
        assert_eq!(cache.get_tag(0xdead), 0xdead);
    }

    #[test]
    fn test_cold_misses_then_hit() {
        // 1KB, 64B lines, 4 ways -> 4 sets
        let mut cache = make_cache(1024, 4);
        let outcomes: Vec<_> = [0, 1, 2, 3, 0]
            .iter()
            .enumerate()
            .map(|(t, &lineaddr)| touch(&mut cache, lineaddr, false, t as u64))
            .collect();
        use Outcome::{Hit, Miss};
        assert_eq!(outcomes, vec![Miss, Miss, Miss, Miss, Hit]);
        assert_eq!(cache.history.read_access, 5);
        assert_eq!(cache.history.read_miss, 4);
        assert_eq!(cache.history.write_access, 0);
    }

    #[test]
    fn test_repeated_access_hits() {
        let mut cache = make_cache(1024, 2);
        touch(&mut cache, 0x40, false, 0);
        for now in 1..10 {
            assert_eq!(cache.access(0x40, now % 2 == 0, 0, now), Outcome::Hit);
        }
        assert_eq!(cache.history.read_miss + cache.history.write_miss, 1);
    }

    #[test]
    fn test_cold_fill_never_evicts() {
        // One set of 4 ways
        let mut cache = make_cache(256, 4);
        for (now, lineaddr) in (0..4).enumerate() {
            assert_eq!(cache.access(lineaddr, true, 0, now as u64), Outcome::Miss);
            assert_eq!(cache.install(lineaddr, true, 0, now as u64), None);
        }
        assert_eq!(cache.history.dirty_evicts, 0);
        assert!(cache.set(0).iter().all(|line| line.valid));
    }

    #[test]
    fn test_lru_victim_and_hit_refresh() {
        let mut cache = make_cache(256, 4);
        for lineaddr in 0..4 {
            touch(&mut cache, lineaddr, false, lineaddr);
        }
        // Refresh line 0; line 1 is now the oldest
        assert_eq!(cache.access(0, false, 0, 10), Outcome::Hit);
        let evicted = cache.install(4, false, 0, 11).unwrap();
        assert_eq!(evicted.tag, 1);
        assert!(cache.is_in_cache(0, 0));
        assert!(!cache.is_in_cache(1, 0));
    }

    #[test]
    fn test_dirty_eviction_counting() {
        // Direct-mapped, 4 sets
        let mut cache = make_cache(256, 1);
        touch(&mut cache, 0, true, 0);
        touch(&mut cache, 1, false, 1);

        // Conflict on set 0 evicts a dirty line
        let evicted = cache.install(4, false, 0, 2).unwrap();
        assert!(evicted.dirty);
        assert_eq!(evicted.tag, 0);
        assert_eq!(cache.history.dirty_evicts, 1);

        // Conflict on set 1 evicts a clean line
        let evicted = cache.install(5, false, 0, 3).unwrap();
        assert!(!evicted.dirty);
        assert_eq!(cache.history.dirty_evicts, 1);
    }

    #[test]
    fn test_write_hit_marks_dirty() {
        let mut cache = make_cache(256, 1);
        touch(&mut cache, 2, false, 0);
        assert_eq!(cache.access(2, true, 0, 1), Outcome::Hit);
        assert!(cache.set(2)[0].dirty);
        assert_eq!(cache.history.write_access, 1);
        assert_eq!(cache.history.write_miss, 0);
    }

    #[test]
    fn test_cores_do_not_alias() {
        let mut cache = make_cache(1024, 4);
        assert_eq!(cache.access(7, false, 0, 0), Outcome::Miss);
        cache.install(7, false, 0, 0);
        assert_eq!(cache.access(7, false, 1, 1), Outcome::Miss);
        cache.install(7, false, 1, 1);
        assert_eq!(cache.access(7, false, 0, 2), Outcome::Hit);
        assert_eq!(cache.access(7, false, 1, 3), Outcome::Hit);
        // Both copies live side by side in the same set
        let index = cache.get_index(7);
        assert_eq!(cache.set(index).iter().filter(|line| line.valid).count(), 2);
    }

    #[test]
    fn test_needs_writeback() {
        let line = CacheLine {
            valid: true,
            dirty: true,
            tag: 3,
            core_id: 1,
            last_access: 0,
        };
        assert!(line.needs_writeback(1));
        assert!(!line.needs_writeback(0));
        assert!(!CacheLine { dirty: false, ..line }.needs_writeback(1));
        assert!(!CacheLine { valid: false, ..line }.needs_writeback(1));
    }
}
