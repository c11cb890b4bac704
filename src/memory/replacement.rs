//! Victim selection for full cache sets

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::cache::CacheLine;
use crate::error::ConfigError;

/// Replacement policy of a cache.
///
/// Selector values follow the numbering used on the command line:
/// 0 = LRU, 1 = random, 2 = static way partitioning.
/// Selector 3 (dynamic way partitioning) is reserved and rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    #[default]
    Lru,
    Random,
    /// Core 0 owns `core0_ways` ways of every set,
    /// the other cores share the rest
    StaticWayPartition { core0_ways: usize },
}

impl ReplacementPolicy {
    /// Build a policy from its numeric selector
    pub fn from_selector(
        selector: u64,
        core0_ways: usize,
    ) -> Result<Self, ConfigError> {
        match selector {
            0 => Ok(ReplacementPolicy::Lru),
            1 => Ok(ReplacementPolicy::Random),
            2 => Ok(ReplacementPolicy::StaticWayPartition { core0_ways }),
            3 => Err(ConfigError::UnsupportedPolicy(
                "3 (dynamic way partitioning)".to_string(),
            )),
            other => Err(ConfigError::UnsupportedPolicy(other.to_string())),
        }
    }

    pub fn validate(&self, cache: &str, ways: usize) -> Result<(), ConfigError> {
        if let ReplacementPolicy::StaticWayPartition { core0_ways } = *self {
            if core0_ways > ways {
                return Err(ConfigError::InvalidPartition {
                    cache: cache.to_string(),
                    core0_ways,
                    ways,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Lru => write!(f, "LRU"),
            ReplacementPolicy::Random => write!(f, "RAND"),
            ReplacementPolicy::StaticWayPartition { core0_ways } => {
                write!(f, "SWP({})", core0_ways)
            }
        }
    }
}

/// Picks the way to evict from a set with no invalid ways
pub struct Replacer {
    policy: ReplacementPolicy,
    rng: StdRng,
}

impl Replacer {
    /// Random selection is reproducible for a given seed
    pub fn make(policy: ReplacementPolicy, seed: u64) -> Self {
        Self { policy, rng: StdRng::seed_from_u64(seed) }
    }

    /// Return the way to evict.
    /// The result is always within `0..set.len()`.
    pub fn select(&mut self, set: &[CacheLine], core_id: usize) -> usize {
        assert!(!set.is_empty());
        match self.policy {
            ReplacementPolicy::Lru => lru_way(set, |_| true).unwrap_or(0),
            ReplacementPolicy::Random => self.rng.gen_range(0..set.len()),
            ReplacementPolicy::StaticWayPartition { core0_ways } => {
                let quota = if core_id == 0 {
                    core0_ways
                } else {
                    set.len().saturating_sub(core0_ways)
                };
                let owned =
                    set.iter().filter(|line| line.core_id == core_id).count();

                // At or over quota: recycle one of our own lines,
                // otherwise take a way back from the other cores
                let candidate = if owned >= quota {
                    lru_way(set, |line| line.core_id == core_id)
                } else {
                    lru_way(set, |line| line.core_id != core_id)
                };
                candidate.or_else(|| lru_way(set, |_| true)).unwrap_or(0)
            }
        }
    }
}

/// Oldest line among those passing `keep`; ties go to the lowest way
fn lru_way(
    set: &[CacheLine],
    keep: impl Fn(&CacheLine) -> bool,
) -> Option<usize> {
    set.iter()
        .enumerate()
        .filter(|(_, line)| keep(*line))
        .min_by_key(|(_, line)| line.last_access)
        .map(|(way, _)| way)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(core_id: usize, last_access: u64) -> CacheLine {
        CacheLine { valid: true, dirty: false, tag: 0, core_id, last_access }
    }

    #[test]
    fn test_lru_picks_oldest() {
        let set = [line(0, 7), line(0, 3), line(0, 9), line(0, 5)];
        let mut replacer = Replacer::make(ReplacementPolicy::Lru, 0);
        assert_eq!(replacer.select(&set, 0), 1);
    }

    #[test]
    fn test_lru_tie_goes_to_lowest_way() {
        let set = [line(0, 4), line(0, 2), line(0, 2), line(0, 8)];
        let mut replacer = Replacer::make(ReplacementPolicy::Lru, 0);
        assert_eq!(replacer.select(&set, 0), 1);
    }

    #[test]
    fn test_random_is_in_range_and_reproducible() {
        let set = [line(0, 0); 8];
        let mut a = Replacer::make(ReplacementPolicy::Random, 42);
        let mut b = Replacer::make(ReplacementPolicy::Random, 42);
        for _ in 0..1000 {
            let way = a.select(&set, 0);
            assert!(way < set.len());
            assert_eq!(way, b.select(&set, 0));
        }
    }

    #[test]
    fn test_swp_under_quota_steals_from_other_core() {
        // Core 0 owns 1 of 4 ways but is entitled to 2
        let set = [line(1, 1), line(0, 0), line(1, 5), line(1, 3)];
        let policy = ReplacementPolicy::StaticWayPartition { core0_ways: 2 };
        let mut replacer = Replacer::make(policy, 0);
        assert_eq!(replacer.select(&set, 0), 0);
    }

    #[test]
    fn test_swp_at_quota_recycles_own_line() {
        let set = [line(1, 1), line(0, 6), line(0, 4), line(1, 3)];
        let policy = ReplacementPolicy::StaticWayPartition { core0_ways: 2 };
        let mut replacer = Replacer::make(policy, 0);
        assert_eq!(replacer.select(&set, 0), 2);
        // Core 1 also holds exactly its 2 ways
        assert_eq!(replacer.select(&set, 1), 0);
    }

    #[test]
    fn test_swp_zero_quota_falls_back_to_lru() {
        let set = [line(1, 4), line(1, 2)];
        let policy = ReplacementPolicy::StaticWayPartition { core0_ways: 0 };
        let mut replacer = Replacer::make(policy, 0);
        assert_eq!(replacer.select(&set, 0), 1);
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            ReplacementPolicy::from_selector(0, 0),
            Ok(ReplacementPolicy::Lru)
        );
        assert_eq!(
            ReplacementPolicy::from_selector(2, 3),
            Ok(ReplacementPolicy::StaticWayPartition { core0_ways: 3 })
        );
        assert!(matches!(
            ReplacementPolicy::from_selector(3, 0),
            Err(ConfigError::UnsupportedPolicy(_))
        ));
        assert!(ReplacementPolicy::from_selector(17, 0).is_err());
    }

    #[test]
    fn test_partition_validation() {
        let policy = ReplacementPolicy::StaticWayPartition { core0_ways: 9 };
        assert!(policy.validate("L2CACHE", 8).is_err());
        assert!(policy.validate("L2CACHE", 16).is_ok());
    }
}
