//! Backing store (DRAM) timing models.
//!
//! The hierarchy only ever asks a backing store one question: given a line
//! address and whether the access is a write-back, how many cycles did it
//! take. Each model keeps its own read/write statistics.

use log::trace;

use super::Addr;

pub const DRAM_FIXED_LATENCY: u64 = 100;

pub const DRAM_ACT_LATENCY: u64 = 45;
pub const DRAM_CAS_LATENCY: u64 = 45;
pub const DRAM_PRE_LATENCY: u64 = 45;
pub const DRAM_BUS_LATENCY: u64 = 10;

pub const DRAM_NUM_BANKS: u64 = 16;
pub const DRAM_ROW_SIZE: u64 = 1024;

/// Which backing store model a hierarchy uses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DramPolicy {
    FixedLatency,
    RowBuffer,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct DramHistory {
    pub read_access: u64,
    pub write_access: u64,
    pub read_delay: u64,
    pub write_delay: u64,
}

impl DramHistory {
    pub fn read_delay_avg(&self) -> f64 {
        if self.read_access == 0 {
            return 0.0;
        }
        self.read_delay as f64 / self.read_access as f64
    }

    pub fn write_delay_avg(&self) -> f64 {
        if self.write_access == 0 {
            return 0.0;
        }
        self.write_delay as f64 / self.write_access as f64
    }

    fn record(&mut self, is_writeback: bool, delay: u64) {
        if is_writeback {
            self.write_access += 1;
            self.write_delay += delay;
        } else {
            self.read_access += 1;
            self.read_delay += delay;
        }
    }
}

/// Backing store interface
pub trait BackingStore {
    /// Service one line and return its latency in cycles
    fn access(&mut self, lineaddr: Addr, is_writeback: bool) -> u64;

    fn history(&self) -> DramHistory;
}

/// Build the backing store for a policy
pub fn make_dram(policy: DramPolicy, line_size: u64) -> Box<dyn BackingStore> {
    match policy {
        DramPolicy::FixedLatency => {
            Box::new(FixedLatencyDram::make(DRAM_FIXED_LATENCY))
        }
        DramPolicy::RowBuffer => Box::new(RowBufferDram::make(line_size)),
    }
}

/// Every access costs the same
pub struct FixedLatencyDram {
    latency: u64,
    history: DramHistory,
}

impl FixedLatencyDram {
    pub fn make(latency: u64) -> Self {
        Self { latency, history: DramHistory::default() }
    }
}

impl BackingStore for FixedLatencyDram {
    fn access(&mut self, _lineaddr: Addr, is_writeback: bool) -> u64 {
        self.history.record(is_writeback, self.latency);
        self.latency
    }

    fn history(&self) -> DramHistory {
        self.history
    }
}

/// Banked DRAM with one open row per bank (open-page policy)
pub struct RowBufferDram {
    lines_per_row: u64,
    open_rows: Vec<Option<u64>>,
    pub row_hits: u64,
    history: DramHistory,
}

impl RowBufferDram {
    pub fn make(line_size: u64) -> Self {
        Self {
            lines_per_row: (DRAM_ROW_SIZE / line_size).max(1),
            open_rows: vec![None; DRAM_NUM_BANKS as usize],
            row_hits: 0,
            history: DramHistory::default(),
        }
    }

    /// Consecutive rows are interleaved across banks
    fn locate(&self, lineaddr: Addr) -> (usize, u64) {
        let row_number = lineaddr / self.lines_per_row;
        let bank = (row_number % DRAM_NUM_BANKS) as usize;
        (bank, row_number / DRAM_NUM_BANKS)
    }
}

impl BackingStore for RowBufferDram {
    fn access(&mut self, lineaddr: Addr, is_writeback: bool) -> u64 {
        let (bank, row) = self.locate(lineaddr);
        let delay = match self.open_rows[bank] {
            Some(open) if open == row => {
                self.row_hits += 1;
                DRAM_CAS_LATENCY + DRAM_BUS_LATENCY
            }
            Some(_) => {
                DRAM_PRE_LATENCY
                    + DRAM_ACT_LATENCY
                    + DRAM_CAS_LATENCY
                    + DRAM_BUS_LATENCY
            }
            None => DRAM_ACT_LATENCY + DRAM_CAS_LATENCY + DRAM_BUS_LATENCY,
        };
        self.open_rows[bank] = Some(row);

        trace!(
            "DRAM {:#x} bank={} row={} writeback={} delay={}",
            lineaddr,
            bank,
            row,
            is_writeback,
            delay
        );
        self.history.record(is_writeback, delay);
        delay
    }

    fn history(&self) -> DramHistory {
        self.history
    }
}
