//! Virtual to physical translation for the per-core hierarchies.
//!
//! There is no page table: every virtual page of a core maps to a fixed
//! physical frame. The same virtual page of the two cores always lands in
//! two different frames. Different virtual pages may still share a frame,
//! e.g. VPN `1 << 20` of core 0 and VPN 0 of core 1.

use super::cache::get_log_2;
use super::Addr;

pub const PAGE_WIDTH: usize = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_WIDTH;

/// The remap only knows how to place two cores
pub const NUM_CORES: usize = 2;

// The low 20 bits of a VPN are kept, the rest is added at the core bit
const TAIL_WIDTH: usize = 20;
const HEAD_SHIFT: usize = 21;
const TAIL_MASK: u64 = (1 << TAIL_WIDTH) - 1;

/// Convert a virtual page number of `core_id` into a physical frame number
pub fn convert_vpn_to_pfn(vpn: u64, core_id: usize) -> u64 {
    assert!(
        core_id < NUM_CORES,
        "core {} out of range for {}-core translation",
        core_id,
        NUM_CORES
    );
    let tail = vpn & TAIL_MASK;
    let head = vpn >> TAIL_WIDTH;
    tail + ((core_id as u64) << HEAD_SHIFT) + (head << HEAD_SHIFT)
}

/// Memory management unit working on line addresses
#[derive(Clone, Copy, Debug)]
pub struct MMU {
    // log2(lines per page)
    page_offset_bits: usize,
}

impl MMU {
    /// `line_size` must be a power of two no larger than a page
    pub fn make(line_size: u64) -> Self {
        assert!(line_size > 0 && line_size <= PAGE_SIZE);
        Self { page_offset_bits: get_log_2(PAGE_SIZE / line_size) }
    }

    /// The virtual page a line address falls in
    pub fn get_vpn(&self, lineaddr: Addr) -> u64 {
        lineaddr >> self.page_offset_bits
    }

    /// Line offset within its page
    pub fn get_page_offset(&self, lineaddr: Addr) -> u64 {
        lineaddr & ((1 << self.page_offset_bits) - 1)
    }

    /// Translate a virtual line address into a physical one
    pub fn translate(&self, v_lineaddr: Addr, core_id: usize) -> Addr {
        let pfn = convert_vpn_to_pfn(self.get_vpn(v_lineaddr), core_id);
        (pfn << self.page_offset_bits) | self.get_page_offset(v_lineaddr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_by_hand() {
        assert_eq!(convert_vpn_to_pfn(0, 0), 0);
        assert_eq!(convert_vpn_to_pfn(0, 1), 1 << 21);
        assert_eq!(convert_vpn_to_pfn(0x12345, 0), 0x12345);
        assert_eq!(convert_vpn_to_pfn(0x12345, 1), 0x12345 + (1 << 21));
        // VPN bit 20 lands on the core bit, PFN bit 21
        assert_eq!(convert_vpn_to_pfn(1 << 20, 0), 1 << 21);
        assert_eq!(convert_vpn_to_pfn(1 << 20, 0), convert_vpn_to_pfn(0, 1));
        assert_eq!(convert_vpn_to_pfn((1 << 20) | 7, 1), 7 + (2 << 21));
    }

    #[test]
    fn test_convert_is_pure() {
        for vpn in [0, 1, 0xfffff, 0x100000, 0xdead_beef, 1 << 40] {
            for core_id in 0..NUM_CORES {
                assert_eq!(
                    convert_vpn_to_pfn(vpn, core_id),
                    convert_vpn_to_pfn(vpn, core_id)
                );
            }
        }
    }

    #[test]
    fn test_cores_never_share_frames() {
        for vpn in (0..1u64 << 24).step_by(4099) {
            assert_ne!(convert_vpn_to_pfn(vpn, 0), convert_vpn_to_pfn(vpn, 1));
        }
    }

    #[test]
    #[should_panic]
    fn test_third_core_is_rejected() {
        convert_vpn_to_pfn(0, 2);
    }

    #[test]
    fn test_translate_lineaddr() {
        // 64 lines per 4KB page
        let mmu = MMU::make(64);
        let v_lineaddr = (5 << 6) | 9;
        assert_eq!(mmu.get_vpn(v_lineaddr), 5);
        assert_eq!(mmu.get_page_offset(v_lineaddr), 9);
        assert_eq!(mmu.translate(v_lineaddr, 0), v_lineaddr);
        assert_eq!(mmu.translate(v_lineaddr, 1), (((1 << 21) + 5) << 6) | 9);
    }

    #[test]
    fn test_translate_page_sized_lines() {
        let mmu = MMU::make(PAGE_SIZE);
        assert_eq!(mmu.translate(3, 1), 3 + (1 << 21));
    }
}
