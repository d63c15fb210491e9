//! Decoding of the packed per-connection close outcome mask.
//!
//! Bit `i` of the mask (0 = most recent) is set when the `i + 1`-th most
//! recently closed connection ended with an error. Only the low
//! `min(64, conn_total - conn_alive)` bits carry information.

pub const MAX_SLOTS: u32 = u64::BITS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseHistory {
    /// `true` means the connection closed without error. Index 0 is the most recent.
    pub slots: Vec<bool>,
    pub error_count: u32,
}

impl CloseHistory {
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn ok_count(&self) -> u32 {
        self.size() as u32 - self.error_count
    }

    /// `"<errors>/<size>"`, the compact summary shown next to the diagram.
    pub fn summary(&self) -> String {
        format!("{}/{}", self.error_count, self.size())
    }
}

/// Meaningful slot count for a server with the given connection counters.
pub fn history_size(conn_total: u32, conn_alive: u32) -> u32 {
    conn_total.saturating_sub(conn_alive).min(MAX_SLOTS)
}

/// Decodes the low `size` bits of `mask`. The caller computes `size` via
/// [`history_size`]; no clamping happens here.
pub fn decode(mask: u64, size: u32) -> CloseHistory {
    debug_assert!(size <= MAX_SLOTS, "close history size {size} exceeds {MAX_SLOTS}");
    let slots = (0..size).map(|i| (mask >> i) & 1 == 0).collect();
    CloseHistory {
        slots,
        error_count: error_count(mask, size),
    }
}

/// Population count of the low `size` bits.
pub fn error_count(mask: u64, size: u32) -> u32 {
    low_bits(mask, size).count_ones()
}

fn low_bits(mask: u64, size: u32) -> u64 {
    if size >= MAX_SLOTS {
        mask
    } else {
        mask & ((1u64 << size) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_mask() {
        let history = decode(0b101, 3);
        assert_eq!(history.slots, vec![false, true, false]);
        assert_eq!(history.error_count, 2);
        assert_eq!(history.ok_count(), 1);
        assert_eq!(history.summary(), "2/3");
    }

    #[test]
    fn ignores_bits_above_size() {
        let history = decode(u64::MAX << 4 | 0b0010, 4);
        assert_eq!(history.slots, vec![true, false, true, true]);
        assert_eq!(history.error_count, 1);
    }

    #[test]
    fn handles_empty_and_full_windows() {
        let empty = decode(u64::MAX, 0);
        assert!(empty.slots.is_empty());
        assert_eq!(empty.error_count, 0);

        let full = decode(u64::MAX, 64);
        assert_eq!(full.slots.len(), 64);
        assert!(full.slots.iter().all(|ok| !ok));
        assert_eq!(full.error_count, 64);
    }

    #[test]
    fn error_count_matches_failed_slots() {
        let mut mask: u64 = 0x9E37_79B9_7F4A_7C15;
        for round in 0..256u32 {
            mask = mask.rotate_left(7) ^ mask.wrapping_mul(0x2545_F491_4F6C_DD1D);
            let size = round % (MAX_SLOTS + 1);
            let history = decode(mask, size);
            let failed = history.slots.iter().filter(|ok| !**ok).count() as u32;
            assert_eq!(history.error_count, failed, "mask={mask:#x} size={size}");
        }
    }

    #[test]
    fn history_size_is_capped() {
        assert_eq!(history_size(10, 3), 7);
        assert_eq!(history_size(500, 3), 64);
        assert_eq!(history_size(2, 5), 0);
    }
}
