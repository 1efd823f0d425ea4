//! SGTIN-96 layout constants.
//!
//! The SGTIN-96 encoding packs a serialized GTIN into 96 bits:
//!
//! ```text
//! | Header (8) | Filter (3) | Partition (3) | Company Prefix (20-40) | Item Ref (24-4) | Serial (38) |
//! ```
//!
//! The partition value selects how the 44 bits following the partition field
//! are split between the GS1 company prefix and the item reference. The table
//! is fixed by the GS1 EPC Tag Data Standard and lives here as `const` data.
//!
//! # Usage
//!
//! ```
//! use tagscan_epc::constants::*;
//!
//! assert_eq!(SGTIN96_HEADER, 0x30);
//!
//! let info = partition_info(5).unwrap();
//! assert_eq!(info.company_prefix_digits, 7);
//! assert!(partition_info(7).is_none());
//! ```

// ============================================================================
// Encoding Layout
// ============================================================================

/// Header value identifying an SGTIN-96 EPC (`00110000`).
pub const SGTIN96_HEADER: u8 = 0x30;

/// Total number of bits in an SGTIN-96 EPC.
pub const EPC_BITS: u32 = 96;

/// Number of hexadecimal characters in an SGTIN-96 EPC.
///
/// # Examples
///
/// ```
/// use tagscan_epc::constants::{EPC_BITS, EPC_HEX_LENGTH};
///
/// assert_eq!(EPC_HEX_LENGTH * 4, EPC_BITS as usize);
/// ```
pub const EPC_HEX_LENGTH: usize = 24;

/// Width of the header field in bits.
pub const HEADER_BITS: u32 = 8;

/// Width of the filter (packaging level) field in bits.
pub const FILTER_BITS: u32 = 3;

/// Width of the partition field in bits.
pub const PARTITION_BITS: u32 = 3;

/// Width of the serial number field in bits.
///
/// The largest encodable serial is `2^38 - 1` (274877906943).
pub const SERIAL_BITS: u32 = 38;

/// Bit offset where the company prefix starts.
pub const COMPANY_PREFIX_OFFSET: u32 = HEADER_BITS + FILTER_BITS + PARTITION_BITS;

/// Number of digits in a GTIN-14 without its check digit.
pub const GTIN_CORE_DIGITS: usize = 13;

// ============================================================================
// Partition Table
// ============================================================================

/// Bit and digit widths for one SGTIN-96 partition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Bits used by the GS1 company prefix.
    pub company_prefix_bits: u32,

    /// Decimal digits in the GS1 company prefix.
    pub company_prefix_digits: usize,

    /// Bits used by the indicator digit and item reference.
    pub item_ref_bits: u32,

    /// Decimal digits in the item reference, excluding the indicator digit.
    pub item_ref_digits: usize,
}

impl PartitionInfo {
    const fn new(
        company_prefix_bits: u32,
        company_prefix_digits: usize,
        item_ref_bits: u32,
        item_ref_digits: usize,
    ) -> Self {
        Self {
            company_prefix_bits,
            company_prefix_digits,
            item_ref_bits,
            item_ref_digits,
        }
    }
}

/// SGTIN-96 partition table, indexed by partition value (0-6).
///
/// Company prefix and item reference always share 44 bits.
pub const PARTITION_TABLE: [PartitionInfo; 7] = [
    PartitionInfo::new(40, 12, 4, 1),
    PartitionInfo::new(37, 11, 7, 2),
    PartitionInfo::new(34, 10, 10, 3),
    PartitionInfo::new(30, 9, 14, 4),
    PartitionInfo::new(27, 8, 17, 5),
    PartitionInfo::new(24, 7, 20, 6),
    PartitionInfo::new(20, 6, 24, 7),
];

/// Look up the layout for a partition value.
///
/// Returns `None` for 7, the only 3-bit value with no assigned layout.
#[must_use]
pub const fn partition_info(partition: u8) -> Option<PartitionInfo> {
    if (partition as usize) < PARTITION_TABLE.len() {
        Some(PARTITION_TABLE[partition as usize])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_fields_share_44_bits() {
        for info in PARTITION_TABLE {
            assert_eq!(info.company_prefix_bits + info.item_ref_bits, 44);
        }
    }

    #[test]
    fn test_partition_digits_cover_gtin_core() {
        for info in PARTITION_TABLE {
            assert_eq!(
                info.company_prefix_digits + info.item_ref_digits + 1,
                GTIN_CORE_DIGITS + 1
            );
        }
    }

    #[test]
    fn test_layout_fills_96_bits() {
        for info in PARTITION_TABLE {
            let total = COMPANY_PREFIX_OFFSET
                + info.company_prefix_bits
                + info.item_ref_bits
                + SERIAL_BITS;
            assert_eq!(total, EPC_BITS);
        }
    }

    #[test]
    fn test_partition_lookup_bounds() {
        assert_eq!(partition_info(0), Some(PARTITION_TABLE[0]));
        assert_eq!(partition_info(6), Some(PARTITION_TABLE[6]));
        assert_eq!(partition_info(7), None);
    }
}
