//! Shared helpers for decoder integration tests.
//!
//! Provides the inverse of the decoder: pack known field values into an
//! SGTIN-96 hex string so tests never hand-author binary layouts.

#![allow(dead_code)]

use tagscan_epc::PARTITION_TABLE;

/// Field values for one SGTIN-96 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SgtinFields {
    pub filter: u8,
    pub partition: u8,
    pub company_prefix: u64,
    pub indicator: u8,
    pub item_reference: u64,
    pub serial: u64,
}

impl SgtinFields {
    /// Value stored in the item reference field (indicator digit prepended).
    pub fn item_field(&self) -> u64 {
        let info = PARTITION_TABLE[self.partition as usize];
        u64::from(self.indicator) * 10u64.pow(info.item_ref_digits as u32) + self.item_reference
    }

    /// Expected zero-padded company prefix string.
    pub fn company_prefix_string(&self) -> String {
        let info = PARTITION_TABLE[self.partition as usize];
        format!(
            "{:0width$}",
            self.company_prefix,
            width = info.company_prefix_digits
        )
    }

    /// Expected zero-padded item reference string.
    pub fn item_reference_string(&self) -> String {
        let info = PARTITION_TABLE[self.partition as usize];
        format!(
            "{:0width$}",
            self.item_reference,
            width = info.item_ref_digits
        )
    }
}

/// Encode field values as a 24-character uppercase hex EPC.
///
/// Panics if a value does not fit its field, which keeps strategies honest.
pub fn encode_sgtin96(fields: &SgtinFields) -> String {
    let info = PARTITION_TABLE[fields.partition as usize];
    let item_field = fields.item_field();

    assert!(fields.filter < 8, "filter out of range");
    assert!(fields.company_prefix < (1u64 << info.company_prefix_bits));
    assert!(item_field < (1u64 << info.item_ref_bits));
    assert!(fields.serial < (1u64 << 38));

    let serial_shift = 0;
    let item_shift = 38;
    let prefix_shift = item_shift + info.item_ref_bits;

    let value: u128 = (0x30u128 << 88)
        | (u128::from(fields.filter) << 85)
        | (u128::from(fields.partition) << 82)
        | (u128::from(fields.company_prefix) << prefix_shift)
        | (u128::from(item_field) << item_shift)
        | (u128::from(fields.serial) << serial_shift);

    format!("{value:024X}")
}

/// Overwrite the header byte of a hex EPC.
pub fn with_header(epc: &str, header: u8) -> String {
    format!("{header:02X}{}", &epc[2..])
}

#[test]
fn test_encoder_matches_reference_vector() {
    let fields = SgtinFields {
        filter: 3,
        partition: 5,
        company_prefix: 614141,
        indicator: 0,
        item_reference: 812345,
        serial: 6789,
    };
    assert_eq!(encode_sgtin96(&fields), "3074257BF7194E4000001A85");
}
