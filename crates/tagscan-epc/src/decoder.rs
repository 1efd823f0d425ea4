//! SGTIN-96 EPC decoder.
//!
//! Converts the hex EPC reported by a UHF reader into a GTIN-14 and serial
//! number. The decoder is a pure function: no state, no allocation outside the
//! returned strings, safe to call concurrently from any thread.
//!
//! # Examples
//!
//! ```
//! use tagscan_epc::{EpcDecodeResult, decode};
//!
//! match decode("3074257BF7194E4000001A85") {
//!     EpcDecodeResult::Success(sgtin) => {
//!         assert_eq!(sgtin.company_prefix, "0614141");
//!         assert_eq!(sgtin.serial, "6789");
//!         assert_eq!(sgtin.gtin14.len(), 14);
//!     }
//!     EpcDecodeResult::Failure { reason } => panic!("unexpected failure: {reason}"),
//! }
//!
//! // Non-SGTIN tags are an ordinary outcome, not an error.
//! assert!(!decode("E2801160600002054C4D8B3A").is_success());
//! ```

use crate::constants::{
    COMPANY_PREFIX_OFFSET, EPC_BITS, EPC_HEX_LENGTH, FILTER_BITS, GTIN_CORE_DIGITS, HEADER_BITS,
    PARTITION_BITS, SGTIN96_HEADER, partition_info,
};
use crate::error::DecodeFailure;
use crate::types::{EpcDecodeResult, Sgtin96};

/// Decode a hex EPC string as SGTIN-96.
///
/// Spaces are stripped and letters uppercased before validation, so
/// `"3074 257B F719 4E40 0000 1A85"` decodes the same as the compact form.
pub fn decode(hex_epc: &str) -> EpcDecodeResult {
    try_decode(hex_epc).into()
}

/// Decode a hex EPC string, returning a standard `Result`.
///
/// # Errors
///
/// Returns the [`DecodeFailure`] describing the first check that failed.
pub fn try_decode(hex_epc: &str) -> Result<Sgtin96, DecodeFailure> {
    let normalized = normalize(hex_epc);
    let bits = parse_bits(&normalized)?;

    let header = field(bits, 0, HEADER_BITS) as u8;
    if header != SGTIN96_HEADER {
        return Err(DecodeFailure::NotSgtin96 { header });
    }

    let filter = field(bits, HEADER_BITS, FILTER_BITS) as u8;

    let partition = field(bits, HEADER_BITS + FILTER_BITS, PARTITION_BITS) as u8;
    let info =
        partition_info(partition).ok_or(DecodeFailure::InvalidPartition { value: partition })?;

    let item_ref_offset = COMPANY_PREFIX_OFFSET + info.company_prefix_bits;
    let serial_offset = item_ref_offset + info.item_ref_bits;

    let company_prefix = zero_pad(
        field(bits, COMPANY_PREFIX_OFFSET, info.company_prefix_bits),
        info.company_prefix_digits,
    );

    // Indicator digit travels as the leading digit of the item reference field.
    let item_field = zero_pad(
        field(bits, item_ref_offset, info.item_ref_bits),
        info.item_ref_digits + 1,
    );
    let (indicator, item_reference) = item_field.split_at(1);
    let indicator_digit = indicator
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .unwrap_or(0) as u8;
    let item_reference = format!("{:0>width$}", item_reference, width = info.item_ref_digits);

    let serial = field(bits, serial_offset, EPC_BITS - serial_offset).to_string();

    let core = gtin_core(&format!("{indicator}{company_prefix}{item_reference}"));
    let check = gs1_check_digit(&core).unwrap_or(0);

    Ok(Sgtin96 {
        gtin14: format!("{core}{check}"),
        serial,
        company_prefix,
        item_reference,
        indicator_digit,
        filter,
    })
}

/// Compute the GS1 mod-10 check digit for a string of decimal digits.
///
/// Digits are weighted from the right: 3 at even distance from the end, 1 at
/// odd distance. Returns `None` for empty input or any non-digit character.
///
/// # Examples
///
/// ```
/// use tagscan_epc::gs1_check_digit;
///
/// assert_eq!(gs1_check_digit("8061414112345"), Some(8));
/// assert_eq!(gs1_check_digit("12A"), None);
/// ```
pub fn gs1_check_digit(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        return None;
    }

    let mut sum = 0u32;
    for (distance, c) in digits.chars().rev().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if distance % 2 == 0 { digit * 3 } else { digit };
    }

    Some(((10 - sum % 10) % 10) as u8)
}

/// Strip spaces and uppercase.
fn normalize(hex_epc: &str) -> String {
    hex_epc
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validate a normalized EPC and pack it into the low 96 bits of a `u128`.
fn parse_bits(normalized: &str) -> Result<u128, DecodeFailure> {
    let actual = normalized.chars().count();
    if actual != EPC_HEX_LENGTH {
        return Err(DecodeFailure::InvalidLength { actual });
    }

    normalized
        .chars()
        .enumerate()
        .try_fold(0u128, |acc, (position, c)| {
            let nibble = c
                .to_digit(16)
                .ok_or(DecodeFailure::InvalidHex { found: c, position })?;
            Ok((acc << 4) | u128::from(nibble))
        })
}

/// Read `len` bits starting `start` bits from the most significant end.
///
/// Every SGTIN-96 field fits in 64 bits; wider reads are a caller bug.
fn field(bits: u128, start: u32, len: u32) -> u64 {
    debug_assert!(len <= u64::BITS, "field of {len} bits does not fit in u64");
    let shift = EPC_BITS - start - len;
    let mask = (1u128 << len) - 1;
    ((bits >> shift) & mask) as u64
}

fn zero_pad(value: u64, width: usize) -> String {
    format!("{value:0width$}")
}

/// Force the indicator + prefix + item reference concatenation to 13 digits,
/// keeping the rightmost digits.
fn gtin_core(digits: &str) -> String {
    let len = digits.len();
    if len > GTIN_CORE_DIGITS {
        digits[len - GTIN_CORE_DIGITS..].to_string()
    } else {
        format!("{digits:0>GTIN_CORE_DIGITS$}")
    }
}
