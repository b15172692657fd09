//! Intel HEX serialization
//!
//! Data records carry 16 bytes each. Images above 64 KB get extended linear address
//! records (type 04) whenever the upper address half changes; images that stay below
//! 64 KB never emit one.

use std::fmt::Write;

const RECORD_LEN: usize = 16;

/// Appends one record: `:LLAAAATT<data>CC`.
fn record(out: &mut String, address: u16, kind: u8, data: &[u8]) {
    let [hi, lo] = address.to_be_bytes();
    let sum = data
        .iter()
        .fold(data.len() as u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_add(hi)
        .wrapping_add(lo)
        .wrapping_add(kind);
    let checksum = sum.wrapping_neg();

    let _ = write!(out, ":{:02X}{:04X}{:02X}", data.len(), address, kind);
    for b in data {
        let _ = write!(out, "{:02X}", b);
    }
    let _ = writeln!(out, "{:02X}", checksum);
}

/// Renders `bytes`, loaded at `origin`, as Intel HEX text ending with the EOF record.
///
/// # Examples
///
/// ```
/// use libmicro::assembler::intel_hex::to_intel_hex;
///
/// let hex = to_intel_hex(0x0200, &[0x06, 0xFF, 0x01]);
/// assert_eq!(hex, ":0302000006FF01F5\n:00000001FF\n");
/// ```
pub fn to_intel_hex(origin: u32, bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut upper = 0u16;
    let mut offset = 0usize;

    while offset < bytes.len() {
        let address = origin + offset as u32;
        let high = (address >> 16) as u16;
        if high != upper {
            record(&mut out, 0, 0x04, &high.to_be_bytes());
            upper = high;
        }

        // a record never straddles a 64 KB boundary
        let to_boundary = 0x1_0000 - (address & 0xFFFF) as usize;
        let len = RECORD_LEN.min(bytes.len() - offset).min(to_boundary);
        record(&mut out, address as u16, 0x00, &bytes[offset..offset + len]);
        offset += len;
    }

    out.push_str(":00000001FF\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_image_is_just_eof() {
        assert_eq!(to_intel_hex(0x100, &[]), ":00000001FF\n");
    }

    #[test]
    fn test_records_split_at_sixteen_bytes() {
        let data: Vec<u8> = (0..20).collect();
        let hex = to_intel_hex(0, &data);
        let lines: Vec<&str> = hex.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(":10000000000102"));
        assert!(lines[1].starts_with(":0400100010111213"));
        assert_eq!(lines[2], ":00000001FF");
    }

    #[test]
    fn test_checksums_sum_to_zero() {
        let hex = to_intel_hex(0x1234, &[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x7F]);
        for line in hex.lines() {
            let digits = &line[1..];
            let sum = (0..digits.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).unwrap())
                .fold(0u8, |acc, b| acc.wrapping_add(b));
            assert_eq!(sum, 0, "{}", line);
        }
    }

    #[test]
    fn test_extended_address_above_64k() {
        let hex = to_intel_hex(0xFFFE, &[1, 2, 3, 4]);
        let lines: Vec<&str> = hex.lines().collect();
        assert_eq!(lines[0], ":02FFFE000102FE");
        assert_eq!(lines[1], ":020000040001F9");
        assert_eq!(lines[2], ":020000000304F7");
        assert_eq!(lines[3], ":00000001FF");
    }
}
