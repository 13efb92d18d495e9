//! Deterministic device naming from the BLE MAC address.
//!
//! The friendly name is five letters drawn from alternating consonant and
//! vowel rows, one base-5 digit per letter, taken from the last four MAC
//! bytes.  The digit extraction subtracts the digit itself rather than
//! digit × place; that quirk is kept so boards keep the names they
//! already advertise.

use core::fmt::Write;

use heapless::String;

use crate::config::DEVICE_NAME_PREFIX;

/// Letters in a friendly name.
pub const FRIENDLY_NAME_LEN: usize = 5;

/// Capacity of the advertised device name.
pub const DEVICE_NAME_CAP: usize = 32;

const CODEBOOK: [&[u8; 5]; FRIENDLY_NAME_LEN] = [b"zvgpt", b"uoiea", b"zvgpt", b"uoiea", b"zvgpt"];

/// Five-letter name for `mac` (display byte order, most significant first).
pub fn friendly_name(mac: &[u8; 6]) -> String<FRIENDLY_NAME_LEN> {
    let mut n = u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]);
    let mut letters = [0u8; FRIENDLY_NAME_LEN];
    let mut place = 1u32;
    for (i, row) in CODEBOOK.iter().enumerate() {
        let digit = (n % (place * 5)) / place;
        n -= digit;
        place *= 5;
        letters[FRIENDLY_NAME_LEN - 1 - i] = row[digit as usize];
    }

    let mut name = String::new();
    for b in letters {
        // Codebook letters are ASCII and exactly fill the capacity.
        let _ = name.push(b as char);
    }
    name
}

/// Advertised local name: prefix followed by the friendly name.
pub fn device_name(mac: &[u8; 6]) -> String<DEVICE_NAME_CAP> {
    let mut name = String::new();
    let _ = write!(name, "{}{}", DEVICE_NAME_PREFIX, friendly_name(mac).as_str());
    name
}

/// Status line shown while a host is connected: `"Connected "` plus the
/// last five characters of the device name.
pub fn connected_banner(device_name: &str) -> String<DEVICE_NAME_CAP> {
    let tail_start = device_name
        .char_indices()
        .rev()
        .nth(FRIENDLY_NAME_LEN - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut line = String::new();
    let _ = write!(line, "Connected {}", &device_name[tail_start..]);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(hex: u64) -> [u8; 6] {
        let b = hex.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    #[test]
    fn known_names() {
        assert_eq!(friendly_name(&mac(0x240a_c412_3456)).as_str(), "pazog");
        assert_eq!(friendly_name(&mac(0x0000_0000_0000)).as_str(), "zuzuz");
        assert_eq!(friendly_name(&mac(0xaabb_ccdd_eeff)).as_str(), "tepup");
        assert_eq!(friendly_name(&mac(0xffff_ffff_ffff)).as_str(), "gevaz");
    }

    #[test]
    fn low_digits_change_the_last_letters() {
        assert_eq!(friendly_name(&mac(0x0000_0000_0001)).as_str(), "zuzuv");
        assert_eq!(friendly_name(&mac(0x0000_0000_0005)).as_str(), "zuzoz");
        assert_eq!(friendly_name(&mac(0x240a_c412_3457)).as_str(), "pazop");
    }

    #[test]
    fn first_two_mac_bytes_do_not_contribute() {
        assert_eq!(
            friendly_name(&mac(0x240a_c412_3456)),
            friendly_name(&mac(0xffff_c412_3456))
        );
    }

    #[test]
    fn device_name_has_prefix() {
        assert_eq!(device_name(&mac(0x240a_c412_3456)).as_str(), "PcratchIoT-pazog");
    }

    #[test]
    fn connected_banner_uses_name_tail() {
        assert_eq!(connected_banner("PcratchIoT-pazog").as_str(), "Connected pazog");
        assert_eq!(connected_banner("abc").as_str(), "Connected abc");
    }
}
