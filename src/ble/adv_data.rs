//! Legacy advertising payloads (31 bytes max) and an AD-structure reader.
//!
//! Advertising data carries flags, the complete 128-bit service UUID list
//! and the appearance; the complete local name goes in the scan response.

use heapless::Vec;

use crate::config::{ADV_APPEARANCE_GENERIC_TAG, ADV_INTERVAL_UNITS, IOT_SERVICE_UUID};
use crate::error::Error;

/// Legacy advertising / scan-response payload limit.
pub const ADV_PAYLOAD_MAX: usize = 31;

// AD types (Bluetooth Assigned Numbers, section 2.3)
pub const AD_FLAGS: u8 = 0x01;
pub const AD_UUID128_INCOMPLETE: u8 = 0x06;
pub const AD_UUID128_COMPLETE: u8 = 0x07;
pub const AD_NAME_SHORT: u8 = 0x08;
pub const AD_NAME_COMPLETE: u8 = 0x09;
pub const AD_APPEARANCE: u8 = 0x19;

/// LE General Discoverable, BR/EDR not supported.
pub const FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

/// One advertising or scan-response payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvPayload {
    buf: Vec<u8, ADV_PAYLOAD_MAX>,
}

impl AdvPayload {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append one AD structure (`len`, `type`, `data`).
    pub fn push(&mut self, ad_type: u8, data: &[u8]) -> Result<(), Error> {
        if self.buf.len() + 2 + data.len() > ADV_PAYLOAD_MAX {
            return Err(Error::BufferOverflow);
        }
        // Capacity was checked above, so these cannot fail.
        let _ = self.buf.push(data.len() as u8 + 1);
        let _ = self.buf.push(ad_type);
        let _ = self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Append a name, shortened to whatever room is left.
    pub fn push_name(&mut self, name: &str) -> Result<(), Error> {
        let room = ADV_PAYLOAD_MAX
            .checked_sub(self.buf.len() + 2)
            .ok_or(Error::BufferOverflow)?;
        if name.len() <= room {
            return self.push(AD_NAME_COMPLETE, name.as_bytes());
        }
        let mut cut = room;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        self.push(AD_NAME_SHORT, &name.as_bytes()[..cut])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Everything the transport needs to start advertising.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advertisement {
    pub adv_data: AdvPayload,
    pub scan_data: AdvPayload,
    /// Interval in 0.625 ms units.
    pub interval: u32,
}

impl Advertisement {
    /// Connectable advertisement for the IoT service under `device_name`.
    pub fn for_device(device_name: &str) -> Result<Self, Error> {
        let uuid = parse_uuid128(IOT_SERVICE_UUID).ok_or(Error::BufferOverflow)?;

        let mut adv_data = AdvPayload::new();
        adv_data.push(AD_FLAGS, &[FLAGS_GENERAL_DISCOVERABLE])?;
        adv_data.push(AD_UUID128_COMPLETE, &uuid)?;
        adv_data.push(AD_APPEARANCE, &ADV_APPEARANCE_GENERIC_TAG.to_le_bytes())?;

        let mut scan_data = AdvPayload::new();
        scan_data.push_name(device_name)?;

        Ok(Self {
            adv_data,
            scan_data,
            interval: ADV_INTERVAL_UNITS,
        })
    }
}

/// Parse a textual UUID into the little-endian byte order used on air.
pub fn parse_uuid128(text: &str) -> Option<[u8; 16]> {
    let mut out = [0u8; 16];
    let mut nibbles = text.bytes().filter(|b| *b != b'-');
    for slot in out.iter_mut().rev() {
        let hi = hex_value(nibbles.next()?)?;
        let lo = hex_value(nibbles.next()?)?;
        *slot = (hi << 4) | lo;
    }
    if nibbles.next().is_some() {
        return None;
    }
    Some(out)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Iterator over the AD structures of a raw payload.  Stops at a zero
/// length or a structure that runs past the end.
pub struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> AdStructures<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.data.split_first()?;
        let len = len as usize;
        if len == 0 || len > rest.len() {
            self.data = &[];
            return None;
        }
        let (field, tail) = rest.split_at(len);
        self.data = tail;
        Some((field[0], &field[1..]))
    }
}

/// Whether `data` lists the 128-bit service `uuid` (little-endian bytes).
pub fn contains_service_uuid128(data: &[u8], uuid: &[u8; 16]) -> bool {
    AdStructures::new(data)
        .filter(|(t, _)| *t == AD_UUID128_COMPLETE || *t == AD_UUID128_INCOMPLETE)
        .any(|(_, uuids)| uuids.chunks_exact(16).any(|c| c == uuid))
}

/// Complete or shortened local name, if present and valid UTF-8.
pub fn extract_device_name(data: &[u8]) -> Option<&str> {
    AdStructures::new(data)
        .find(|(t, _)| *t == AD_NAME_COMPLETE || *t == AD_NAME_SHORT)
        .and_then(|(_, name)| core::str::from_utf8(name).ok())
}

pub fn extract_appearance(data: &[u8]) -> Option<u16> {
    AdStructures::new(data)
        .find(|(t, d)| *t == AD_APPEARANCE && d.len() == 2)
        .map(|(_, d)| u16::from_le_bytes([d[0], d[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_reversed_for_the_air() {
        let uuid = parse_uuid128("0b50f3e4-607f-4151-9091-7d008d6ffc5c").unwrap();
        assert_eq!(uuid[0], 0x5c);
        assert_eq!(uuid[15], 0x0b);
        assert!(parse_uuid128("0b50f3e4").is_none());
        assert!(parse_uuid128("zz50f3e4-607f-4151-9091-7d008d6ffc5c").is_none());
    }

    #[test]
    fn advertisement_fits_and_parses_back() {
        let adv = Advertisement::for_device("PcratchIoT-pazog").unwrap();
        assert!(adv.adv_data.len() <= ADV_PAYLOAD_MAX);
        assert_eq!(&adv.adv_data.as_slice()[..3], &[0x02, AD_FLAGS, 0x06]);

        let uuid = parse_uuid128(IOT_SERVICE_UUID).unwrap();
        assert!(contains_service_uuid128(adv.adv_data.as_slice(), &uuid));
        assert_eq!(extract_appearance(adv.adv_data.as_slice()), Some(0x0200));
        assert_eq!(
            extract_device_name(adv.scan_data.as_slice()),
            Some("PcratchIoT-pazog")
        );
        assert_eq!(adv.interval, 400);
    }

    #[test]
    fn long_name_is_shortened() {
        let long = "PcratchIoT-abcdefghijklmnopqrstuvwxyz";
        let adv = Advertisement::for_device(long).unwrap();
        let scan = adv.scan_data.as_slice();
        assert_eq!(scan.len(), ADV_PAYLOAD_MAX);
        assert_eq!(scan[1], AD_NAME_SHORT);
        assert_eq!(extract_device_name(scan), Some(&long[..29]));
    }

    #[test]
    fn push_rejects_overflow() {
        let mut p = AdvPayload::new();
        assert_eq!(p.push(0xFF, &[0; 29]), Ok(()));
        assert_eq!(p.push(0xFF, &[]), Err(Error::BufferOverflow));
    }

    #[test]
    fn truncated_structure_stops_parsing() {
        let data = [0x02, 0x01, 0x06, 0x05, 0x09, b'a'];
        assert_eq!(extract_device_name(&data), None);
        assert_eq!(AdStructures::new(&data).count(), 1);
        assert_eq!(AdStructures::new(&[]).count(), 0);
        assert_eq!(AdStructures::new(&[0x00, 0x01]).count(), 0);
    }
}
