//! Inbound command frames written by the host.
//!
//! Byte 0 is the command id; the rest is id-specific.  There is no
//! length prefix - the GATT write delimits the frame.
//!
//! | id  | command         | payload                                        |
//! |-----|-----------------|------------------------------------------------|
//! | 33  | digital out     | pin u8, value u8                               |
//! | 34  | PWM out         | pin u8, duty u16 LE (0-1024)                   |
//! | 65  | scroll text     | interval u8, UTF-8 text                        |
//! | 66  | icon top        | 15 bitmap bytes                                |
//! | 67  | icon bottom     | 10 bitmap bytes                                |
//! | 96  | stop tone       | -                                              |
//! | 97  | play tone       | period u32 LE (Hz = 1 000 000 / period), vol u8|
//! | 130 | labeled value   | 8-byte UTF-8 label, UTF-8 value                |
//! | 161 | set pixel color | index u8, r u8, g u8, b u8                     |

use crate::error::Error;

/// Bitmap bytes carried by the top icon command (5x3 cells).
pub const ICON_TOP_LEN: usize = 15;

/// Bitmap bytes carried by the bottom icon command (5x2 cells).
pub const ICON_BOTTOM_LEN: usize = 10;

/// Fixed label width of the labeled-value command.
pub const LABEL_LEN: usize = 8;

/// Known command ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandId {
    DigitalOut = 33,
    PwmOut = 34,
    ScrollText = 65,
    IconTop = 66,
    IconBottom = 67,
    StopTone = 96,
    PlayTone = 97,
    LabeledValue = 130,
    SetPixel = 161,
}

impl CommandId {
    pub const ALL: [CommandId; 9] = [
        CommandId::DigitalOut,
        CommandId::PwmOut,
        CommandId::ScrollText,
        CommandId::IconTop,
        CommandId::IconBottom,
        CommandId::StopTone,
        CommandId::PlayTone,
        CommandId::LabeledValue,
        CommandId::SetPixel,
    ];

    pub fn from_u8(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| *c as u8 == id)
    }

    /// Shortest valid frame for this id, command byte included.
    pub const fn min_len(self) -> usize {
        match self {
            CommandId::DigitalOut => 3,
            CommandId::PwmOut => 4,
            CommandId::ScrollText => 2,
            CommandId::IconTop => 1 + ICON_TOP_LEN,
            CommandId::IconBottom => 1 + ICON_BOTTOM_LEN,
            CommandId::StopTone => 1,
            CommandId::PlayTone => 6,
            CommandId::LabeledValue => 1 + LABEL_LEN,
            CommandId::SetPixel => 5,
        }
    }
}

/// A decoded command, borrowing its payload from the received buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandFrame<'a> {
    DigitalOut { pin: u8, value: u8 },
    PwmOut { pin: u8, duty: u16 },
    ScrollText { interval: u8, text: &'a str },
    IconTop { bitmap: &'a [u8] },
    IconBottom { bitmap: &'a [u8] },
    StopTone,
    PlayTone { period: u32, volume: u8 },
    LabeledValue { label: &'a str, value: &'a str },
    SetPixel { index: u8, r: u8, g: u8, b: u8 },
}

impl CommandFrame<'_> {
    pub fn id(&self) -> CommandId {
        match self {
            CommandFrame::DigitalOut { .. } => CommandId::DigitalOut,
            CommandFrame::PwmOut { .. } => CommandId::PwmOut,
            CommandFrame::ScrollText { .. } => CommandId::ScrollText,
            CommandFrame::IconTop { .. } => CommandId::IconTop,
            CommandFrame::IconBottom { .. } => CommandId::IconBottom,
            CommandFrame::StopTone => CommandId::StopTone,
            CommandFrame::PlayTone { .. } => CommandId::PlayTone,
            CommandFrame::LabeledValue { .. } => CommandId::LabeledValue,
            CommandFrame::SetPixel { .. } => CommandId::SetPixel,
        }
    }
}

/// Tone frequency for a period parameter: `1_000_000 / period` Hz.
pub fn tone_frequency_hz(period: u32) -> u32 {
    1_000_000 / period.max(1)
}

/// Map a 0-255 volume byte to 0-100 %.
pub fn volume_percent(volume: u8) -> u8 {
    (volume as u32 * 100 / 255) as u8
}

/// Decode one command frame.
///
/// Fails with `MalformedCommand` when the buffer is shorter than the id
/// requires, `UnknownCommand` for ids outside the table, and
/// `InvalidUtf8` when a text payload does not decode.
pub fn decode_command(data: &[u8]) -> Result<CommandFrame<'_>, Error> {
    let Some(&raw_id) = data.first() else {
        return Err(Error::EmptyCommand);
    };
    let id = CommandId::from_u8(raw_id).ok_or(Error::UnknownCommand(raw_id))?;
    if data.len() < id.min_len() {
        return Err(Error::MalformedCommand {
            command_id: raw_id,
            len: data.len(),
        });
    }

    let frame = match id {
        CommandId::DigitalOut => CommandFrame::DigitalOut {
            pin: data[1],
            value: data[2],
        },
        CommandId::PwmOut => CommandFrame::PwmOut {
            pin: data[1],
            duty: u16::from_le_bytes([data[2], data[3]]),
        },
        CommandId::ScrollText => CommandFrame::ScrollText {
            interval: data[1],
            text: core::str::from_utf8(&data[2..])?,
        },
        CommandId::IconTop => CommandFrame::IconTop {
            bitmap: &data[1..1 + ICON_TOP_LEN],
        },
        CommandId::IconBottom => CommandFrame::IconBottom {
            bitmap: &data[1..1 + ICON_BOTTOM_LEN],
        },
        CommandId::StopTone => CommandFrame::StopTone,
        CommandId::PlayTone => {
            let period = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
            if period == 0 {
                return Err(Error::InvalidTonePeriod);
            }
            CommandFrame::PlayTone {
                period,
                volume: data[5],
            }
        }
        CommandId::LabeledValue => {
            let label = core::str::from_utf8(&data[1..1 + LABEL_LEN])?;
            CommandFrame::LabeledValue {
                label: label.trim_end_matches('\0'),
                value: core::str::from_utf8(&data[1 + LABEL_LEN..])?,
            }
        }
        CommandId::SetPixel => CommandFrame::SetPixel {
            index: data[1],
            r: data[2],
            g: data[3],
            b: data[4],
        },
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_frame(id: CommandId) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0] = id as u8;
        // Keep the tone period non-zero and text bytes ASCII.
        buf[1] = 1;
        buf
    }

    #[test]
    fn decode_digital_out() {
        let frame = decode_command(&[33, 19, 1]).unwrap();
        assert_eq!(frame, CommandFrame::DigitalOut { pin: 19, value: 1 });
    }

    #[test]
    fn decode_pwm_out_little_endian_duty() {
        let frame = decode_command(&[34, 20, 0x00, 0x04]).unwrap();
        assert_eq!(frame, CommandFrame::PwmOut { pin: 20, duty: 1024 });
    }

    #[test]
    fn decode_scroll_text() {
        let frame = decode_command(&[65, 5, b'H', b'i']).unwrap();
        assert_eq!(
            frame,
            CommandFrame::ScrollText {
                interval: 5,
                text: "Hi"
            }
        );
    }

    #[test]
    fn decode_scroll_text_allows_empty_text() {
        let frame = decode_command(&[65, 0]).unwrap();
        assert_eq!(frame, CommandFrame::ScrollText { interval: 0, text: "" });
    }

    #[test]
    fn decode_scroll_text_rejects_invalid_utf8() {
        assert_eq!(decode_command(&[65, 1, 0xFF, 0xFE]), Err(Error::InvalidUtf8));
    }

    #[test]
    fn decode_icons_take_fixed_bitmap_width() {
        let mut top = [1u8; 20];
        top[0] = 66;
        match decode_command(&top).unwrap() {
            CommandFrame::IconTop { bitmap } => assert_eq!(bitmap.len(), ICON_TOP_LEN),
            other => panic!("unexpected {:?}", other),
        }

        let mut bottom = [0u8; 11];
        bottom[0] = 67;
        match decode_command(&bottom).unwrap() {
            CommandFrame::IconBottom { bitmap } => assert_eq!(bitmap.len(), ICON_BOTTOM_LEN),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_play_tone() {
        let period = 2272u32.to_le_bytes();
        let raw = [97, period[0], period[1], period[2], period[3], 255];
        let frame = decode_command(&raw).unwrap();
        assert_eq!(
            frame,
            CommandFrame::PlayTone {
                period: 2272,
                volume: 255
            }
        );
        assert_eq!(tone_frequency_hz(2272), 440);
    }

    #[test]
    fn decode_play_tone_rejects_zero_period() {
        assert_eq!(
            decode_command(&[97, 0, 0, 0, 0, 128]),
            Err(Error::InvalidTonePeriod)
        );
    }

    #[test]
    fn decode_labeled_value() {
        let mut buf = [0u8; 16];
        buf[0] = 130;
        buf[1..9].copy_from_slice(b"pixcel-1");
        buf[9..16].copy_from_slice(b"10,20,3");
        let frame = decode_command(&buf).unwrap();
        assert_eq!(
            frame,
            CommandFrame::LabeledValue {
                label: "pixcel-1",
                value: "10,20,3"
            }
        );
    }

    #[test]
    fn decode_labeled_value_trims_nul_padding() {
        let mut buf = [0u8; 10];
        buf[0] = 130;
        buf[1..4].copy_from_slice(b"abc");
        buf[9] = b'x';
        match decode_command(&buf).unwrap() {
            CommandFrame::LabeledValue { label, value } => {
                assert_eq!(label, "abc");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_set_pixel() {
        let frame = decode_command(&[161, 1, 100, 50, 0]).unwrap();
        assert_eq!(
            frame,
            CommandFrame::SetPixel {
                index: 1,
                r: 100,
                g: 50,
                b: 0
            }
        );
    }

    #[test]
    fn decode_stop_tone() {
        assert_eq!(decode_command(&[96]).unwrap(), CommandFrame::StopTone);
    }

    #[test]
    fn every_id_decodes_at_min_len() {
        for id in CommandId::ALL {
            let buf = valid_frame(id);
            let frame = decode_command(&buf[..id.min_len()]).unwrap();
            assert_eq!(frame.id(), id);
        }
    }

    #[test]
    fn every_id_rejects_short_buffers() {
        for id in CommandId::ALL {
            let buf = valid_frame(id);
            for len in 1..id.min_len() {
                assert_eq!(
                    decode_command(&buf[..len]),
                    Err(Error::MalformedCommand {
                        command_id: id as u8,
                        len
                    })
                );
            }
        }
    }

    #[test]
    fn empty_and_unknown_commands() {
        assert_eq!(decode_command(&[]), Err(Error::EmptyCommand));
        assert_eq!(decode_command(&[200, 1, 2]), Err(Error::UnknownCommand(200)));
        assert_eq!(decode_command(&[0x07]), Err(Error::UnknownCommand(0x07)));
    }

    #[test]
    fn volume_scales_to_percent() {
        assert_eq!(volume_percent(0), 0);
        assert_eq!(volume_percent(128), 50);
        assert_eq!(volume_percent(255), 100);
    }
}
