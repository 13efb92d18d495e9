//! Command dispatcher: maps decoded command frames onto [`Hardware`] calls.
//!
//! The dispatcher holds no hardware state of its own; it borrows the
//! shared hardware for the duration of one command.

use crate::error::Error;
use crate::hardware::{Hardware, SharedHardware};
use crate::protocol::command::{tone_frequency_hz, volume_percent};
use crate::protocol::{decode_command, CommandFrame, CommandId};

/// Label prefix of the labeled-value command that addresses a pixel.
const PIXEL_LABEL_PREFIX: &str = "pixcel-";

/// Icon origins: 66 draws the top rows, 67 starts at row 3.
const ICON_TOP_ORIGIN: (u8, u8) = (0, 0);
const ICON_BOTTOM_ORIGIN: (u8, u8) = (0, 3);

pub struct CommandDispatcher<'a, H: Hardware> {
    hardware: &'a SharedHardware<H>,
}

impl<'a, H: Hardware> CommandDispatcher<'a, H> {
    pub fn new(hardware: &'a SharedHardware<H>) -> Self {
        Self { hardware }
    }

    /// Decode and execute one raw command.  A bad frame is logged and
    /// returned as an error; it never affects later frames.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<CommandId, Error> {
        let frame = match decode_command(raw) {
            Ok(frame) => frame,
            Err(e) => {
                match e {
                    Error::UnknownCommand(id) => warn!("unknown command id {}", id),
                    _ => warn!("malformed command: {}", e),
                }
                return Err(e);
            }
        };
        let mut hw = self.hardware.lock().await;
        execute(&mut *hw, &frame);
        Ok(frame.id())
    }
}

/// Run one decoded command against the hardware.
pub fn execute<H: Hardware>(hw: &mut H, frame: &CommandFrame<'_>) {
    trace!("execute command {}", frame.id());
    match *frame {
        CommandFrame::DigitalOut { pin, value } => hw.digital_out(pin, value),
        CommandFrame::PwmOut { pin, duty } => hw.analog_out(pin, duty),
        CommandFrame::ScrollText { interval, text } => hw.show_text(text, interval),
        CommandFrame::IconTop { bitmap } => {
            hw.draw_icon(bitmap, ICON_TOP_ORIGIN.0, ICON_TOP_ORIGIN.1)
        }
        CommandFrame::IconBottom { bitmap } => {
            hw.draw_icon(bitmap, ICON_BOTTOM_ORIGIN.0, ICON_BOTTOM_ORIGIN.1)
        }
        CommandFrame::StopTone => hw.stop_tone(),
        CommandFrame::PlayTone { period, volume } => {
            hw.play_tone(tone_frequency_hz(period), volume_percent(volume))
        }
        CommandFrame::LabeledValue { label, value } => match pixel_index(label) {
            Some(index) => {
                let (r, g, b) = parse_rgb(value).unwrap_or_else(|| {
                    warn!("pixel {} value unparsable, turning off", index);
                    (0, 0, 0)
                });
                hw.set_pixel(index, r, g, b);
            }
            None => debug!("labeled value ignored for label {=str}", label),
        },
        CommandFrame::SetPixel { index, r, g, b } => hw.set_pixel(index, r, g, b),
    }
}

/// `pixcel-N` -> `N`.
pub fn pixel_index(label: &str) -> Option<u8> {
    label.strip_prefix(PIXEL_LABEL_PREFIX)?.trim().parse().ok()
}

/// `"r,g,b"` with each component a 0-255 integer.  Fields after the
/// third are ignored.
pub fn parse_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let mut parts = value.split(',').map(|p| p.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    Some((r, g, b))
}
