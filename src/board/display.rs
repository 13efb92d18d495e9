//! SSD1306 OLED: status/text line on top, icon cells below.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

/// Type alias for the concrete display driver.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Height of the text line, in pixels.
const TEXT_LINE_HEIGHT: u32 = 10;

/// Width of one icon row and height reserved per icon draw.
const ICON_COLUMNS: usize = 5;
const ICON_CLEAR_WIDTH: u32 = 8;
const ICON_CLEAR_HEIGHT: u32 = 5;

/// Initialise the panel and clear it.  `None` when nothing answers on the
/// bus; the board then runs without a display.
pub fn init<I2C>(i2c: I2C) -> Option<Display<I2C>>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    if display.init().is_err() {
        return None;
    }
    display.clear_buffer();
    let _ = display.flush();
    Some(display)
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

fn clear_rect<I2C>(display: &mut Display<I2C>, x: i32, y: i32, w: u32, h: u32)
where
    I2C: embedded_hal::i2c::I2c,
{
    let _ = Rectangle::new(Point::new(x, y), Size::new(w, h))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(display);
}

/// Replace the top text line.
pub fn draw_text_line<I2C>(display: &mut Display<I2C>, text: &str)
where
    I2C: embedded_hal::i2c::I2c,
{
    let width = display.size().width;
    clear_rect(display, 0, 0, width, TEXT_LINE_HEIGHT);
    let _ = Text::with_baseline(text, Point::zero(), text_style(), Baseline::Top).draw(display);
    let _ = display.flush();
}

/// Draw a 5-column cell bitmap: one byte per cell, row-major, non-zero
/// means lit.
pub fn draw_icon<I2C>(display: &mut Display<I2C>, bitmap: &[u8], x: u8, y: u8)
where
    I2C: embedded_hal::i2c::I2c,
{
    let (x, y) = (x as i32, y as i32);
    clear_rect(display, x, y, ICON_CLEAR_WIDTH, ICON_CLEAR_HEIGHT);
    for (i, &cell) in bitmap.iter().enumerate() {
        if cell == 0 {
            continue;
        }
        let px = x + (i % ICON_COLUMNS) as i32;
        let py = y + (i / ICON_COLUMNS) as i32;
        let _ = Pixel(Point::new(px, py), BinaryColor::On).draw(display);
    }
    let _ = display.flush();
}
