//! WS2812 strip on SPIM2 through `ws2812-spi`.
//!
//! Colours reach the task through a signal so that `set_pixel` never
//! waits for the transfer.

use defmt::warn;
use embassy_nrf::spim;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::spi::SpiBus;
use pcratch_iot::config::PIXEL_COUNT;
use smart_leds::{SmartLedsWrite, RGB8};
use ws2812_spi::prerendered::Ws2812;

/// Strip contents, 0-255 per channel.
pub type Frame = [RGB8; PIXEL_COUNT];

pub static PIXELS: Signal<CriticalSectionRawMutex, Frame> = Signal::new();

/// Pre-rendered SPI bytes: 12 per LED.
const SPI_BUF_LEN: usize = PIXEL_COUNT * 12;

/// ws2812-spi needs a 2-3.8 MHz clock with MOSI idling low.
pub fn spim_config() -> spim::Config {
    let mut config = spim::Config::default();
    config.frequency = spim::Frequency::M2;
    config.mode = spim::MODE_0;
    config.orc = 0;
    config
}

pub async fn pixel_task<S: SpiBus>(spi: S) -> ! {
    let mut buf = [0u8; SPI_BUF_LEN];
    let mut strip = Ws2812::new(spi, &mut buf);
    loop {
        let frame = PIXELS.wait().await;
        if strip.write(frame.iter().cloned()).is_err() {
            warn!("pixel write failed");
        }
    }
}
