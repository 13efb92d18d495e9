//! nRF52840 board binding: implements [`Hardware`] on top of the
//! embassy-nrf drivers.
//!
//! Slow or async peripherals are owned by their own tasks and publish
//! into atomics or signals; the board only reads and writes those, so
//! every `Hardware` call returns without waiting.
//!
//! | function        | driver                         |
//! |-----------------|--------------------------------|
//! | buttons A/B     | GPIOTE edge wait ([`button_task`]) |
//! | PIR             | `Input` level                  |
//! | user LED        | `Output`                       |
//! | PWM 1/19/20     | `SimplePwm` PWM0, 3 channels   |
//! | tone            | `SimplePwm` PWM2, 1 channel    |
//! | pixels          | WS2812 over SPIM2 ([`pixels`]) |
//! | OLED            | SSD1306 over TWISPI0 ([`display`]) |
//! | light, AHT20    | SAADC / TWISPI1 ([`sensors`])  |

pub mod display;
pub mod pixels;
pub mod sensors;

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Input, Level, Output};
use embassy_nrf::peripherals::{PWM0, PWM2, TWISPI0};
use embassy_nrf::pwm::SimplePwm;
use embassy_nrf::twim::Twim;
use embassy_time::Timer;
use pcratch_iot::config::{PIXEL_COUNT, PWM_DUTY_MAX};
use pcratch_iot::hardware::{digital_duty, percent_to_channel, OutputPin};
use pcratch_iot::input::now_ms;
use pcratch_iot::{Hardware, InputMonitor, InputPin};
use smart_leds::RGB8;

use display::Display;

/// Last level seen by each button task.
static LEVELS: [AtomicBool; InputPin::COUNT] = [AtomicBool::new(false), AtomicBool::new(false)];

/// Refresh of [`LEVELS`] without an edge, so resync sees the real level.
const LEVEL_REFRESH_MS: u64 = 500;

pub type OledBus = Twim<'static, TWISPI0>;

pub struct Board {
    display: Option<Display<OledBus>>,
    pir: Input<'static>,
    led: Output<'static>,
    pwm: SimplePwm<'static, PWM0>,
    tone: SimplePwm<'static, PWM2>,
    pixels: pixels::Frame,
}

impl Board {
    pub fn new(
        display: Option<Display<OledBus>>,
        pir: Input<'static>,
        led: Output<'static>,
        mut pwm: SimplePwm<'static, PWM0>,
        mut tone: SimplePwm<'static, PWM2>,
    ) -> Self {
        if display.is_none() {
            info!("no OLED - display calls are no-ops");
        }
        pwm.set_max_duty(PWM_DUTY_MAX);
        tone.disable();
        Self {
            display,
            pir,
            led,
            pwm,
            tone,
            pixels: [RGB8::default(); PIXEL_COUNT],
        }
    }

    fn set_led(&mut self, on: bool) {
        self.led.set_level(if on { Level::High } else { Level::Low });
    }
}

impl Hardware for Board {
    fn read_pin(&mut self, pin: InputPin) -> bool {
        LEVELS[pin.slot()].load(Ordering::Relaxed)
    }

    fn read_light_level(&mut self) -> f32 {
        sensors::light_pct()
    }

    fn read_temp_humidity(&mut self) -> (f32, f32) {
        sensors::temp_humidity()
    }

    fn read_pir(&mut self) -> bool {
        self.pir.is_high()
    }

    fn show_text(&mut self, text: &str, _interval: u8) {
        if let Some(display) = self.display.as_mut() {
            display::draw_text_line(display, text);
        }
    }

    fn digital_out(&mut self, pin: u8, value: u8) {
        match OutputPin::from_wire(pin) {
            Some(OutputPin::UserLed) => self.set_led(value != 0),
            Some(OutputPin::Pwm(channel)) => self.pwm.set_duty(channel, digital_duty(value)),
            None => debug!("digital out on unmapped pin {}", pin),
        }
    }

    fn analog_out(&mut self, pin: u8, duty: u16) {
        match OutputPin::from_wire(pin) {
            Some(OutputPin::UserLed) => self.set_led(duty != 0),
            Some(OutputPin::Pwm(channel)) => self.pwm.set_duty(channel, duty.min(PWM_DUTY_MAX)),
            None => debug!("analog out on unmapped pin {}", pin),
        }
    }

    fn play_tone(&mut self, frequency_hz: u32, volume_pct: u8) {
        if frequency_hz == 0 {
            self.stop_tone();
            return;
        }
        self.tone.enable();
        self.tone.set_period(frequency_hz);
        // Full volume is a 50 % square wave.
        let duty = self.tone.max_duty() as u32 * volume_pct.min(100) as u32 / 200;
        self.tone.set_duty(0, duty as u16);
    }

    fn stop_tone(&mut self) {
        self.tone.set_duty(0, 0);
        self.tone.disable();
    }

    fn set_pixel(&mut self, index: u8, r: u8, g: u8, b: u8) {
        let Some(slot) = self.pixels.get_mut(index as usize) else {
            debug!("pixel {} out of range", index);
            return;
        };
        *slot = RGB8::new(percent_to_channel(r), percent_to_channel(g), percent_to_channel(b));
        pixels::PIXELS.signal(self.pixels);
    }

    fn draw_icon(&mut self, bitmap: &[u8], x: u8, y: u8) {
        if let Some(display) = self.display.as_mut() {
            display::draw_icon(display, bitmap, x, y);
        }
    }
}

/// Watch one button pin and feed its edges to the monitor.
pub async fn button_task(mut pin: Input<'static>, id: InputPin, inputs: &'static InputMonitor) -> ! {
    LEVELS[id.slot()].store(pin.is_high(), Ordering::Relaxed);
    loop {
        let edge = select(pin.wait_for_any_edge(), Timer::after_millis(LEVEL_REFRESH_MS)).await;
        let level = pin.is_high();
        LEVELS[id.slot()].store(level, Ordering::Relaxed);
        if let Either::First(()) = edge {
            inputs.on_pin_change(id, level, now_ms());
        }
    }
}
