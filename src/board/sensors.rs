//! Background sampling of the slow sensors.
//!
//! SAADC sampling and AHT20 conversions take time, but [`Hardware`](pcratch_iot::Hardware)
//! reads must return immediately.  These tasks sample on their own period
//! and publish into atomics that the board reads.

use core::sync::atomic::{AtomicU32, Ordering};

use aht20_driver::{AHT20, SENSOR_ADDRESS};
use defmt::{info, warn};
use embassy_nrf::saadc::Saadc;
use embassy_time::{Delay, Timer};
use embedded_hal::i2c::I2c;

/// Light level in percent, stored as `f32` bits.
pub static LIGHT_PCT: AtomicU32 = AtomicU32::new(0);
/// Temperature (°C) and humidity (%), stored as `f32` bits.
pub static TEMPERATURE_C: AtomicU32 = AtomicU32::new(0);
pub static HUMIDITY_PCT: AtomicU32 = AtomicU32::new(0);

const LIGHT_PERIOD_MS: u64 = 100;
const CLIMATE_PERIOD_MS: u64 = 2000;

/// 12-bit single-ended full scale.
const SAADC_FULL_SCALE: f32 = 4095.0;

const AHT20_POWER_UP_MS: u64 = 40;

pub fn light_pct() -> f32 {
    f32::from_bits(LIGHT_PCT.load(Ordering::Relaxed))
}

pub fn temp_humidity() -> (f32, f32) {
    (
        f32::from_bits(TEMPERATURE_C.load(Ordering::Relaxed)),
        f32::from_bits(HUMIDITY_PCT.load(Ordering::Relaxed)),
    )
}

/// Sample the light sensor forever.
pub async fn light_task(mut adc: Saadc<'static, 1>) -> ! {
    adc.calibrate().await;
    let mut buf = [0i16; 1];
    loop {
        adc.sample(&mut buf).await;
        let raw = buf[0].max(0) as f32;
        let pct = (raw / SAADC_FULL_SCALE * 100.0).min(100.0);
        LIGHT_PCT.store(pct.to_bits(), Ordering::Relaxed);
        Timer::after_millis(LIGHT_PERIOD_MS).await;
    }
}

/// Poll the AHT20.  Returns when the sensor does not answer; the readings
/// then stay at zero.
///
/// The driver is blocking: each measurement holds the executor for the
/// conversion time (about 80 ms).
pub async fn climate_task<I: I2c>(i2c: I) {
    Timer::after_millis(AHT20_POWER_UP_MS).await;

    let mut delay = Delay;
    let mut aht20 = match AHT20::new(i2c, SENSOR_ADDRESS).init(&mut delay) {
        Ok(sensor) => sensor,
        Err(_) => {
            warn!("AHT20 not found - climate readings disabled");
            return;
        }
    };
    info!("AHT20 ready");

    loop {
        match aht20.measure(&mut delay) {
            Ok(reading) => {
                TEMPERATURE_C.store(reading.temperature.to_bits(), Ordering::Relaxed);
                HUMIDITY_PCT.store(reading.humidity.to_bits(), Ordering::Relaxed);
            }
            Err(_) => warn!("AHT20 measurement failed"),
        }
        Timer::after_millis(CLIMATE_PERIOD_MS).await;
    }
}
