//! Pcratch IoT firmware - nRF52840 + S140 SoftDevice.
//!
//! Binds the protocol core to the board: the SoftDevice GATT server
//! carries the link, the board peripherals implement `Hardware`, and the
//! core's scheduler runs every protocol task on the main executor.
//! Peripheral-owning tasks (buttons, sensors, pixels) are spawned
//! separately and only publish into atomics, signals and the input
//! monitor.

#![no_std]
#![no_main]

mod board;
mod softdevice;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_nrf::peripherals::{SPI2, TWISPI1};
use embassy_nrf::pwm::SimplePwm;
use embassy_nrf::saadc::{self, Saadc};
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use nrf_softdevice::Softdevice;
use pcratch_iot::{GattLinkManager, InputMonitor, InputPin, Scheduler, SharedHardware};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use board::Board;
use softdevice::SoftdeviceTransport;

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    TWISPI1 => twim::InterruptHandler<peripherals::TWISPI1>;
    SAADC => saadc::InterruptHandler;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<peripherals::SPI2>;
});

static INPUTS: InputMonitor = InputMonitor::new();
static LINK: StaticCell<GattLinkManager<SoftdeviceTransport>> = StaticCell::new();
static HARDWARE: StaticCell<SharedHardware<Board>> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    softdevice::run(sd).await
}

#[embassy_executor::task(pool_size = 2)]
async fn button_task(pin: Input<'static>, id: InputPin) -> ! {
    board::button_task(pin, id, &INPUTS).await
}

#[embassy_executor::task]
async fn light_task(adc: Saadc<'static, 1>) -> ! {
    board::sensors::light_task(adc).await
}

#[embassy_executor::task]
async fn climate_task(i2c: Twim<'static, TWISPI1>) {
    board::sensors::climate_task(i2c).await
}

#[embassy_executor::task]
async fn pixel_task(spi: Spim<'static, SPI2>) -> ! {
    board::pixels::pixel_task(spi).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("pcratch-iot starting");

    // SoftDevice reserves priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice::softdevice_config());
    let link = LINK.init(GattLinkManager::new(SoftdeviceTransport::new(sd)));
    let sd = softdevice::must_register(link);
    unwrap!(spawner.spawn(softdevice_task(sd)));
    info!("device name: {=str}", link.device_name());

    // Inputs
    let button_a = Input::new(p.P0_11, Pull::Down);
    let button_b = Input::new(p.P0_12, Pull::Down);
    unwrap!(spawner.spawn(button_task(button_a, InputPin::Pin18)));
    unwrap!(spawner.spawn(button_task(button_b, InputPin::Pin17)));
    let pir = Input::new(p.P0_24, Pull::Down);

    // Sensors
    let adc_channel = saadc::ChannelConfig::single_ended(p.P0_03);
    let mut adc_config = saadc::Config::default();
    adc_config.resolution = saadc::Resolution::_12BIT;
    let adc = Saadc::new(p.SAADC, Irqs, adc_config, [adc_channel]);
    unwrap!(spawner.spawn(light_task(adc)));
    let sensor_bus = Twim::new(p.TWISPI1, Irqs, p.P1_01, p.P1_02, twim::Config::default());
    unwrap!(spawner.spawn(climate_task(sensor_bus)));

    // Outputs
    let led = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let pwm = SimplePwm::new_3ch(p.PWM0, p.P0_28, p.P0_29, p.P0_30);
    let tone = SimplePwm::new_1ch(p.PWM2, p.P0_31);
    // Only MOSI reaches the strip; SCK goes to an unused pin.
    let strip = Spim::new_txonly(p.SPI2, Irqs, p.P1_03, p.P0_04, board::pixels::spim_config());
    unwrap!(spawner.spawn(pixel_task(strip)));

    let oled_bus = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let display = board::display::init(oled_bus);

    let hardware = HARDWARE.init(SharedHardware::new(Board::new(display, pir, led, pwm, tone)));

    info!("scheduler running");
    Scheduler::new(link, hardware, &INPUTS).run().await;
}
