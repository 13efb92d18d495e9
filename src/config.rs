//! Application-wide constants and compile-time configuration.
//!
//! All protocol identifiers, timing parameters, and pin assignments
//! live here so they can be tuned in one place.

// GATT service layout
//
// Every characteristic shares the service base and differs only in the
// second 16-bit group (0100, 0101, ...).  Values are fixed for wire
// compatibility with the host extension.

/// Primary IoT service.
pub const IOT_SERVICE_UUID: &str = "0b50f3e4-607f-4151-9091-7d008d6ffc5c";

pub const COMMAND_CHAR_UUID: &str = "0b500100-607f-4151-9091-7d008d6ffc5c";
pub const STATE_CHAR_UUID: &str = "0b500101-607f-4151-9091-7d008d6ffc5c";
pub const MOTION_CHAR_UUID: &str = "0b500102-607f-4151-9091-7d008d6ffc5c";
pub const PIN_EVENT_CHAR_UUID: &str = "0b500110-607f-4151-9091-7d008d6ffc5c";
pub const ACTION_EVENT_CHAR_UUID: &str = "0b500111-607f-4151-9091-7d008d6ffc5c";
pub const ANALOG_IN0_CHAR_UUID: &str = "0b500120-607f-4151-9091-7d008d6ffc5c";
pub const ANALOG_IN1_CHAR_UUID: &str = "0b500121-607f-4151-9091-7d008d6ffc5c";
pub const ANALOG_IN2_CHAR_UUID: &str = "0b500122-607f-4151-9091-7d008d6ffc5c";
pub const MESSAGE_CHAR_UUID: &str = "0b500130-607f-4151-9091-7d008d6ffc5c";

// Advertising

/// Prefix of the advertised local name; the friendly name follows it.
pub const DEVICE_NAME_PREFIX: &str = "PcratchIoT-";

/// GAP appearance: Generic Tag (org.bluetooth.characteristic.gap.appearance).
pub const ADV_APPEARANCE_GENERIC_TAG: u16 = 0x0200;

/// Advertising interval in microseconds (250 ms).
pub const ADV_INTERVAL_US: u32 = 250_000;

/// Advertising interval in SoftDevice units of 0.625 ms.
pub const ADV_INTERVAL_UNITS: u32 = ADV_INTERVAL_US / 625;

/// Back-off after an advertise/accept failure (ms).
pub const LINK_RETRY_BACKOFF_MS: u64 = 1000;

// Hello / capability frame written to the command characteristic on connect

/// 1 = micro:bit v1, 2 = micro:bit v2 compatible.
pub const HELLO_HARDWARE: u8 = 2;
/// State-frame layout revision; bump when the bitfield layout changes.
pub const HELLO_PROTOCOL: u8 = 0;
/// 0 = BLE, 1 = serial.
pub const HELLO_ROUTE: u8 = 0;

// Task periods

/// Legacy motion heartbeat period (ms).
pub const HEARTBEAT_PERIOD_MS: u64 = 1000;

/// Sensor state broadcast period (ms).
pub const SENSOR_PERIOD_MS: u64 = 250;

/// Status line refresh period (ms).
pub const STATUS_PERIOD_MS: u64 = 1000;

/// How often the sensor task resyncs stored edges against polled levels (ms).
pub const EDGE_RECONCILE_MS: u64 = 2000;

// Input handling

/// A release sooner than this after the press is a CLICK, otherwise UP (ms).
pub const CLICK_THRESHOLD_MS: u32 = 500;

/// Buttons read high while pressed (pull-down inputs).
pub const BUTTON_ACTIVE_HIGH: bool = true;

// Queues and buffers

/// Largest command frame accepted from the host (bytes).
pub const COMMAND_MAX_LEN: usize = 128;

/// Commands received but not yet executed.
pub const DISPATCH_QUEUE_DEPTH: usize = 8;

/// Events raised by input edges but not yet notified.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Inbound command mailbox between the GATT server and the command task.
pub const COMMAND_MAILBOX_DEPTH: usize = 4;

// GPIO pin assignments (nRF52840-DK based board)
//
// The wire protocol addresses inputs by their historic GPIO numbers
// (17 = right button "B", 18 = left button "A").  The physical pins are
// selected in `main.rs`:
//
//   Button A (wire 18)  → P0.11
//   Button B (wire 17)  → P0.12
//   PIR sensor          → P0.24
//   Light sensor (AIN)  → P0.03 / AIN1
//   I²C OLED SDA/SCL    → P0.26 / P0.27
//   I²C AHT20 SDA/SCL   → P1.01 / P1.02
//   PWM out 1/19/20     → P0.28 / P0.29 / P0.30
//   Speaker             → P0.31
//   WS2812 data         → P0.04
//   User LED (wire 15)  → P0.13

/// Number of WS2812 pixels on the strip.
pub const PIXEL_COUNT: usize = 2;

/// Full-scale value of the PWM duty carried by command 34.
pub const PWM_DUTY_MAX: u16 = 1024;

/// Wire pin numbers that map to PWM outputs.
pub const PWM_PINS: [u8; 3] = [1, 19, 20];

/// Wire pin number of the user LED.
pub const USER_LED_PIN: u8 = 15;
