//! Executor configuration
//!
//! Every tunable lives here, either as a named constant or as a field of one of
//! the config structs below. Components take the struct they need at
//! construction time.

use embassy_time::Duration;

use crate::color::Rgb;

// =========================================================================
// Firmware metadata
// =========================================================================

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2";

// =========================================================================
// Serial
// =========================================================================

/// Longest accepted command line, terminator excluded
pub const SERIAL_LINE_MAX_LENGTH: usize = 64;
/// Bytes buffered between the transport and the line framer
pub const SERIAL_RX_RING_SIZE: usize = SERIAL_LINE_MAX_LENGTH * 2;
/// Partial line is completed after this much receive silence
pub const SERIAL_LINE_TIMEOUT_MS: u64 = 50;

// =========================================================================
// Queues & buffers
// =========================================================================

pub const QUEUE_SIZE_COMMANDS: usize = 32;
pub const QUEUE_SIZE_EVENTS: usize = 64;
pub const EVENTS_PER_FLUSH: usize = 5;
/// Max chars per rendered event line, newline included
pub const EVENT_MESSAGE_BUFFER_SIZE: usize = 96;

pub const MUTEX_TIMEOUT_QUEUE_MS: u64 = 10;
pub const MUTEX_TIMEOUT_SERIAL_MS: u64 = 20;
pub const MUTEX_TIMEOUT_FLUSH_MS: u64 = 5;
pub const MUTEX_TIMEOUT_TOUCH_MS: u64 = 5;

// =========================================================================
// Touch sensing
// =========================================================================

pub const TOUCH_SENSOR_COUNT: usize = 25;
pub const TOUCH_POLL_INTERVAL_MS: u64 = 5;
pub const TOUCH_DEBOUNCE_PRESS_MS: u64 = 100;
pub const TOUCH_DEBOUNCE_RELEASE_MS: u64 = 100;
/// Consecutive sampling failures before a channel reports as faulted
pub const I2C_RETRY_COUNT: u8 = 3;

/// Bus address of the sensor behind each position, A through Y
pub const SENSOR_I2C_ADDRESSES: [u8; TOUCH_SENSOR_COUNT] = [
    0x1F, 0x1E, 0x1D, 0x1C, 0x3F, // A-E
    0x1A, 0x28, 0x29, 0x2A, 0x0E, // F-J
    0x0F, 0x18, 0x19, 0x3C, 0x2F, // K-O
    0x38, 0x0D, 0x0C, 0x0B, 0x3E, // P-T
    0x2C, 0x3D, 0x08, 0x09, 0x0A, // U-Y
];

// =========================================================================
// CAP1188 register map
// =========================================================================

pub const CAP1188_REG_MAIN_CONTROL: u8 = 0x00;
pub const CAP1188_REG_SENSOR_INPUT_STATUS: u8 = 0x03;
pub const CAP1188_REG_SENSOR_INPUT_DELTA_1: u8 = 0x10;
pub const CAP1188_REG_SENSITIVITY_CONTROL: u8 = 0x1F;
pub const CAP1188_REG_SENSOR_INPUT_ENABLE: u8 = 0x21;
pub const CAP1188_REG_CALIBRATION_ACTIVE: u8 = 0x26;
pub const CAP1188_REG_MULTIPLE_TOUCH_CONFIG: u8 = 0x2A;
pub const CAP1188_REG_STANDBY_CONFIG: u8 = 0x41;
pub const CAP1188_REG_PRODUCT_ID: u8 = 0xFD;

pub const CAP1188_PRODUCT_ID: u8 = 0x50;
pub const CAP1188_CS1_BIT_MASK: u8 = 0x01;
pub const CAP1188_MAIN_CONTROL_INT: u8 = 0x01;
pub const CAP1188_STANDBY_FAST_CYCLE: u8 = 0x30;
/// DELTA_SENSE lives in bits 6:4 of the sensitivity register
pub const CAP1188_SENSITIVITY_SHIFT: u8 = 4;
pub const CAP1188_SENSITIVITY_MASK: u8 = 0x70;

// =========================================================================
// LED control
// =========================================================================

pub const LED_POSITION_COUNT: usize = 25;
pub const LED_STRIP_LENGTH: usize = 190;
pub const LED_BRIGHTNESS_DEFAULT: u8 = 128;

pub const LED_ANIMATION_STEP_MS: u64 = 25;
pub const LED_BLINK_INTERVAL_MS: u64 = 150;
pub const LED_SEQUENCE_STEP_MS: u64 = 10;
pub const LED_MENU_CHANGE_STEP_MS: u64 = 1;

pub const LED_SUCCESS_EXPANSION_RADIUS: u8 = 5;
pub const LED_SEQUENCE_PULSE_COUNT: u8 = 2;
pub const LED_SEQUENCE_PULSE_STEPS: u16 = 20;
pub const LED_SEQUENCE_MAX_BRIGHTNESS: u8 = 40;

// =========================================================================
// Colors
// =========================================================================

pub const COLOR_SHOW: Rgb = Rgb { r: 0, g: 0, b: 255 };
pub const COLOR_SUCCESS: Rgb = Rgb { r: 0, g: 255, b: 0 };
pub const COLOR_BLINK: Rgb = Rgb { r: 0, g: 255, b: 0 };
pub const COLOR_FAIL: Rgb = Rgb { r: 255, g: 0, b: 0 };
pub const COLOR_OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Timing and shape of the LED animations
#[derive(Debug, Clone, Copy)]
pub struct LedTimings {
    /// Interval between radius steps of expand/contract animations
    pub step: Duration,
    /// Interval between blink toggles
    pub blink: Duration,
    /// Interval between pulse brightness steps
    pub pulse_step: Duration,
    /// Interval between palette sweep pixels
    pub sweep_step: Duration,
    /// Radius reached by the success animation
    pub max_radius: u8,
    /// Number of full up/down pulses
    pub pulse_count: u8,
    /// Steps per ramp (up or down) of a pulse
    pub pulse_steps: u16,
    /// Peak green level of a pulse
    pub pulse_peak: u8,
}

impl Default for LedTimings {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(LED_ANIMATION_STEP_MS),
            blink: Duration::from_millis(LED_BLINK_INTERVAL_MS),
            pulse_step: Duration::from_millis(LED_SEQUENCE_STEP_MS),
            sweep_step: Duration::from_millis(LED_MENU_CHANGE_STEP_MS),
            max_radius: LED_SUCCESS_EXPANSION_RADIUS,
            pulse_count: LED_SEQUENCE_PULSE_COUNT,
            pulse_steps: LED_SEQUENCE_PULSE_STEPS,
            pulse_peak: LED_SEQUENCE_MAX_BRIGHTNESS,
        }
    }
}

/// Sampling period and debounce dwell times
#[derive(Debug, Clone, Copy)]
pub struct TouchTimings {
    pub poll_interval: Duration,
    pub press_dwell: Duration,
    pub release_dwell: Duration,
    /// Consecutive sampling failures before a channel reports as faulted
    pub fault_threshold: u8,
}

impl Default for TouchTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(TOUCH_POLL_INTERVAL_MS),
            press_dwell: Duration::from_millis(TOUCH_DEBOUNCE_PRESS_MS),
            release_dwell: Duration::from_millis(TOUCH_DEBOUNCE_RELEASE_MS),
            fault_threshold: I2C_RETRY_COUNT,
        }
    }
}

/// How long each cross-schedule lock may be waited for
#[derive(Debug, Clone, Copy)]
pub struct LockTimeouts {
    /// Enqueueing an event
    pub queue: Duration,
    /// Dequeueing during a flush
    pub flush: Duration,
    /// Writing a rendered line to the serial sink
    pub serial: Duration,
    /// Touch channel table access
    pub touch: Duration,
}

impl Default for LockTimeouts {
    fn default() -> Self {
        Self {
            queue: Duration::from_millis(MUTEX_TIMEOUT_QUEUE_MS),
            flush: Duration::from_millis(MUTEX_TIMEOUT_FLUSH_MS),
            serial: Duration::from_millis(MUTEX_TIMEOUT_SERIAL_MS),
            touch: Duration::from_millis(MUTEX_TIMEOUT_TOUCH_MS),
        }
    }
}

/// Line framing and flush pacing
#[derive(Debug, Clone, Copy)]
pub struct SerialConfig {
    pub line_timeout: Duration,
    pub events_per_flush: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_millis(SERIAL_LINE_TIMEOUT_MS),
            events_per_flush: EVENTS_PER_FLUSH,
        }
    }
}

/// Configuration for the whole executor
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorConfig {
    pub led: LedTimings,
    pub touch: TouchTimings,
    pub locks: LockTimeouts,
    pub serial: SerialConfig,
}
