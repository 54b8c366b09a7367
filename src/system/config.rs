//! General system configuration

use embassy_nrf::{
    config::{Config, Debug, HfclkSource, LfclkSource},
    interrupt::Priority,
};
use embassy_time::Duration;
use sunshine_face::{config::Capabilities, FaceConfig};

/// UTC offset until the phone writes Local Time Information
pub const UTC_OFFSET_SECS: i32 = 3_600;

/// Without a touch for this long the face drops to ambient mode
pub const AMBIENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Backlight levels (0-7) per screen mode
pub const INTERACTIVE_BRIGHTNESS: u8 = 5;
pub const AMBIENT_BRIGHTNESS: u8 = 1;

/// LCD size in pixels
pub const LCD_W: u16 = 240;
pub const LCD_H: u16 = 240;

pub struct SystemConfig {}

impl SystemConfig {
    /// Create new system configuration
    pub fn new() -> Config {
        // Generate default config, required because Config is set as
        // `non_exhaustive`
        let mut config = Config::default();

        // Set high-frequency and low-frequency clock sources to external
        config.hfclk_source = HfclkSource::ExternalXtal;
        config.lfclk_source = LfclkSource::ExternalXtal;

        // Enable DC/DC regulator to massively reduce runtime current consumption
        config.dcdc.reg1 = true;

        // Configure interrupt priorities to exclude 0 (default), 1, and 4,
        // which are reserved for the nrf SoftDevice
        config.gpiote_interrupt_priority = Priority::P2;
        config.time_interrupt_priority = Priority::P2;

        // Allow debugging
        config.debug = Debug::Allowed;

        config
    }

    /// Watch face settings for the PineTime panel
    pub fn face() -> FaceConfig {
        // The IPS panel has full colour depth in ambient mode and does not
        // suffer from burn-in
        FaceConfig::default()
            .with_capabilities(Capabilities {
                low_bit_ambient: false,
                burn_in_protection: false,
            })
            .with_utc_offset(UTC_OFFSET_SECS)
            .with_surface(LCD_W as u32, LCD_H as u32)
    }
}
