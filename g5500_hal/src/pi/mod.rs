//! Real Raspberry Pi driver.
//!
//! Relay lines go through the memory-mapped BCM GPIO block
//! ([`gpio::GpioBlock`]); potentiometer and power-rail counts come from an
//! ADS1015 on the I²C bus ([`ads1015::Ads1015`]).

pub mod ads1015;
pub mod gpio;

use g5500_common::state::SimMode;
use tracing::{info, warn};

use crate::driver::{AdcChannel, HalError, RelayPin, RotatorHal};
use self::ads1015::Ads1015;
use self::gpio::GpioBlock;

/// Hardware driver for the Pi relay board + ADS1015.
#[derive(Default)]
pub struct PiHal {
    gpio: Option<GpioBlock>,
    adc: Option<Ads1015>,
}

impl PiHal {
    /// Unopened driver; call [`RotatorHal::init`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    fn gpio_mut(&mut self) -> Result<&mut GpioBlock, HalError> {
        self.gpio
            .as_mut()
            .ok_or_else(|| HalError::GpioWrite("GPIO not initialized".into()))
    }
}

impl RotatorHal for PiHal {
    fn init(&mut self) -> Result<(), HalError> {
        let mut gpio = GpioBlock::open()?;
        for pin in RelayPin::ALL {
            gpio.set_output(pin.bcm());
            gpio.write(pin.bcm(), false);
        }
        self.gpio = Some(gpio);
        self.adc = Some(Ads1015::open()?);
        info!("Pi hardware driver initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        if let Some(gpio) = self.gpio.as_mut() {
            for pin in RelayPin::ALL {
                gpio.write(pin.bcm(), false);
            }
        }
        self.gpio = None;
        self.adc = None;
        info!("Pi hardware driver shut down");
        Ok(())
    }

    fn read_adc(&mut self, channel: AdcChannel) -> Result<u16, HalError> {
        let adc = self
            .adc
            .as_mut()
            .ok_or_else(|| HalError::AdcRead("ADC not initialized".into()))?;
        adc.read(channel)
    }

    fn set_pin(&mut self, pin: RelayPin, high: bool) -> Result<(), HalError> {
        self.gpio_mut()?.write(pin.bcm(), high);
        Ok(())
    }

    fn set_sim_mode(&mut self, mode: SimMode) {
        // Counts stay real on hardware; only the surface-side effects apply.
        warn!(?mode, "simulator mode ignored by the hardware driver");
    }
}
