use std::time::Duration;

use anyhow::{bail, Context, Result};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use esp_idf_svc::hal::gpio::{Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::rmt::config::TransmitConfig;
use esp_idf_svc::hal::rmt::{PinState, Pulse, RmtChannel, TxRmtDriver, VariableLengthSignal};

use crate::indicator::PixelWriter;

/// WS2812 bit timings
const T0H: Duration = Duration::from_nanos(350);
const T0L: Duration = Duration::from_nanos(800);
const T1H: Duration = Duration::from_nanos(700);
const T1L: Duration = Duration::from_nanos(600);

/// NeoPixel chain driven by one RMT channel. The power switch is active low
/// and stays on while the driver lives.
pub struct NeoPixels<'d, P: OutputPin> {
    tx: TxRmtDriver<'d>,
    _power: PinDriver<'d, P, Output>,
    bits: [(Pulse, Pulse); 2],
}

impl<'d, P: OutputPin> NeoPixels<'d, P> {
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'd,
        data: impl Peripheral<P = impl OutputPin> + 'd,
        power: impl Peripheral<P = P> + 'd,
    ) -> Result<Self> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, data, &config).context("RMT for NeoPixels")?;

        let mut power = PinDriver::output(power)?;
        power.set_low()?;

        let ticks = tx.counter_clock()?;
        let zero = (
            Pulse::new_with_duration(ticks, PinState::High, &T0H)?,
            Pulse::new_with_duration(ticks, PinState::Low, &T0L)?,
        );
        let one = (
            Pulse::new_with_duration(ticks, PinState::High, &T1H)?,
            Pulse::new_with_duration(ticks, PinState::Low, &T1L)?,
        );

        Ok(Self {
            tx,
            _power: power,
            bits: [zero, one],
        })
    }
}

impl<P: OutputPin> PixelWriter for NeoPixels<'_, P> {
    fn write(&mut self, colors: &[Rgb888]) -> Result<()> {
        if colors.is_empty() {
            bail!("no pixels to write");
        }
        let mut signal = VariableLengthSignal::new();
        for color in colors {
            // GRB order, MSB first
            let grb = (u32::from(color.g()) << 16) | (u32::from(color.r()) << 8) | u32::from(color.b());
            for bit in (0..24).rev() {
                let (high, low) = &self.bits[((grb >> bit) & 1) as usize];
                signal.push([high, low])?;
            }
        }
        self.tx.start_blocking(&signal)?;
        Ok(())
    }
}
