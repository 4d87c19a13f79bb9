//! Display interface using SPI
use display_interface::DisplayError;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::error::PanelError;

/// Bytes per SPI write when streaming a frame
const CHUNK_SIZE: usize = 256;
/// Interval between BUSY polls
const BUSY_POLL_MS: u32 = 1;

/// SPI bus plus the three control lines of the controller
pub struct DisplayInterface<SPI, BSY, DC, RST> {
    /// SPI device, chip select handled by the device
    spi: SPI,
    /// High while the controller is busy
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Reseting, active low
    rst: RST,
}

impl<SPI, BSY, DC, RST> DisplayInterface<SPI, BSY, DC, RST> {
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST) -> Self {
        DisplayInterface { spi, busy, dc, rst }
    }
}

impl<SPI, BSY, DC, RST> DisplayInterface<SPI, BSY, DC, RST>
where
    SPI: SpiDevice,
    RST: OutputPin,
    DC: OutputPin,
    BSY: InputPin,
{
    /// Basic function for sending commands
    pub(crate) fn cmd(&mut self, command: u8) -> Result<(), DisplayError> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;

        self.spi.write(&[command]).map_err(|e| {
            log::error!("SPI write error for command 0x{:02X}: {:?}", command, e);
            DisplayError::BusWriteError
        })
    }

    /// Basic function for sending an array of u8-values of data over spi
    pub(crate) fn data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        for chunk in data.chunks(CHUNK_SIZE) {
            self.spi
                .write(chunk)
                .map_err(|_| DisplayError::BusWriteError)?;
        }
        Ok(())
    }

    /// Basic function for sending a command and the data belonging to it.
    pub(crate) fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Send the same byte `repetitions` times, used to clear a whole RAM
    pub(crate) fn data_x_times(&mut self, val: u8, repetitions: usize) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        let buffer = [val; CHUNK_SIZE];
        let mut remaining = repetitions;
        while remaining > 0 {
            let n = remaining.min(CHUNK_SIZE);
            self.spi
                .write(&buffer[..n])
                .map_err(|_| DisplayError::BusWriteError)?;
            remaining -= n;
        }
        Ok(())
    }

    /// Hardware reset pulse
    pub(crate) fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(20);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(2);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(20);
        Ok(())
    }

    pub(crate) fn is_busy(&mut self) -> Result<bool, DisplayError> {
        // DisplayError has no variant for input pins
        self.busy.is_high().map_err(|_| DisplayError::DCError)
    }

    /// Wait for BUSY to go low, giving up after `timeout_ms`
    pub(crate) fn wait_until_idle(
        &mut self,
        delay: &mut impl DelayNs,
        timeout_ms: u32,
    ) -> Result<(), PanelError> {
        let mut waited = 0;
        while self.is_busy()? {
            if waited >= timeout_ms {
                log::error!("Panel still busy after {} ms", waited);
                return Err(PanelError::BusyTimeout(timeout_ms));
            }
            delay.delay_ms(BUSY_POLL_MS);
            waited += BUSY_POLL_MS;
        }
        log::debug!("Panel idle after {} ms", waited);
        Ok(())
    }
}
