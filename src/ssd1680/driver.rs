//! SSD1680 Display Driver Implementation
//!
//! Full black and white refreshes only. The controller sleeps between
//! feeding windows and is brought back with a hardware reset and a fresh init
//! on the next refresh.
//!
//! ### BUSY Pin
//!
//! BUSY is high while the controller runs a command. A refresh issued while it
//! is still high is refused with [`PanelError::TooSoon`] instead of queueing
//! behind the previous update.

pub use display_interface::DisplayError;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::error::PanelError;
use crate::ssd1680::interface::DisplayInterface;
use crate::ssd1680::{cmd::Cmd, flag::Flag, BUFFER_SIZE, HEIGHT, WIDTH};

/// Reset and init commands finish well within this
const INIT_TIMEOUT_MS: u32 = 1_000;
/// A full update takes 1-3 seconds on this panel
const UPDATE_TIMEOUT_MS: u32 = 5_000;

/// SSD1680 E-Paper Display Driver
pub struct Ssd1680<SPI, BSY, DC, RST, DELAY> {
    interface: DisplayInterface<SPI, BSY, DC, RST>,
    delay: DELAY,
    asleep: bool,
}

impl<SPI, BSY, DC, RST, DELAY> Ssd1680<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create and initialize the display driver
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Result<Self, PanelError> {
        let interface = DisplayInterface::new(spi, busy, dc, rst);
        let mut ssd1680 = Ssd1680 {
            interface,
            delay,
            asleep: true,
        };
        ssd1680.init()?;
        Ok(ssd1680)
    }

    fn init(&mut self) -> Result<(), PanelError> {
        log::info!("Initializing SSD1680");
        self.interface.reset(&mut self.delay)?;

        self.interface.cmd(Cmd::SW_RESET)?;
        self.delay.delay_ms(10);
        self.interface
            .wait_until_idle(&mut self.delay, INIT_TIMEOUT_MS)?;

        let last_line = HEIGHT - 1;
        self.interface.cmd_with_data(
            Cmd::DRIVER_CONTROL,
            &[
                (last_line & 0xFF) as u8,
                (last_line >> 8) as u8,
                Flag::DRIVER_OUTPUT_GATE_SCAN_FROM_G0,
            ],
        )?;
        self.interface
            .cmd_with_data(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_INCRY_INCRX])?;
        self.interface
            .cmd_with_data(Cmd::BORDER_WAVEFORM_CONTROL, &[Flag::BORDER_WAVEFORM_FOLLOW_LUT1])?;
        self.interface
            .cmd_with_data(Cmd::GATE_VOLTAGE_CONTROL, &[Flag::GATE_VOLTAGE_VGH])?;
        self.interface
            .cmd_with_data(Cmd::SOURCE_VOLTAGE_CONTROL, &Flag::SOURCE_VOLTAGE)?;
        self.interface
            .cmd_with_data(Cmd::WRITE_VCOM_REGISTER, &[Flag::VCOM])?;
        self.interface
            .cmd_with_data(Cmd::TEMP_CONTROL, &[Flag::INTERNAL_TEMP_SENSOR])?;
        self.interface
            .cmd_with_data(Cmd::DISPLAY_UPDATE_CONTROL, &Flag::DISPLAY_UPDATE_NORMAL)?;

        self.setup_ram_window()?;
        self.interface.cmd(Cmd::WRITE_BW_DATA)?;
        self.interface
            .data_x_times(Flag::RAM_ALL_WHITE, BUFFER_SIZE)?;

        self.interface
            .wait_until_idle(&mut self.delay, INIT_TIMEOUT_MS)?;
        self.asleep = false;
        Ok(())
    }

    /// Window covering the whole RAM, pointer at the top left corner
    fn setup_ram_window(&mut self) -> Result<(), DisplayError> {
        let x_end = ((WIDTH / 8) - 1) as u8;
        let y_end = HEIGHT - 1;

        self.interface
            .cmd_with_data(Cmd::SET_RAMX_START_END, &[0x00, x_end])?;
        self.interface.cmd_with_data(
            Cmd::SET_RAMY_START_END,
            &[0x00, 0x00, (y_end & 0xFF) as u8, (y_end >> 8) as u8],
        )?;
        self.interface.cmd_with_data(Cmd::SET_RAMX_COUNTER, &[0x00])?;
        self.interface
            .cmd_with_data(Cmd::SET_RAMY_COUNTER, &[0x00, 0x00])
    }

    /// Write a full frame and run a full update.
    ///
    /// `buffer` is in RAM order, one bit per pixel, 1 for white.
    pub fn refresh(&mut self, buffer: &[u8]) -> Result<(), PanelError> {
        if buffer.len() != BUFFER_SIZE {
            return Err(PanelError::Bus(DisplayError::OutOfBoundsError));
        }

        if self.asleep {
            self.init()?;
        } else if self.interface.is_busy()? {
            return Err(PanelError::TooSoon);
        }

        self.setup_ram_window()?;
        self.interface.cmd_with_data(Cmd::WRITE_BW_DATA, buffer)?;

        self.interface
            .cmd_with_data(Cmd::UPDATE_DISPLAY_CTRL2, &[Flag::DISPLAY_UPDATE_FULL])?;
        self.interface.cmd(Cmd::MASTER_ACTIVATE)?;
        self.interface
            .wait_until_idle(&mut self.delay, UPDATE_TIMEOUT_MS)
    }

    /// Enter deep sleep mode 1, RAM is kept but the next refresh re-inits
    pub fn sleep(&mut self) -> Result<(), PanelError> {
        if self.asleep {
            return Ok(());
        }
        log::info!("Putting panel to sleep");
        self.interface
            .cmd_with_data(Cmd::DEEP_SLEEP_MODE, &[Flag::DEEP_SLEEP_MODE_1])?;
        self.asleep = true;
        Ok(())
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }
}
