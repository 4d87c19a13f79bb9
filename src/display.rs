//! Owner of the panel and the status LEDs

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use log::info;

use crate::config::PixelSettings;
use crate::error::PanelError;
use crate::indicator::{IndicatorStrip, PixelWriter, FLASH, GREEN, OFF, RED};
use crate::render::{Framebuffer, StatusScreen};
use crate::ssd1680::Ssd1680;
use crate::status::{Slot, StatusSnapshot};

const FLASH_MS: u32 = 100;
const ERROR_BLINKS: u32 = 3;

/// E-ink refresh primitive
pub trait Panel {
    /// Push `frame` and run a full update. [`PanelError::TooSoon`] when the
    /// panel is still busy with the last one.
    fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError>;

    fn sleep(&mut self) -> Result<(), PanelError>;
}

impl<SPI, BSY, DC, RST, DELAY> Panel for Ssd1680<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError> {
        Ssd1680::refresh(self, frame.as_slice())
    }

    fn sleep(&mut self) -> Result<(), PanelError> {
        Ssd1680::sleep(self)
    }
}

/// Momentary LED feedback for local button actions.
///
/// Both flashes put back the colours they found, so the status colours set
/// by reconciliation survive.
pub trait Feedback {
    fn flash_slot(&mut self, slot: Slot) -> Result<()>;
    fn flash_error(&mut self) -> Result<()>;
}

pub struct DisplayManager<P, W, D> {
    panel: P,
    pixels: IndicatorStrip<W>,
    delay: D,
    frame: Framebuffer,
    screen: StatusScreen,
    settings: PixelSettings,
}

impl<P, W, D> DisplayManager<P, W, D>
where
    P: Panel,
    W: PixelWriter,
    D: DelayNs,
{
    pub fn new(panel: P, pixels: IndicatorStrip<W>, delay: D, screen: StatusScreen, settings: PixelSettings) -> Self {
        Self {
            panel,
            pixels,
            delay,
            frame: Framebuffer::new(),
            screen,
            settings,
        }
    }

    pub fn pixel_index(&self, slot: Slot) -> usize {
        match slot {
            Slot::Morning => self.settings.morning_index,
            Slot::Evening => self.settings.evening_index,
        }
    }

    /// Green for fed, red for not fed
    pub fn show_indicators(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        for slot in Slot::ALL {
            let color = if snapshot.slot(slot).is_fed() { GREEN } else { RED };
            let index = self.pixel_index(slot);
            self.pixels.set(index, color);
        }
        self.pixels.show()
    }

    /// Draw `snapshot` and push it to the panel
    pub fn render(&mut self, snapshot: &StatusSnapshot) -> Result<(), PanelError> {
        info!("Refreshing display ({})", snapshot);
        self.screen
            .draw(snapshot, &mut self.frame)
            .unwrap_or_else(|e| match e {});
        self.panel.refresh(&self.frame)
    }

    pub fn lights_off(&mut self) -> Result<()> {
        self.pixels.fill(OFF);
        self.pixels.show()
    }

    pub fn sleep_panel(&mut self) -> Result<(), PanelError> {
        self.panel.sleep()
    }

    pub fn pixels(&self) -> &IndicatorStrip<W> {
        &self.pixels
    }
}

impl<P, W, D> Feedback for DisplayManager<P, W, D>
where
    P: Panel,
    W: PixelWriter,
    D: DelayNs,
{
    fn flash_slot(&mut self, slot: Slot) -> Result<()> {
        let index = self.pixel_index(slot);
        self.pixels.flash(index, FLASH, FLASH_MS, &mut self.delay)
    }

    fn flash_error(&mut self) -> Result<()> {
        self.pixels
            .blink_all(RED, ERROR_BLINKS, FLASH_MS, &mut self.delay)
    }
}
