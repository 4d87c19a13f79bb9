//! NeoPixel status indicators
//!
//! The strip keeps the colour of each pixel in RAM and pushes the whole frame,
//! scaled by the global brightness, to a [`PixelWriter`] on `show`.

use anyhow::Result;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_hal::delay::DelayNs;

pub const RED: Rgb888 = Rgb888::new(150, 0, 0);
pub const GREEN: Rgb888 = Rgb888::new(0, 150, 0);
pub const OFF: Rgb888 = Rgb888::BLACK;
/// Short acknowledgement flash for a button press
pub const FLASH: Rgb888 = Rgb888::new(50, 50, 50);

/// Sends raw colours to the LED hardware
pub trait PixelWriter {
    fn write(&mut self, colors: &[Rgb888]) -> Result<()>;
}

pub struct IndicatorStrip<W> {
    writer: W,
    colors: Vec<Rgb888>,
    brightness: f32,
}

impl<W: PixelWriter> IndicatorStrip<W> {
    pub fn new(writer: W, count: usize, brightness: f32) -> Self {
        Self {
            writer,
            colors: vec![OFF; count],
            brightness: brightness.clamp(0.0, 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Out of range indices are ignored
    pub fn set(&mut self, index: usize, color: Rgb888) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    pub fn get(&self, index: usize) -> Rgb888 {
        self.colors.get(index).copied().unwrap_or(OFF)
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.colors.iter_mut().for_each(|c| *c = color);
    }

    pub fn show(&mut self) -> Result<()> {
        let scaled: Vec<Rgb888> = self
            .colors
            .iter()
            .map(|c| scale(*c, self.brightness))
            .collect();
        self.writer.write(&scaled)
    }

    /// Flash one pixel and put its previous colour back
    pub fn flash<D: DelayNs>(&mut self, index: usize, color: Rgb888, on_ms: u32, delay: &mut D) -> Result<()> {
        let saved = self.get(index);
        self.set(index, color);
        self.show()?;
        delay.delay_ms(on_ms);
        self.set(index, saved);
        self.show()
    }

    /// Blink every pixel `times` times, then restore the whole strip
    pub fn blink_all<D: DelayNs>(
        &mut self,
        color: Rgb888,
        times: u32,
        period_ms: u32,
        delay: &mut D,
    ) -> Result<()> {
        let saved = self.colors.clone();
        for _ in 0..times {
            self.fill(color);
            self.show()?;
            delay.delay_ms(period_ms);
            self.fill(OFF);
            self.show()?;
            delay.delay_ms(period_ms);
        }
        self.colors = saved;
        self.show()
    }

    pub fn colors(&self) -> &[Rgb888] {
        &self.colors
    }
}

fn scale(color: Rgb888, brightness: f32) -> Rgb888 {
    let channel = |v: u8| (f32::from(v) * brightness).round() as u8;
    Rgb888::new(channel(color.r()), channel(color.g()), channel(color.b()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDelay, RecordingPixels};

    #[test]
    fn show_scales_by_brightness() {
        let writer = RecordingPixels::default();
        let mut strip = IndicatorStrip::new(writer.clone(), 4, 0.5);
        strip.set(0, RED);
        strip.set(3, GREEN);
        strip.set(9, GREEN);
        strip.show().unwrap();

        let frame = writer.last().unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame[0], Rgb888::new(75, 0, 0));
        assert_eq!(frame[3], Rgb888::new(0, 75, 0));
        assert_eq!(frame[1], OFF);
    }

    #[test]
    fn flash_restores_previous_colour() {
        let writer = RecordingPixels::default();
        let mut delay = FakeDelay::default();
        let mut strip = IndicatorStrip::new(writer.clone(), 4, 1.0);
        strip.set(3, GREEN);

        strip.flash(3, FLASH, 100, &mut delay).unwrap();

        assert_eq!(strip.get(3), GREEN);
        let frames = writer.frames();
        assert_eq!(frames[0][3], FLASH);
        assert_eq!(frames[1][3], GREEN);
        assert_eq!(delay.total().as_millis(), 100);
    }

    #[test]
    fn blink_all_restores_every_pixel() {
        let writer = RecordingPixels::default();
        let mut delay = FakeDelay::default();
        let mut strip = IndicatorStrip::new(writer.clone(), 4, 1.0);
        strip.set(0, RED);
        strip.set(3, GREEN);

        strip.blink_all(RED, 3, 100, &mut delay).unwrap();

        assert_eq!(strip.colors(), &[RED, OFF, OFF, GREEN]);
        // three on/off pairs plus the restore
        assert_eq!(writer.frames().len(), 7);
        assert_eq!(delay.total().as_millis(), 600);
    }
}
