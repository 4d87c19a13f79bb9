//! Status screen rendering
//!
//! The screen is split into a morning panel on the left and an evening panel
//! on the right. Each panel shows a title, an empty or full bowl and a label
//! such as "Fed at 9:26 AM".

use std::convert::Infallible;

use embedded_graphics::{
    image::{Image, ImageRaw},
    mono_font::{
        ascii::{FONT_6X10, FONT_9X15_BOLD},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Ellipse, Line, Polyline, PrimitiveStyle},
    text::{Baseline, Text},
};

use crate::ssd1680::{BUFFER_SIZE, HEIGHT, WIDTH};
use crate::status::{Slot, StatusSnapshot};

/// Landscape screen size
pub const SCREEN_WIDTH: u32 = HEIGHT as u32;
pub const SCREEN_HEIGHT: u32 = WIDTH as u32;

pub const MORNING_X_OFFSET: i32 = 0;
pub const EVENING_X_OFFSET: i32 = 147;

pub const BOWL_WIDTH: u32 = 140;
pub const BOWL_HEIGHT: u32 = 82;
const BOWL_ORIGIN: Point = Point::new(5, 20);
const LABEL_ORIGIN: Point = Point::new(13, 105);
const TITLE_ORIGIN: Point = Point::new(13, 10);

static BOWL_EMPTY: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bowl_empty.bin"));
static BOWL_FULL: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bowl_full.bin"));

/// 1-bit frame in SSD1680 RAM order.
///
/// Drawn on in landscape, 296x128, and stored rotated into the 128 pixel wide
/// RAM layout. A set bit is white, `BinaryColor::On` draws black.
pub struct Framebuffer {
    buffer: Box<[u8]>,
}

impl Framebuffer {
    /// Create a new framebuffer initialized to white
    pub fn new() -> Self {
        Self {
            buffer: vec![0xFF; BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Raw bytes for [`crate::ssd1680::Ssd1680::refresh`]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    fn locate(x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        // rotate 90 degrees into RAM space
        let ram_x = (WIDTH as u32 - 1 - y) as usize;
        let ram_y = x as usize;
        let index = ram_y * (WIDTH as usize / 8) + ram_x / 8;
        Some((index, 0x80 >> (ram_x % 8)))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        if let Some((index, mask)) = Self::locate(x, y) {
            match color {
                BinaryColor::On => self.buffer[index] &= !mask,
                BinaryColor::Off => self.buffer[index] |= mask,
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        Self::locate(x, y).map(|(index, mask)| {
            if self.buffer[index] & mask == 0 {
                BinaryColor::On
            } else {
                BinaryColor::Off
            }
        })
    }

    /// Number of black pixels inside a landscape rectangle
    pub fn count_black(&self, origin: Point, size: Size) -> usize {
        let x0 = origin.x.max(0) as u32;
        let y0 = origin.y.max(0) as u32;
        (y0..y0 + size.height)
            .flat_map(|y| (x0..x0 + size.width).map(move |x| (x, y)))
            .filter(|(x, y)| self.pixel(*x, *y) == Some(BinaryColor::On))
            .count()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }
}

/// Bowl artwork, either converted sprites or drawn primitives
#[derive(Clone, Copy)]
pub struct BowlArt {
    empty: Option<&'static [u8]>,
    full: Option<&'static [u8]>,
}

impl BowlArt {
    const SPRITE_LEN: usize = (BOWL_WIDTH as usize).div_ceil(8) * BOWL_HEIGHT as usize;

    /// Sprites converted by the build script, primitives where missing
    pub fn bundled() -> Self {
        Self::from_sprites(BOWL_EMPTY, BOWL_FULL)
    }

    pub fn primitives() -> Self {
        Self {
            empty: None,
            full: None,
        }
    }

    pub fn from_sprites(empty: &'static [u8], full: &'static [u8]) -> Self {
        let valid = |data: &'static [u8]| (data.len() == Self::SPRITE_LEN).then_some(data);
        Self {
            empty: valid(empty),
            full: valid(full),
        }
    }

    fn draw<D>(&self, fed: bool, origin: Point, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let sprite = if fed { self.full } else { self.empty };
        match sprite {
            Some(data) => {
                let raw = ImageRaw::<BinaryColor>::new(data, BOWL_WIDTH);
                Image::new(&raw, origin).draw(target)
            }
            None => draw_bowl(fed, origin, target),
        }
    }
}

fn draw_bowl<D>(fed: bool, origin: Point, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    let fill = PrimitiveStyle::with_fill(BinaryColor::On);

    if fed {
        Ellipse::new(origin + Point::new(16, 18), Size::new(108, 22))
            .into_styled(fill)
            .draw(target)?;
        for (dx, dy) in [(34, 10), (52, 6), (70, 4), (88, 7), (104, 12)] {
            Circle::new(origin + Point::new(dx, dy), 12)
                .into_styled(fill)
                .draw(target)?;
        }
    }

    Ellipse::new(origin + Point::new(10, 20), Size::new(120, 24))
        .into_styled(stroke)
        .draw(target)?;
    Polyline::new(&[
        origin + Point::new(10, 32),
        origin + Point::new(30, 78),
        origin + Point::new(110, 78),
        origin + Point::new(130, 32),
    ])
    .into_styled(stroke)
    .draw(target)
}

/// Lays out both slot panels
pub struct StatusScreen {
    art: BowlArt,
}

impl StatusScreen {
    pub fn new(art: BowlArt) -> Self {
        Self { art }
    }

    pub fn draw<D>(&self, snapshot: &StatusSnapshot, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;

        for slot in Slot::ALL {
            self.draw_panel(slot, snapshot, target)?;
        }

        let divider_x = EVENING_X_OFFSET - 2;
        Line::new(Point::new(divider_x, 6), Point::new(divider_x, 122))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;
        Ok(())
    }

    fn draw_panel<D>(&self, slot: Slot, snapshot: &StatusSnapshot, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let offset = Point::new(panel_offset(slot), 0);
        let state = snapshot.slot(slot);

        let title = MonoTextStyle::new(&FONT_9X15_BOLD, BinaryColor::On);
        Text::with_baseline(slot.title(), TITLE_ORIGIN + offset, title, Baseline::Middle)
            .draw(target)?;

        self.art.draw(state.is_fed(), BOWL_ORIGIN + offset, target)?;

        let label = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        Text::with_baseline(&state.label(), LABEL_ORIGIN + offset, label, Baseline::Middle)
            .draw(target)?;
        Ok(())
    }
}

pub fn panel_offset(slot: Slot) -> i32 {
    match slot {
        Slot::Morning => MORNING_X_OFFSET,
        Slot::Evening => EVENING_X_OFFSET,
    }
}
