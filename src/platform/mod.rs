//! MagTag board support
//!
//! | Function           | GPIO |
//! |--------------------|------|
//! | EPD BUSY           | 5    |
//! | EPD RST            | 6    |
//! | EPD DC             | 7    |
//! | EPD CS             | 8    |
//! | EPD SCK            | 36   |
//! | EPD MOSI           | 35   |
//! | NeoPixel data      | 1    |
//! | NeoPixel power     | 21 (active low) |
//! | Button D15 (A)     | 15   |
//! | Button D14 (B)     | 14   |
//! | Button D12 (C)     | 12   |
//! | Button D11 (D)     | 11   |

pub mod neopixel;
pub mod power;

pub use neopixel::NeoPixels;
pub use power::{resumed_from_sleep, EspPower};
