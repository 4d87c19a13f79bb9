use image::GenericImageView;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Bowl sprite size, one per feeding slot panel
const BOWL_WIDTH: u32 = 140;
const BOWL_HEIGHT: u32 = 82;
/// Pixels darker than this become black
const THRESHOLD: u8 = 128;

const SPRITES: [(&str, &str); 2] = [
    ("images/bowl_empty.png", "bowl_empty.bin"),
    ("images/bowl_full.png", "bowl_full.bin"),
];

/// Fit a PNG into `width` x `height`, centred on white, and pack it into
/// rows of bits (MSB first, 1 is black)
fn pack_sprite(
    input: &Path,
    width: u32,
    height: u32,
    threshold: u8,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let img = image::open(input)?;
    let (orig_width, orig_height) = img.dimensions();

    let orig_ratio = orig_width as f32 / orig_height as f32;
    let target_ratio = width as f32 / height as f32;
    let (new_width, new_height) = if orig_ratio > target_ratio {
        (width, ((width as f32 / orig_ratio) as u32).max(1))
    } else {
        (((height as f32 * orig_ratio) as u32).max(1), height)
    };

    let gray = img
        .resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        .to_luma8();
    // resize keeps the ratio, so the result can be a pixel short
    let (new_width, new_height) = gray.dimensions();

    let bytes_per_row = width.div_ceil(8);
    let mut buffer = vec![0u8; (bytes_per_row * height) as usize];
    let offset_x = (width - new_width.min(width)) / 2;
    let offset_y = (height - new_height.min(height)) / 2;

    for y in 0..height {
        for x in 0..width {
            let inside = x
                .checked_sub(offset_x)
                .zip(y.checked_sub(offset_y))
                .filter(|(ix, iy)| *ix < new_width && *iy < new_height);
            let brightness = match inside {
                Some((ix, iy)) => gray.get_pixel(ix, iy)[0],
                None => 255,
            };
            if brightness < threshold {
                let byte_index = (y * bytes_per_row + x / 8) as usize;
                buffer[byte_index] |= 1 << (7 - (x % 8));
            }
        }
    }

    Ok(buffer)
}

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    for (input, output) in SPRITES {
        println!("cargo:rerun-if-changed={}", input);

        // An empty file tells the firmware to draw the bowl itself
        let packed = if Path::new(input).exists() {
            match pack_sprite(Path::new(input), BOWL_WIDTH, BOWL_HEIGHT, THRESHOLD) {
                Ok(packed) => packed,
                Err(e) => {
                    println!("cargo:warning=Failed to convert {}: {}", input, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        fs::write(out_dir.join(output), packed).expect("write sprite to OUT_DIR");
    }
}
