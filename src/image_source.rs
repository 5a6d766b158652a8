/// Image source
///
/// Loads frame images as 16-bit grayscale intensity arrays for display.
/// The engine does not interpret pixel values beyond handing the host the
/// array and the intensity ceiling its contrast slider should span.
use std::path::Path;

use image::{ImageBuffer, ImageReader, Luma};
use log::debug;

use crate::error::Error;

pub type IntensityImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Decode one frame from the image directory.
pub fn load_frame(img_dir: &Path, filename: &str) -> Result<IntensityImage, Error> {
    let path = img_dir.join(filename);
    let img = ImageReader::open(&path)
        .map_err(|e| Error::Io(format!("failed to open {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| Error::Io(format!("failed to decode {}: {}", path.display(), e)))?;
    let img = img.to_luma16();
    debug!("Loaded {} ({}x{})", filename, img.width(), img.height());
    Ok(img)
}

pub fn max_intensity(img: &IntensityImage) -> u16 {
    img.pixels().map(|p| p.0[0]).max().unwrap_or(0)
}

/// Contrast slider ceiling: the power of two just above the brightest
/// pixel, so a 12-bit acquisition gets a 0..4096 range instead of the full
/// 16-bit span.
pub fn contrast_ceiling(max_value: u16) -> u32 {
    let bits = 32 - u32::from(max_value).leading_zeros();
    1u32 << bits.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_ceiling_rounds_to_power_of_two() {
        assert_eq!(contrast_ceiling(255), 256);
        assert_eq!(contrast_ceiling(256), 512);
        assert_eq!(contrast_ceiling(4095), 4096);
        assert_eq!(contrast_ceiling(1), 2);
        assert_eq!(contrast_ceiling(0), 2);
        assert_eq!(contrast_ceiling(u16::MAX), 65536);
    }

    #[test]
    fn test_load_frame_and_max_intensity() {
        let dir = std::env::temp_dir().join(format!("trackcurator_img_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("s_tp1_layer001.png");

        let mut img: IntensityImage = ImageBuffer::new(4, 4);
        img.put_pixel(2, 3, Luma([1000u16]));
        img.save(&path).unwrap();

        let loaded = load_frame(&dir, "s_tp1_layer001.png").unwrap();
        assert_eq!(loaded.dimensions(), (4, 4));
        assert_eq!(max_intensity(&loaded), 1000);
        assert_eq!(contrast_ceiling(max_intensity(&loaded)), 1024);
        std::fs::remove_dir_all(&dir).ok();
    }
}
