use std::path::Path;

use color_eyre::eyre::{self, Context};
use image::{ImageFormat, RgbImage};

use crate::keyframe::ImageWriter;

/// Writes frames as JPEG files, whatever the extension of the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegWriter;

impl ImageWriter for JpegWriter {
    fn write(&self, frame: &RgbImage, path: &Path) -> eyre::Result<()> {
        frame
            .save_with_format(path, ImageFormat::Jpeg)
            .wrap_err_with(|| format!("failed to save the image to {}", path.display()))
    }
}
