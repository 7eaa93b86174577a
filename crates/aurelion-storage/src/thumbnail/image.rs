//! In-process image thumbnails.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::{DynamicImage, ImageDecoder, ImageReader};
use tokio_util::sync::CancellationToken;

use super::{ThumbnailSpec, TranscodeError};

/// Decode, auto-orient, cover-crop, and encode `source` as JPEG at `dest`.
///
/// Blocking; call from a blocking task. `cancel` is checked between the
/// decode, resize, and encode steps. A cancelled render leaves nothing at
/// `dest`.
pub fn render(
    source: &Path,
    dest: &Path,
    spec: &ThumbnailSpec,
    cancel: &CancellationToken,
) -> Result<(), TranscodeError> {
    check_cancelled(cancel)?;
    let mut decoder = ImageReader::open(source)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    check_cancelled(cancel)?;
    let thumb = cover(&img, spec.size);
    drop(img);

    check_cancelled(cancel)?;
    let writer = BufWriter::new(File::create(dest)?);
    let encoder = JpegEncoder::new_with_quality(writer, spec.quality);
    DynamicImage::ImageRgb8(thumb.to_rgb8()).write_with_encoder(encoder)?;

    if cancel.is_cancelled() {
        let _ = std::fs::remove_file(dest);
        return Err(TranscodeError::Aborted("render cancelled".to_string()));
    }
    Ok(())
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), TranscodeError> {
    if cancel.is_cancelled() {
        return Err(TranscodeError::Aborted("render cancelled".to_string()));
    }
    Ok(())
}

/// Fill a `size`x`size` square, cropping the overflow, never enlarging.
///
/// Sources smaller than the square on either axis are only center-cropped.
fn cover(img: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width >= size && height >= size {
        return img.resize_to_fill(size, size, FilterType::Lanczos3);
    }

    let (w, h) = (width.min(size), height.min(size));
    img.crop_imm((width - w) / 2, (height - h) / 2, w, h)
}
