use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use std::path::Path;
use webp::Encoder;

use crate::error::CodecError;

/// Default lossy WebP quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// WebP maximum dimensions are 16383x16383
pub const MAX_WEBP_DIMENSION: u32 = 16383;

/// Decode -> orient -> WebP encode for a single image.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    quality: f32,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: f32::from(quality.min(100)),
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Read `input_path` and return the encoded WebP bytes.
    pub fn transcode(&self, input_path: &Path) -> Result<Vec<u8>, CodecError> {
        let img = self.decode_oriented(input_path)?;
        self.encode(&img)
    }

    /// Decode the image and bake its EXIF orientation into the pixel data.
    ///
    /// The returned image has identity orientation; the tag itself is not
    /// carried over because the WebP encoder writes no EXIF chunk.
    pub fn decode_oriented(&self, input_path: &Path) -> Result<DynamicImage, CodecError> {
        // Content sniffing first, extension as fallback
        let mut decoder = ImageReader::open(input_path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;

        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);
        log::trace!("{}: orientation {:?} applied", input_path.display(), orientation);

        Ok(img)
    }

    pub fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::InvalidDimensions { width, height });
        }
        if width > MAX_WEBP_DIMENSION || height > MAX_WEBP_DIMENSION {
            return Err(CodecError::TooLarge {
                width,
                height,
                limit: MAX_WEBP_DIMENSION,
            });
        }

        // libwebp only takes 8-bit RGB or RGBA
        let normalized;
        let img = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
            other if other.color().has_alpha() => {
                normalized = DynamicImage::ImageRgba8(other.to_rgba8());
                &normalized
            }
            other => {
                normalized = DynamicImage::ImageRgb8(other.to_rgb8());
                &normalized
            }
        };

        let encoder = Encoder::from_image(img).map_err(|e| CodecError::Encode(e.to_string()))?;
        let webp_data = encoder.encode(self.quality);
        Ok(webp_data.to_vec())
    }
}
