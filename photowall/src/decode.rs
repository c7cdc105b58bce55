use crate::error::DecodeError;

/// Turns fetched bytes into a cacheable value. Runs on worker threads.
pub trait Decoder<V>: Send + Sync {
  fn decode(&self, bytes: &[u8]) -> Result<V, DecodeError>;
}

impl<V, F> Decoder<V> for F
where
  F: Fn(&[u8]) -> Result<V, DecodeError> + Send + Sync,
{
  fn decode(&self, bytes: &[u8]) -> Result<V, DecodeError> {
    self(bytes)
  }
}

/// Decodes PNG, JPEG, GIF and WebP data into RGBA8 `Image`s.
#[cfg(feature = "codec")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

#[cfg(feature = "codec")]
impl Decoder<crate::bitmap::Image> for ImageDecoder {
  fn decode(&self, bytes: &[u8]) -> Result<crate::bitmap::Image, DecodeError> {
    if bytes.is_empty() {
      return Err(DecodeError::Empty);
    }
    let rgba = ::image::load_from_memory(bytes)
      .map_err(|e| DecodeError::Malformed(e.to_string()))?
      .into_rgba8();
    let (width, height) = rgba.dimensions();
    crate::bitmap::Image::from_rgba8(width, height, rgba.into_raw())
      .ok_or_else(|| DecodeError::Malformed("pixel buffer does not match dimensions".to_string()))
  }
}

#[cfg(all(test, feature = "codec"))]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let pixels = ::image::RgbaImage::from_pixel(width, height, ::image::Rgba([10, 20, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    pixels.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
    out.into_inner()
  }

  #[test]
  fn decodes_png_to_rgba() {
    let decoded = ImageDecoder.decode(&encoded_png(3, 2)).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (3, 2));
    assert_eq!(decoded.byte_size(), 24);
    assert_eq!(&decoded.pixels()[..4], &[10, 20, 30, 255]);
  }

  #[test]
  fn empty_and_truncated_input_fail() {
    assert!(matches!(ImageDecoder.decode(&[]), Err(DecodeError::Empty)));

    let png = encoded_png(4, 4);
    let truncated = &png[..png.len() / 2];
    assert!(matches!(
      ImageDecoder.decode(truncated),
      Err(DecodeError::Malformed(_))
    ));
  }
}
