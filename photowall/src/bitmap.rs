use std::fmt;

/// A decoded bitmap in tightly packed RGBA8 layout.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
  width: u32,
  height: u32,
  pixels: Vec<u8>,
}

impl Image {
  /// Bytes per RGBA8 pixel.
  pub const BYTES_PER_PIXEL: usize = 4;

  /// Wraps an RGBA8 pixel buffer.
  ///
  /// Returns `None` when the buffer length does not match `width * height * 4`.
  pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
    let expected = (width as usize)
      .checked_mul(height as usize)?
      .checked_mul(Self::BYTES_PER_PIXEL)?;
    if pixels.len() != expected {
      return None;
    }
    Some(Self {
      width,
      height,
      pixels,
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixels(&self) -> &[u8] {
    &self.pixels
  }

  /// Raw pixel byte count. This is the default cache cost of an image.
  #[inline]
  pub fn byte_size(&self) -> u64 {
    self.pixels.len() as u64
  }
}

// Pixel buffers are large; keep them out of debug output.
impl fmt::Debug for Image {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Image")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("byte_size", &self.byte_size())
      .finish()
  }
}
