use std::fmt::{Debug, Error, Formatter};
use std::ops::{Deref, DerefMut};

use image::{DynamicImage, ImageBuffer};
use libwebp_sys::WebPFree;

/// This struct represents a safe wrapper around memory owned by libwebp.
/// Its data contents can be accessed through the Deref and DerefMut traits.
pub struct WebPMemory(pub(crate) *mut u8, pub(crate) usize);

// The buffer is uniquely owned and only freed on drop.
unsafe impl Send for WebPMemory {}

impl Debug for WebPMemory {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_struct("WebPMemory").field("len", &self.1).finish()
    }
}

impl Drop for WebPMemory {
    fn drop(&mut self) {
        unsafe { WebPFree(self.0 as _) }
    }
}

impl Deref for WebPMemory {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        if self.0.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.0, self.1) }
    }
}

impl DerefMut for WebPMemory {
    fn deref_mut(&mut self) -> &mut Self::Target {
        if self.0.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.0, self.1) }
    }
}

/// This struct represents a decoded WebP image.
/// Its data contents can be accessed through the Deref and DerefMut traits.
pub struct WebPImage {
    data: WebPMemory,
    layout: PixelLayout,
    width: u32,
    height: u32,
}

impl WebPImage {
    pub(crate) fn new(data: WebPMemory, layout: PixelLayout, width: u32, height: u32) -> Self {
        Self { data, layout, width, height }
    }

    /// Copies the pixels into a `DynamicImage`, `None` if the buffer does not
    /// match the dimensions.
    pub fn to_image(&self) -> Option<DynamicImage> {
        let pixels = self.data.to_vec();
        match self.layout {
            PixelLayout::Rgba => ImageBuffer::from_raw(self.width, self.height, pixels)
                .map(DynamicImage::ImageRgba8),
            PixelLayout::Rgb => ImageBuffer::from_raw(self.width, self.height, pixels)
                .map(DynamicImage::ImageRgb8),
        }
    }

    /// Returns the pixel layout of the decoded buffer.
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Returns the width of the image in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Deref for WebPImage {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.deref()
    }
}

impl DerefMut for WebPImage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data.deref_mut()
    }
}

/// Describes the pixel layout of an image buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    /// Returns true if the pixel contains an alpha channel.
    pub fn is_alpha(self) -> bool {
        self == PixelLayout::Rgba
    }

    /// Bytes per pixel.
    pub fn channels(self) -> u32 {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}
