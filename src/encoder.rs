use std::ffi::c_void;
use std::fmt::{Debug, Formatter};
use std::mem::MaybeUninit;

use image::DynamicImage;
use libwebp_sys::*;

use crate::error::{Error, Result};
use crate::shared::*;

/// Highest-effort compression method understood by libwebp.
pub const MAX_METHOD: i32 = 6;

/// Encoder settings backed by a validated libwebp `WebPConfig`.
pub struct EncoderConfig(WebPConfig);

impl EncoderConfig {
    /// Creates a configuration for the given quality (0.0 to 100.0) using
    /// the highest-effort compression method.
    /// In lossless mode the quality only steers how hard libwebp tries.
    pub fn new(quality: f32, lossless: bool) -> Result<Self> {
        let mut config = MaybeUninit::<WebPConfig>::uninit();
        let ok = unsafe {
            WebPConfigInitInternal(
                config.as_mut_ptr(),
                WebPPreset::WEBP_PRESET_DEFAULT,
                quality,
                WEBP_ENCODER_ABI_VERSION as i32,
            )
        };
        if ok == 0 {
            return Err(Error::InvalidConfig);
        }

        let mut config = unsafe { config.assume_init() };
        config.lossless = lossless as i32;
        config.method = MAX_METHOD;

        Self(config).validated()
    }

    /// Overrides the compression method, 0 (fast) to 6 (slowest, smallest).
    pub fn with_method(mut self, method: i32) -> Result<Self> {
        self.0.method = method;
        self.validated()
    }

    pub fn quality(&self) -> f32 {
        self.0.quality
    }

    pub fn is_lossless(&self) -> bool {
        self.0.lossless != 0
    }

    pub fn method(&self) -> i32 {
        self.0.method
    }

    fn validated(self) -> Result<Self> {
        if unsafe { WebPValidateConfig(&self.0) } == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(self)
    }
}

impl Debug for EncoderConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderConfig")
            .field("quality", &self.quality())
            .field("lossless", &self.is_lossless())
            .field("method", &self.method())
            .finish()
    }
}

/// An encoder for WebP images.
pub struct Encoder<'a> {
    image: &'a [u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
}

impl<'a> Encoder<'a> {
    /// Creates a new encoder from the given image data.
    /// The image data must be in the pixel layout of the layout parameter.
    pub fn new(image: &'a [u8], layout: PixelLayout, width: u32, height: u32) -> Self {
        Self { image, layout, width, height }
    }

    /// Creates a new encoder from the given image.
    /// Only 8-bit RGB and RGBA images are accepted; normalize first.
    pub fn from_image(image: &'a DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageRgb8(image) => {
                Ok(Self::from_rgb(image.as_ref(), image.width(), image.height()))
            }
            DynamicImage::ImageRgba8(image) => {
                Ok(Self::from_rgba(image.as_ref(), image.width(), image.height()))
            }
            other => Err(Error::UnsupportedLayout(format!("{:?}", other.color()))),
        }
    }

    /// Creates a new encoder from the given image data in the RGB pixel layout.
    pub fn from_rgb(image: &'a [u8], width: u32, height: u32) -> Self {
        Self { image, layout: PixelLayout::Rgb, width, height }
    }

    /// Creates a new encoder from the given image data in the RGBA pixel layout.
    pub fn from_rgba(image: &'a [u8], width: u32, height: u32) -> Self {
        Self { image, layout: PixelLayout::Rgba, width, height }
    }

    /// Encode the image with the given configuration.
    pub fn encode(&self, config: &EncoderConfig) -> Result<WebPMemory> {
        let expected = self.width as usize * self.height as usize * self.layout.channels() as usize;
        if self.width == 0 || self.height == 0 || self.image.len() < expected {
            return Err(Error::UnsupportedLayout(format!(
                "{}x{} {:?} buffer of {} bytes",
                self.width,
                self.height,
                self.layout,
                self.image.len()
            )));
        }

        unsafe {
            let mut picture = new_picture(self.image, self.layout, self.width, self.height)?;
            encode(&mut picture.0, &config.0)
        }
    }
}

/// Frees the picture's pixel buffers when dropped.
struct ManagedPicture(WebPPicture);

impl Drop for ManagedPicture {
    fn drop(&mut self) {
        unsafe { WebPPictureFree(&mut self.0) }
    }
}

unsafe fn new_picture(image: &[u8], layout: PixelLayout, width: u32, height: u32) -> Result<ManagedPicture> {
    let mut picture = MaybeUninit::<WebPPicture>::uninit();
    if WebPPictureInitInternal(picture.as_mut_ptr(), WEBP_ENCODER_ABI_VERSION as i32) == 0 {
        return Err(Error::InvalidConfig);
    }

    let mut picture = ManagedPicture(picture.assume_init());
    picture.0.use_argb = 1;
    picture.0.width = width as i32;
    picture.0.height = height as i32;

    let stride = (width * layout.channels()) as i32;
    let ok = match layout {
        PixelLayout::Rgb => WebPPictureImportRGB(&mut picture.0, image.as_ptr(), stride),
        PixelLayout::Rgba => WebPPictureImportRGBA(&mut picture.0, image.as_ptr(), stride),
    };
    if ok == 0 {
        return Err(Error::Encode(picture.0.error_code));
    }

    Ok(picture)
}

unsafe fn encode(picture: &mut WebPPicture, config: &WebPConfig) -> Result<WebPMemory> {
    let mut writer = MaybeUninit::<WebPMemoryWriter>::uninit();
    WebPMemoryWriterInit(writer.as_mut_ptr());

    picture.writer = Some(WebPMemoryWrite);
    picture.custom_ptr = writer.as_mut_ptr() as *mut c_void;

    let ok = WebPEncode(config, picture);
    let mut writer = writer.assume_init();

    if ok == 0 {
        WebPMemoryWriterClear(&mut writer);
        return Err(Error::Encode(picture.error_code));
    }

    Ok(WebPMemory(writer.mem, writer.size))
}
