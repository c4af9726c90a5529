use std::path::Path;

use crate::error::TgaError;
use crate::tga::{ self, TgaImage };

/// A canvas of RGB byte pixels.
///
/// Pixels are stored row-major, top row first, three bytes per pixel in
/// R, G, B order. Once a render finishes, the canvas can be saved to a TGA
/// file, which wants B, G, R order instead.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Canvas {
    /// The width of the canvas, in pixels.
    pub width: usize,

    /// The height of the canvas, in pixels.
    pub height: usize,

    pixels: Vec<u8>,
}

impl Canvas {
    /// Creates a black canvas.
    pub fn new(width: usize, height: usize) -> Canvas {
        Canvas {
            width,
            height,
            pixels: vec![0; width * height * 3],
        }
    }

    /// Wraps an existing RGB buffer. Returns `None` if the length is wrong.
    pub fn from_rgb(width: usize, height: usize, pixels: Vec<u8>) -> Option<Canvas> {
        if pixels.len() != width * height * 3 {
            return None;
        }

        Some(Canvas { width, height, pixels })
    }

    /// Writes a pixel at column `x`, row `y`.
    ///
    /// Out-of-bounds pixels are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spectral_tracer::canvas::Canvas;
    /// let mut canvas = Canvas::new(8, 8);
    /// canvas.write_pixel(4, 2, [255, 0, 255]);
    /// assert_eq!(canvas.read_pixel(4, 2), Some([255, 0, 255]));
    /// ```
    pub fn write_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }

        let offset = ((y * self.width) + x) * 3;
        self.pixels[offset..offset + 3].copy_from_slice(&rgb);
    }

    /// Reads the pixel at column `x`, row `y`, if it is in bounds.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = ((y * self.width) + x) * 3;
        let p = &self.pixels[offset..offset + 3];

        Some([p[0], p[1], p[2]])
    }

    pub fn as_rgb(&self) -> &[u8] {
        &self.pixels
    }

    /// The pixel buffer with the channels in B, G, R order.
    pub fn to_bgr(&self) -> Vec<u8> {
        tga::rgb_to_bgr(self.pixels.clone())
    }

    pub fn to_tga(&self) -> Result<TgaImage, TgaError> {
        TgaImage::from_bgr(self.width, self.height, self.to_bgr())
    }

    /// Saves the canvas as a 24-bit uncompressed TGA file.
    pub fn save_tga<P: AsRef<Path>>(&self, path: P) -> Result<(), TgaError> {
        self.to_tga()?.save(path)
    }
}

#[test]
fn new_canvas_is_black() {
    let c = Canvas::new(10, 20);

    assert_eq!(c.as_rgb().len(), 600);
    assert!(c.as_rgb().iter().all(|b| *b == 0));
}

#[test]
fn out_of_bounds_pixels() {
    let mut c = Canvas::new(2, 2);
    c.write_pixel(2, 0, [1, 2, 3]);

    assert_eq!(c.read_pixel(2, 0), None);
    assert_eq!(c, Canvas::new(2, 2));
}

#[test]
fn row_major_layout() {
    let mut c = Canvas::new(3, 2);
    c.write_pixel(1, 1, [7, 8, 9]);

    assert_eq!(&c.as_rgb()[12..15], &[7, 8, 9]);
}

#[test]
fn bgr_hand_off() {
    let c = Canvas::from_rgb(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();

    assert_eq!(c.to_bgr(), vec![3, 2, 1, 6, 5, 4]);
    assert_eq!(c.to_tga().unwrap().image_data, vec![3, 2, 1, 6, 5, 4]);
    assert_eq!(Canvas::from_rgb(1, 2, vec![0; 5]), None);
}
