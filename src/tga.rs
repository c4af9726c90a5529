//! Uncompressed TGA images.
//!
//! The container is an 18-byte little-endian header, an optional image id, an
//! optional color map and then the raw pixel data. Run-length encoded images
//! can be described by the header, but their pixel data is not decoded.

use std::fs::File;
use std::io::{ BufReader, BufWriter, Read, Write };
use std::path::Path;

use crate::error::TgaError;

pub const HEADER_SIZE: usize = 18;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorMapType {
    None = 0,
    Present = 1,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageType {
    NoImageData = 0,
    ColorMapped = 1,
    TrueColor = 2,
    Grayscale = 3,
    RleColorMapped = 9,
    RleTrueColor = 10,
    RleGrayscale = 11,
}

impl ImageType {
    fn from_u8(value: u8) -> Result<ImageType, TgaError> {
        match value {
            0 => Ok(ImageType::NoImageData),
            1 => Ok(ImageType::ColorMapped),
            2 => Ok(ImageType::TrueColor),
            3 => Ok(ImageType::Grayscale),
            9 => Ok(ImageType::RleColorMapped),
            10 => Ok(ImageType::RleTrueColor),
            11 => Ok(ImageType::RleGrayscale),
            other => Err(TgaError::UnsupportedImageType(other)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HorizontalDirection {
    LeftToRight = 0,
    RightToLeft = 0x10,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerticalDirection {
    BottomToTop = 0,
    TopToBottom = 0x20,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TgaHeader {
    pub id_length: u8,
    pub color_map_type: ColorMapType,
    pub image_type: ImageType,
    pub color_map_first: u16,
    pub color_map_length: u16,
    pub color_map_depth: u8,
    pub origin_x: u16,
    pub origin_y: u16,
    pub width: u16,
    pub height: u16,
    pub pixel_depth: u8,
    pub alpha_depth: u8,
    pub horizontal_direction: HorizontalDirection,
    pub vertical_direction: VerticalDirection,
}

impl TgaHeader {
    /// A header for an uncompressed, top-to-bottom, left-to-right image
    /// without id or color map.
    pub fn true_color(width: u16, height: u16, pixel_depth: u8) -> TgaHeader {
        TgaHeader {
            id_length: 0,
            color_map_type: ColorMapType::None,
            image_type: ImageType::TrueColor,
            color_map_first: 0,
            color_map_length: 0,
            color_map_depth: 0,
            origin_x: 0,
            origin_y: 0,
            width,
            height,
            pixel_depth,
            alpha_depth: if pixel_depth == 32 { 8 } else { 0 },
            horizontal_direction: HorizontalDirection::LeftToRight,
            vertical_direction: VerticalDirection::TopToBottom,
        }
    }

    pub fn color_map_size(&self) -> usize {
        self.color_map_length as usize * (self.color_map_depth as usize / 8)
    }

    pub fn image_data_size(&self) -> usize {
        self.width as usize * self.height as usize * (self.pixel_depth as usize / 8)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut b = [0u8; HEADER_SIZE];
        b[0] = self.id_length;
        b[1] = self.color_map_type as u8;
        b[2] = self.image_type as u8;
        b[3..5].copy_from_slice(&self.color_map_first.to_le_bytes());
        b[5..7].copy_from_slice(&self.color_map_length.to_le_bytes());
        b[7] = self.color_map_depth;
        b[8..10].copy_from_slice(&self.origin_x.to_le_bytes());
        b[10..12].copy_from_slice(&self.origin_y.to_le_bytes());
        b[12..14].copy_from_slice(&self.width.to_le_bytes());
        b[14..16].copy_from_slice(&self.height.to_le_bytes());
        b[16] = self.pixel_depth;
        b[17] = (self.alpha_depth & 0x0F)
            | self.horizontal_direction as u8
            | self.vertical_direction as u8;

        b
    }

    pub fn from_bytes(b: &[u8; HEADER_SIZE]) -> Result<TgaHeader, TgaError> {
        let u16_at = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let descriptor = b[17];

        Ok(TgaHeader {
            id_length: b[0],
            color_map_type: if b[1] == 0 {
                ColorMapType::None
            } else {
                ColorMapType::Present
            },
            image_type: ImageType::from_u8(b[2])?,
            color_map_first: u16_at(3),
            color_map_length: u16_at(5),
            color_map_depth: b[7],
            origin_x: u16_at(8),
            origin_y: u16_at(10),
            width: u16_at(12),
            height: u16_at(14),
            pixel_depth: b[16],
            alpha_depth: descriptor & 0x0F,
            horizontal_direction: if descriptor & 0x10 != 0 {
                HorizontalDirection::RightToLeft
            } else {
                HorizontalDirection::LeftToRight
            },
            vertical_direction: if descriptor & 0x20 != 0 {
                VerticalDirection::TopToBottom
            } else {
                VerticalDirection::BottomToTop
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TgaImage {
    pub header: TgaHeader,
    pub id: Vec<u8>,
    pub color_map_data: Vec<u8>,
    pub image_data: Vec<u8>,
}

impl TgaImage {
    /// Wraps 24-bit BGR pixel data, stored top-to-bottom.
    pub fn from_bgr(width: usize, height: usize, image_data: Vec<u8>)
        -> Result<TgaImage, TgaError> {
        if width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(TgaError::TooLarge { width, height });
        }

        let header = TgaHeader::true_color(width as u16, height as u16, 24);
        if image_data.len() != header.image_data_size() {
            return Err(TgaError::DataLength {
                expected: header.image_data_size(),
                actual: image_data.len(),
            });
        }

        Ok(TgaImage {
            header,
            id: Vec::new(),
            color_map_data: Vec::new(),
            image_data,
        })
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<TgaImage, TgaError> {
        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw)?;
        let header = TgaHeader::from_bytes(&raw)?;

        let mut id = vec![0u8; header.id_length as usize];
        reader.read_exact(&mut id)?;

        let mut color_map_data = vec![0u8; header.color_map_size()];
        reader.read_exact(&mut color_map_data)?;

        let mut image_data = vec![0u8; header.image_data_size()];
        reader.read_exact(&mut image_data)?;

        Ok(TgaImage { header, id, color_map_data, image_data })
    }

    /// Writes the image. The id length in the written header always matches
    /// `id`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), TgaError> {
        if self.id.len() > u8::MAX as usize {
            return Err(TgaError::DataLength {
                expected: u8::MAX as usize,
                actual: self.id.len(),
            });
        }

        let mut header = self.header;
        header.id_length = self.id.len() as u8;

        writer.write_all(&header.to_bytes())?;
        writer.write_all(&self.id)?;
        writer.write_all(&self.color_map_data)?;
        writer.write_all(&self.image_data)?;
        writer.flush()?;

        Ok(())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<TgaImage, TgaError> {
        TgaImage::read_from(BufReader::new(File::open(path)?))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TgaError> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}

fn swap_channels(mut data: Vec<u8>, stride: usize) -> Vec<u8> {
    for pixel in data.chunks_exact_mut(stride) {
        pixel.swap(0, 2);
    }

    data
}

pub fn rgb_to_bgr(data: Vec<u8>) -> Vec<u8> {
    swap_channels(data, 3)
}

pub fn bgr_to_rgb(data: Vec<u8>) -> Vec<u8> {
    swap_channels(data, 3)
}

pub fn rgba_to_bgra(data: Vec<u8>) -> Vec<u8> {
    swap_channels(data, 4)
}

pub fn bgra_to_rgba(data: Vec<u8>) -> Vec<u8> {
    swap_channels(data, 4)
}

#[test]
fn header_layout() {
    let header = TgaHeader::true_color(640, 360, 24);
    let bytes = header.to_bytes();

    assert_eq!(bytes[2], 2);
    assert_eq!(&bytes[12..14], &[0x80, 0x02]);
    assert_eq!(&bytes[14..16], &[0x68, 0x01]);
    assert_eq!(bytes[16], 24);
    assert_eq!(bytes[17], 0x20);
}

#[test]
fn descriptor_bits() {
    let mut header = TgaHeader::true_color(1, 1, 32);
    header.horizontal_direction = HorizontalDirection::RightToLeft;
    header.vertical_direction = VerticalDirection::BottomToTop;

    let bytes = header.to_bytes();
    assert_eq!(bytes[17], 0x18);
    assert_eq!(TgaHeader::from_bytes(&bytes).unwrap(), header);
}

#[test]
fn image_through_buffer() {
    let pixels = rgb_to_bgr(vec![
        255, 0, 0,    0, 255, 0,
        0, 0, 255,    10, 20, 30,
    ]);
    let mut image = TgaImage::from_bgr(2, 2, pixels).unwrap();
    image.id = b"spectral".to_vec();

    let mut buffer = Vec::new();
    image.write_to(&mut buffer).unwrap();
    assert_eq!(buffer.len(), HEADER_SIZE + 8 + 12);

    let read = TgaImage::read_from(std::io::Cursor::new(buffer)).unwrap();
    assert_eq!(read.header.id_length, 8);
    assert_eq!(read.id, b"spectral".to_vec());
    assert_eq!(bgr_to_rgb(read.image_data), vec![
        255, 0, 0,    0, 255, 0,
        0, 0, 255,    10, 20, 30,
    ]);
}

#[test]
fn wrong_data_length() {
    match TgaImage::from_bgr(2, 2, vec![0; 5]) {
        Err(TgaError::DataLength { expected, actual }) => {
            assert_eq!(expected, 12);
            assert_eq!(actual, 5);
        },
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn truncated_file() {
    let bytes = TgaHeader::true_color(4, 4, 24).to_bytes().to_vec();

    assert!(matches!(
        TgaImage::read_from(std::io::Cursor::new(bytes)),
        Err(TgaError::Io(_))
    ));
}

#[test]
fn unknown_image_type() {
    let mut bytes = TgaHeader::true_color(1, 1, 24).to_bytes();
    bytes[2] = 42;

    assert!(matches!(
        TgaHeader::from_bytes(&bytes),
        Err(TgaError::UnsupportedImageType(42))
    ));
}

#[test]
fn rgba_swap() {
    assert_eq!(rgba_to_bgra(vec![1, 2, 3, 4, 5, 6, 7, 8]),
        vec![3, 2, 1, 4, 7, 6, 5, 8]);
    assert_eq!(bgra_to_rgba(vec![3, 2, 1, 4]), vec![1, 2, 3, 4]);
}
