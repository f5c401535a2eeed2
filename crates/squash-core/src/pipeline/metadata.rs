//! EXIF orientation lookup and correction.

use exif::{In, Reader, Tag, Value};
use image::DynamicImage;
use std::io::Cursor;

/// Reads the EXIF orientation tag from an in-memory image.
pub struct OrientationReader;

impl OrientationReader {
    /// Look up the orientation (1-8) of an encoded image.
    ///
    /// Returns `Ok(None)` when the container carries no EXIF block or no
    /// orientation tag. A malformed EXIF block or a value outside 1-8 is an
    /// error.
    pub fn read(bytes: &[u8]) -> Result<Option<u16>, String> {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(format!("unreadable EXIF: {e}")),
        };

        let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) else {
            return Ok(None);
        };

        let value = match &field.value {
            Value::Short(v) => v.first().copied(),
            Value::Long(v) => v.first().and_then(|&x| u16::try_from(x).ok()),
            _ => None,
        };

        match value {
            Some(o) if (1..=8).contains(&o) => Ok(Some(o)),
            Some(o) => Err(format!("invalid EXIF orientation {o}")),
            None => Err("malformed EXIF orientation field".to_string()),
        }
    }
}

/// Rotate/flip an image so that it displays upright for the given orientation.
pub fn apply_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Splice a minimal big-endian EXIF APP1 segment carrying `orientation`
    /// right after the SOI marker of a JPEG.
    pub fn jpeg_with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let [hi, lo] = orientation.to_be_bytes();
        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        // TIFF header, big-endian, IFD0 at offset 8
        app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        // One entry: Orientation (0x0112), SHORT, count 1
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        app1.extend_from_slice(&[hi, lo, 0x00, 0x00]);
        // No next IFD
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = Vec::with_capacity(jpeg.len() + app1.len());
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn small_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 20));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_no_exif_is_none() {
        assert_eq!(OrientationReader::read(&small_jpeg()).unwrap(), None);
    }

    #[test]
    fn test_reads_orientation() {
        let jpeg = fixtures::jpeg_with_orientation(&small_jpeg(), 6);
        assert_eq!(OrientationReader::read(&jpeg).unwrap(), Some(6));
    }

    #[test]
    fn test_out_of_range_orientation_is_error() {
        let jpeg = fixtures::jpeg_with_orientation(&small_jpeg(), 9);
        assert!(OrientationReader::read(&jpeg).is_err());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(OrientationReader::read(b"definitely not an image").is_err());
    }

    #[test]
    fn test_apply_orientation_dimensions() {
        let img = DynamicImage::new_rgb8(40, 20);
        for o in [1, 2, 3, 4] {
            let out = apply_orientation(img.clone(), o);
            assert_eq!((out.width(), out.height()), (40, 20), "orientation {o}");
        }
        for o in [5, 6, 7, 8] {
            let out = apply_orientation(img.clone(), o);
            assert_eq!((out.width(), out.height()), (20, 40), "orientation {o}");
        }
    }
}
