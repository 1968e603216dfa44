//! PNG decoding and embedding as PDF Image XObjects.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::StampError;

/// PDF colorspace of the decoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRgb => "DeviceRGB",
        }
    }
}

/// A decoded PNG signature image, normalized to 8-bit samples with the
/// alpha channel (if any) split into its own plane.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    color: ColorSpace,
    samples: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl SignatureImage {
    /// Decode PNG bytes. Palette and sub-byte images are expanded and
    /// 16-bit channels reduced, so the output is always 8-bit gray or RGB.
    pub fn decode(bytes: &[u8]) -> Result<Self, StampError> {
        let unsupported = |e: &dyn std::fmt::Display| StampError::UnsupportedImage(e.to_string());

        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder.read_info().map_err(|e| unsupported(&e))?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(|e| unsupported(&e))?;
        buf.truncate(info.buffer_size());

        let (color, samples, alpha) = match info.color_type {
            png::ColorType::Grayscale => (ColorSpace::DeviceGray, buf, None),
            png::ColorType::Rgb => (ColorSpace::DeviceRgb, buf, None),
            png::ColorType::GrayscaleAlpha => {
                let mut gray = Vec::with_capacity(buf.len() / 2);
                let mut alpha = Vec::with_capacity(buf.len() / 2);
                for px in buf.chunks_exact(2) {
                    gray.push(px[0]);
                    alpha.push(px[1]);
                }
                (ColorSpace::DeviceGray, gray, Some(alpha))
            }
            png::ColorType::Rgba => {
                let mut rgb = Vec::with_capacity(buf.len() / 4 * 3);
                let mut alpha = Vec::with_capacity(buf.len() / 4);
                for px in buf.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                    alpha.push(px[3]);
                }
                (ColorSpace::DeviceRgb, rgb, Some(alpha))
            }
            // normalize_to_color8 expands Indexed, so this is unreachable in
            // practice, but the decoder contract does not promise it.
            other => {
                return Err(StampError::UnsupportedImage(format!(
                    "unexpected color type {other:?}"
                )))
            }
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color,
            samples,
            alpha,
        })
    }

    /// Native pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Native pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Display dimensions at the given scale factor.
    pub fn scaled(&self, factor: f64) -> (f64, f64) {
        (f64::from(self.width) * factor, f64::from(self.height) * factor)
    }

    /// Add the image to the document as an Image XObject and return its id.
    ///
    /// Samples are FlateDecode-compressed. An alpha plane becomes a
    /// DeviceGray SMask stream referenced from the image dictionary.
    pub(crate) fn add_to_document(&self, doc: &mut Document) -> Result<ObjectId, StampError> {
        let smask_id = match &self.alpha {
            Some(alpha) => {
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(self.width),
                        "Height" => i64::from(self.height),
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                        "Filter" => "FlateDecode",
                    },
                    deflate(alpha)?,
                );
                Some(doc.add_object(Object::Stream(stream)))
            }
            None => None,
        };

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(self.width),
            "Height" => i64::from(self.height),
            "ColorSpace" => self.color.pdf_name(),
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        if let Some(id) = smask_id {
            dict.set("SMask", Object::Reference(id));
        }

        let stream = Stream::new(dict, deflate(&self.samples)?);
        Ok(doc.add_object(Object::Stream(stream)))
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, StampError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| StampError::SaveFailed(format!("flate compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| StampError::SaveFailed(format!("flate compression failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_png(width: u32, height: u32, color: png::ColorType) -> Vec<u8> {
        let channels = match color {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => unreachable!("not used in tests"),
        };
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let data = vec![0x7fu8; (width * height * channels) as usize];
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    #[test]
    fn decodes_rgba_and_splits_alpha() {
        let png = encode_png(100, 100, png::ColorType::Rgba);
        let image = SignatureImage::decode(&png).unwrap();

        assert_eq!(image.width(), 100);
        assert_eq!(image.height(), 100);
        assert_eq!(image.color, ColorSpace::DeviceRgb);
        assert_eq!(image.samples.len(), 100 * 100 * 3);
        assert_eq!(image.alpha.as_ref().unwrap().len(), 100 * 100);
    }

    #[test]
    fn decodes_grayscale_without_alpha() {
        let png = encode_png(30, 20, png::ColorType::Grayscale);
        let image = SignatureImage::decode(&png).unwrap();

        assert_eq!(image.color, ColorSpace::DeviceGray);
        assert_eq!(image.samples.len(), 30 * 20);
        assert!(image.alpha.is_none());
    }

    #[test]
    fn scaled_halves_native_dimensions() {
        let png = encode_png(100, 60, png::ColorType::Rgb);
        let image = SignatureImage::decode(&png).unwrap();

        assert_eq!(image.scaled(0.5), (50.0, 30.0));
    }

    #[test]
    fn rejects_non_png_bytes() {
        let err = SignatureImage::decode(b"definitely not a png").unwrap_err();
        assert!(matches!(err, StampError::UnsupportedImage(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let mut png = encode_png(10, 10, png::ColorType::Rgba);
        png.truncate(20);
        let err = SignatureImage::decode(&png).unwrap_err();
        assert!(matches!(err, StampError::UnsupportedImage(_)));
    }

    #[test]
    fn embedded_image_carries_smask_for_alpha() {
        let png = encode_png(10, 10, png::ColorType::Rgba);
        let image = SignatureImage::decode(&png).unwrap();

        let mut doc = Document::with_version("1.5");
        let id = image.add_to_document(&mut doc).unwrap();

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert!(stream.dict.get(b"SMask").unwrap().as_reference().is_ok());
    }
}
