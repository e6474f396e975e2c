//! Conversion of decoded image samples into gray or RGB pixel buffers.

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use lopdf::{Document, Object, Stream};

use crate::error::{Error, Result};

use super::filters::{decode_stream, ImageData};

/// Color spaces that can be written as PNG after conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Single tint component; 0 is no ink.
    Separation,
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    /// Components per sample.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Separation | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    /// Resolve a `/ColorSpace` entry.
    pub fn resolve(doc: &Document, obj: &Object) -> Result<Self> {
        let obj = doc.dereference(obj)?.1;
        match obj {
            Object::Name(name) => Self::from_name(name),
            Object::Array(arr) => {
                let family = arr
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .ok_or_else(|| unsupported("color space array without family"))?;
                match family {
                    b"ICCBased" => {
                        let n = arr
                            .get(1)
                            .and_then(|o| doc.dereference(o).ok())
                            .and_then(|(_, o)| o.as_stream().ok())
                            .and_then(|s| s.dict.get(b"N").ok())
                            .and_then(|n| n.as_i64().ok())
                            .unwrap_or(3);
                        match n {
                            1 => Ok(ColorSpace::Gray),
                            3 => Ok(ColorSpace::Rgb),
                            4 => Ok(ColorSpace::Cmyk),
                            other => Err(unsupported(&format!("ICCBased with {} components", other))),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = arr
                            .get(1)
                            .ok_or_else(|| unsupported("Indexed without base"))
                            .and_then(|b| ColorSpace::resolve(doc, b))?;
                        if matches!(base, ColorSpace::Indexed { .. }) {
                            return Err(unsupported("nested Indexed color space"));
                        }
                        let hival = arr
                            .get(2)
                            .and_then(|o| o.as_i64().ok())
                            .unwrap_or(255)
                            .clamp(0, 255) as u8;
                        let lookup = match arr.get(3).map(|o| doc.dereference(o)) {
                            Some(Ok((_, Object::String(bytes, _)))) => bytes.clone(),
                            Some(Ok((_, Object::Stream(s)))) => match decode_stream(doc, s)? {
                                ImageData::Samples(data) => data,
                                ImageData::Jpeg(_) => return Err(unsupported("JPEG lookup table")),
                            },
                            _ => return Err(unsupported("Indexed without lookup table")),
                        };
                        Ok(ColorSpace::Indexed {
                            base: Box::new(base),
                            hival,
                            lookup,
                        })
                    }
                    b"Separation" => Ok(ColorSpace::Separation),
                    b"DeviceN" => {
                        let names = arr.get(1).and_then(|o| o.as_array().ok()).map(|a| a.len());
                        if names == Some(1) {
                            Ok(ColorSpace::Separation)
                        } else {
                            Err(unsupported("DeviceN color space"))
                        }
                    }
                    b"CalGray" => Ok(ColorSpace::Gray),
                    b"CalRGB" => Ok(ColorSpace::Rgb),
                    other => Self::from_name(other),
                }
            }
            _ => Err(unsupported("malformed color space")),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(unsupported(&format!(
                "{} color space",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

fn unsupported(reason: &str) -> Error {
    Error::UnsupportedImage(reason.to_string())
}

/// Decode an image XObject into a gray or RGB image.
pub fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let int = |key: &[u8]| dict.get(key).ok().and_then(|o| o.as_i64().ok());
    let width = int(b"Width").filter(|&w| w > 0).ok_or_else(|| unsupported("missing /Width"))? as u32;
    let height = int(b"Height").filter(|&h| h > 0).ok_or_else(|| unsupported("missing /Height"))? as u32;

    let data = match decode_stream(doc, stream)? {
        ImageData::Jpeg(bytes) => {
            return Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?);
        }
        ImageData::Samples(data) => data,
    };

    let is_mask = dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false);
    let (color_space, bpc) = if is_mask {
        (ColorSpace::Gray, 1)
    } else {
        let cs = match dict.get(b"ColorSpace") {
            Ok(obj) => ColorSpace::resolve(doc, obj)?,
            Err(_) => return Err(unsupported("missing /ColorSpace")),
        };
        (cs, int(b"BitsPerComponent").unwrap_or(8) as u32)
    };
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(unsupported(&format!("{} bits per component", bpc)));
    }

    let components = color_space.components();
    let mut samples = unpack_samples(&data, width, height, components, bpc)?;

    let is_indexed = matches!(color_space, ColorSpace::Indexed { .. });
    if !is_indexed {
        scale_to_u8(&mut samples, bpc);
    }

    let decode: Vec<f32> = dict
        .get(b"Decode")
        .ok()
        .and_then(|d| d.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| match o {
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(r) => Some(*r),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    if !is_indexed {
        invert_components(&mut samples, components, &decode);
    }

    to_image(width, height, &color_space, &samples)
}

/// Unpack byte-aligned rows into one value per component.
fn unpack_samples(data: &[u8], width: u32, height: u32, components: usize, bpc: u32) -> Result<Vec<u16>> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * bpc as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(unsupported(&format!(
            "image data too short ({} of {} bytes)",
            data.len(),
            needed
        )));
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data.chunks(row_bytes).take(height as usize) {
        match bpc {
            8 => samples.extend(row[..per_row].iter().map(|&b| b as u16)),
            16 => samples.extend(
                row.chunks_exact(2)
                    .take(per_row)
                    .map(|c| u16::from_be_bytes([c[0], c[1]])),
            ),
            _ => {
                let per_byte = 8 / bpc as usize;
                let mask = (1u16 << bpc) - 1;
                for i in 0..per_row {
                    let byte = row[i / per_byte] as u16;
                    let shift = 8 - bpc as usize * (i % per_byte + 1);
                    samples.push((byte >> shift) & mask);
                }
            }
        }
    }
    Ok(samples)
}

fn scale_to_u8(samples: &mut [u16], bpc: u32) {
    match bpc {
        8 => {}
        16 => samples.iter_mut().for_each(|s| *s >>= 8),
        _ => {
            let max = (1u16 << bpc) - 1;
            samples.iter_mut().for_each(|s| *s = *s * 255 / max);
        }
    }
}

/// Apply inverted `/Decode` ranges such as `[1 0]`.
fn invert_components(samples: &mut [u16], components: usize, decode: &[f32]) {
    let inverted: Vec<bool> = (0..components)
        .map(|c| match (decode.get(2 * c), decode.get(2 * c + 1)) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        })
        .collect();
    if !inverted.iter().any(|&i| i) {
        return;
    }
    for (i, s) in samples.iter_mut().enumerate() {
        if inverted[i % components] {
            *s = 255 - *s;
        }
    }
}

fn to_image(width: u32, height: u32, color_space: &ColorSpace, samples: &[u16]) -> Result<DynamicImage> {
    let pixels = width as usize * height as usize;
    let image = match color_space {
        ColorSpace::Gray => DynamicImage::ImageLuma8(gray_buffer(width, height, samples.iter().map(|&s| s as u8))?),
        ColorSpace::Separation => {
            DynamicImage::ImageLuma8(gray_buffer(width, height, samples.iter().map(|&s| 255 - s as u8))?)
        }
        ColorSpace::Rgb => {
            DynamicImage::ImageRgb8(rgb_buffer(width, height, samples.iter().map(|&s| s as u8).collect())?)
        }
        ColorSpace::Cmyk => {
            let mut rgb = Vec::with_capacity(pixels * 3);
            for px in samples.chunks_exact(4) {
                rgb.extend_from_slice(&cmyk_to_rgb(px[0] as u8, px[1] as u8, px[2] as u8, px[3] as u8));
            }
            DynamicImage::ImageRgb8(rgb_buffer(width, height, rgb)?)
        }
        ColorSpace::Indexed { base, hival, lookup } => {
            let n = base.components();
            let mut base_samples = Vec::with_capacity(pixels * n);
            for &index in samples {
                let index = index.min(*hival as u16) as usize;
                for c in 0..n {
                    base_samples.push(lookup.get(index * n + c).copied().unwrap_or(0) as u16);
                }
            }
            return to_image(width, height, base, &base_samples);
        }
    };
    Ok(image)
}

fn gray_buffer(width: u32, height: u32, values: impl Iterator<Item = u8>) -> Result<GrayImage> {
    ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, values.collect())
        .ok_or_else(|| unsupported("pixel buffer size mismatch"))
}

fn rgb_buffer(width: u32, height: u32, values: Vec<u8>) -> Result<RgbImage> {
    ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, values)
        .ok_or_else(|| unsupported("pixel buffer size mismatch"))
}

/// Naive CMYK to RGB conversion.
pub fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - k as u16;
    let r = (255 - c as u16) * k / 255;
    let g = (255 - m as u16) * k / 255;
    let b = (255 - y as u16) * k / 255;
    [r as u8, g as u8, b as u8]
}
