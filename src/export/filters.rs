//! Stream filter decoding for image data.
//!
//! `lopdf` refuses to decompress image streams, so the filter chain is
//! walked here. The last filter may be an image codec; those are handed
//! back undecoded for the pixmap stage.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::warn;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::{Error, Result};

/// Stream data after all non-image filters have been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// Raw samples, row by row.
    Samples(Vec<u8>),
    /// A baseline or progressive JPEG file.
    Jpeg(Vec<u8>),
}

/// Decode the filter chain of a stream.
pub fn decode_stream(doc: &Document, stream: &Stream) -> Result<ImageData> {
    let filters = filter_names(doc, stream.dict.get(b"Filter").ok());
    let params = decode_params(doc, stream.dict.get(b"DecodeParms").ok(), filters.len());

    let mut data = stream.content.clone();
    for (i, filter) in filters.iter().enumerate() {
        let params = params.get(i).copied().flatten();
        data = match filter.as_str() {
            "FlateDecode" | "Fl" => apply_predictor(inflate(&data)?, params)?,
            "LZWDecode" | "LZW" => lzw_via_lopdf(data, params)?,
            "ASCIIHexDecode" | "AHx" => ascii_hex(&data)?,
            "ASCII85Decode" | "A85" => ascii85(&data)?,
            "RunLengthDecode" | "RL" => run_length(&data),
            "DCTDecode" | "DCT" => return Ok(ImageData::Jpeg(data)),
            other => return Err(Error::UnsupportedImage(format!("{} filter", other))),
        };
    }
    Ok(ImageData::Samples(data))
}

fn filter_names(doc: &Document, filter: Option<&Object>) -> Vec<String> {
    let Some(filter) = filter.and_then(|f| doc.dereference(f).ok()).map(|(_, f)| f) else {
        return Vec::new();
    };
    match filter {
        Object::Name(n) => vec![String::from_utf8_lossy(n).to_string()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// `/DecodeParms` is a dictionary for a single filter or an array parallel to `/Filter`.
fn decode_params<'a>(doc: &'a Document, params: Option<&'a Object>, count: usize) -> Vec<Option<&'a Dictionary>> {
    let resolve = |o: &'a Object| doc.dereference(o).ok().and_then(|(_, o)| o.as_dict().ok());
    let Some(params) = params.and_then(|p| doc.dereference(p).ok()).map(|(_, p)| p) else {
        return vec![None; count];
    };
    match params {
        Object::Array(arr) => (0..count).map(|i| arr.get(i).and_then(resolve)).collect(),
        Object::Dictionary(d) => {
            let mut v = vec![None; count];
            if let Some(first) = v.first_mut() {
                *first = Some(d);
            }
            v
        }
        _ => vec![None; count],
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        // Truncated streams are common; keep what was recovered.
        Err(e) if !out.is_empty() => {
            warn!("Flate stream ended early: {}", e);
            Ok(out)
        }
        Err(e) => Err(Error::UnsupportedImage(format!("corrupt Flate data: {}", e))),
    }
}

fn param(params: Option<&Dictionary>, key: &[u8], default: i64) -> i64 {
    params
        .and_then(|p| p.get(key).ok())
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(default)
}

/// Undo PNG (10..15) or TIFF (2) prediction.
pub fn apply_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let predictor = param(params, b"Predictor", 1);
    if predictor < 2 {
        return Ok(data);
    }
    let colors = param(params, b"Colors", 1).max(1) as usize;
    let bpc = param(params, b"BitsPerComponent", 8).max(1) as usize;
    let columns = param(params, b"Columns", 1).max(1) as usize;
    let bpp = (colors * bpc).div_ceil(8).max(1);
    let row_len = (columns * colors * bpc).div_ceil(8);

    if predictor == 2 {
        return Ok(tiff_predictor(data, row_len, colors, bpc));
    }

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks(row_len + 1) {
        if chunk.len() < 2 {
            break;
        }
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);
        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(Error::UnsupportedImage(format!("PNG predictor row type {}", other)))
                }
            };
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn tiff_predictor(mut data: Vec<u8>, row_len: usize, colors: usize, bpc: usize) -> Vec<u8> {
    if bpc != 8 {
        warn!("TIFF predictor with {} bits per component left as is", bpc);
        return data;
    }
    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    data
}

/// LZW is decoded by `lopdf` on a copy that does not look like an image.
fn lzw_via_lopdf(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(b"LZWDecode".to_vec()));
    if let Some(params) = params {
        dict.set("DecodeParms", Object::Dictionary(params.clone()));
    }
    Stream::new(dict, data)
        .decompressed_content()
        .map_err(|e| Error::UnsupportedImage(format!("LZW data: {}", e)))
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        let v = (b as char)
            .to_digit(16)
            .ok_or_else(|| Error::UnsupportedImage("invalid ASCIIHex data".to_string()))?
            as u8;
        match high.take() {
            Some(h) => out.push(h << 4 | v),
            None => high = Some(v),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn ascii85(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut n = 0;
    let body = data.strip_prefix(b"<~").unwrap_or(data);
    for &b in body {
        match b {
            b'~' => break,
            b'z' if n == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    out.extend_from_slice(&ascii85_group(&group));
                    n = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            _ => return Err(Error::UnsupportedImage("invalid ASCII85 data".to_string())),
        }
    }
    if n > 1 {
        for slot in group.iter_mut().skip(n) {
            *slot = 84;
        }
        out.extend_from_slice(&ascii85_group(&group)[..n - 1]);
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> [u8; 4] {
    let value = group
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + d as u64)
        .min(u32::MAX as u64) as u32;
    value.to_be_bytes()
}

fn run_length(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let end = (i + len as usize + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&b) = data.get(i) {
                    out.extend(std::iter::repeat(b).take(257 - len as usize));
                }
                i += 1;
            }
        }
    }
    out
}
