use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{CentaurError, Result};
use crate::frame::Frame;

/// A parsed header card value.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            // Some capture programs quote numbers.
            Self::Text(s) => s.trim().parse().ok(),
            Self::Logical(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Text rendering of the value; numbers are formatted, logicals become T/F.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Logical(b) => if *b { "T" } else { "F" }.to_string(),
        }
    }
}

/// Keyword/value cards of one header, in file order.
#[derive(Clone, Debug, Default)]
pub struct FitsHeader {
    cards: Vec<(String, HeaderValue)>,
}

impl FitsHeader {
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    /// Trimmed, non-empty text value of a keyword.
    pub fn get_text(&self, key: &str) -> Option<String> {
        let text = self.get(key)?.to_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// First keyword of `keys` that is present, as a float.
    pub fn first_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.get_f64(k))
    }

    /// First keyword of `keys` that is present, as text.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get_text(k))
    }

    pub fn insert(&mut self, key: &str, value: HeaderValue) {
        let key = key.to_ascii_uppercase();
        match self.cards.iter_mut().find(|(k, _)| *k == key) {
            Some(card) => card.1 = value,
            None => self.cards.push((key, value)),
        }
    }

    /// Copy cards from `other` whose keywords are missing here.
    pub fn absorb(&mut self, other: &FitsHeader) {
        for (key, value) in &other.cards {
            if !self.contains(key) {
                self.cards.push((key.clone(), value.clone()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Geometry and sample encoding of the image data unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageLayout {
    pub bitpix: i32,
    pub width: usize,
    pub height: usize,
    pub planes: usize,
    pub bzero: f64,
    pub bscale: f64,
}

impl ImageLayout {
    pub fn bytes_per_sample(&self) -> usize {
        (self.bitpix.unsigned_abs() / 8) as usize
    }

    /// Bytes of one 2-D plane, or `None` when the axes overflow.
    pub fn plane_byte_size(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.bytes_per_sample())
    }

    /// Bytes of the whole data unit, before block padding.
    pub fn data_byte_size(&self) -> Option<usize> {
        self.plane_byte_size()?.checked_mul(self.planes)
    }
}

enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => m,
            Self::Owned(v) => v,
        }
    }
}

/// FITS image reader for the primary HDU, or the first IMAGE extension when
/// the primary HDU carries no data.
pub struct FitsReader {
    storage: Storage,
    path: PathBuf,
    /// Primary header, with keywords of the image extension filled in when one is used.
    pub header: FitsHeader,
    pub layout: ImageLayout,
    data_offset: usize,
    plane_bytes: usize,
}

impl FitsReader {
    /// Memory-map a FITS file and parse its headers.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CentaurError::unreadable(path, e.to_string()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| CentaurError::unreadable(path, e.to_string()))?;
        Self::parse(Storage::Mapped(mmap), path)
    }

    /// Parse a FITS file already read into memory. `path` is used for error messages.
    pub fn from_bytes(bytes: Vec<u8>, path: &Path) -> Result<Self> {
        Self::parse(Storage::Owned(bytes), path)
    }

    fn parse(storage: Storage, path: &Path) -> Result<Self> {
        if storage.len() < FITS_BLOCK_SIZE {
            return Err(CentaurError::unreadable(path, "File too small for a FITS header"));
        }
        if !storage.starts_with(b"SIMPLE  =") {
            return Err(CentaurError::unreadable(path, "Missing SIMPLE keyword"));
        }

        let (mut header, primary_end) = parse_header(&storage, 0, path)?;
        let primary_layout = parse_layout(&header, path)?;

        let (layout, data_offset) = match primary_layout {
            Some(layout) => (layout, primary_end),
            None => {
                let ext_offset = primary_end;
                if storage.len().saturating_sub(ext_offset) < FITS_BLOCK_SIZE {
                    return Err(CentaurError::unreadable(path, "No image data in FITS file"));
                }
                let (ext_header, ext_end) = parse_header(&storage, ext_offset, path)?;
                let is_image = ext_header
                    .get_text("XTENSION")
                    .is_some_and(|x| x.eq_ignore_ascii_case("IMAGE"));
                if !is_image {
                    return Err(CentaurError::unreadable(
                        path,
                        "First extension is not an IMAGE HDU",
                    ));
                }
                let layout = parse_layout(&ext_header, path)?.ok_or_else(|| {
                    CentaurError::unreadable(path, "No image data in FITS file")
                })?;
                header.absorb(&ext_header);
                (layout, ext_end)
            }
        };

        let overflow = || CentaurError::unreadable(path, "image size overflows");
        let plane_bytes = layout.plane_byte_size().ok_or_else(overflow)?;
        let needed = layout
            .data_byte_size()
            .and_then(|size| size.checked_add(data_offset))
            .ok_or_else(overflow)?;
        if storage.len() < needed {
            return Err(CentaurError::unreadable(
                path,
                format!(
                    "File truncated: expected at least {} bytes, got {}",
                    needed,
                    storage.len()
                ),
            ));
        }

        Ok(Self {
            storage,
            path: path.to_path_buf(),
            header,
            layout,
            data_offset,
            plane_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the first image plane into ADU values.
    pub fn read_frame(&self) -> Result<Frame> {
        let raw = &self.storage[self.data_offset..self.data_offset + self.plane_bytes];
        let data = decode_plane(raw, &self.layout, &self.path)?;
        Ok(Frame::new(data, self.layout.bitpix))
    }
}

/// Parse header cards starting at `offset`. Returns the header and the offset of
/// the block following the END card.
fn parse_header(buf: &[u8], offset: usize, path: &Path) -> Result<(FitsHeader, usize)> {
    let mut header = FitsHeader::default();
    let mut pos = offset;

    while pos + FITS_CARD_SIZE <= buf.len() {
        let card = &buf[pos..pos + FITS_CARD_SIZE];
        pos += FITS_CARD_SIZE;

        let keyword = String::from_utf8_lossy(&card[..8]).trim_end().to_string();
        if keyword == "END" {
            let block_end = pos.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
            return Ok((header, block_end));
        }
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }
        if &card[8..10] != b"= " {
            continue;
        }
        let value_field = String::from_utf8_lossy(&card[10..]);
        if let Some(value) = parse_value(&value_field) {
            header.insert(&keyword, value);
        }
    }

    Err(CentaurError::unreadable(path, "Header has no END card"))
}

fn parse_value(field: &str) -> Option<HeaderValue> {
    let trimmed = field.trim_start();
    if let Some(rest) = trimmed.strip_prefix('\'') {
        return Some(HeaderValue::Text(parse_quoted(rest)));
    }

    let token = trimmed.split('/').next().unwrap_or("").trim();
    if token.is_empty() {
        return None;
    }
    match token {
        "T" => return Some(HeaderValue::Logical(true)),
        "F" => return Some(HeaderValue::Logical(false)),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Some(HeaderValue::Integer(i));
    }
    if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
        return Some(HeaderValue::Float(f));
    }
    Some(HeaderValue::Text(token.to_string()))
}

/// Read a quoted string body; `''` is an escaped quote, trailing blanks are insignificant.
fn parse_quoted(rest: &str) -> String {
    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out.trim_end().to_string()
}

/// Image layout of an HDU, or `None` when it has no data (NAXIS = 0).
fn parse_layout(header: &FitsHeader, path: &Path) -> Result<Option<ImageLayout>> {
    let raw_bitpix = header
        .get_i64("BITPIX")
        .ok_or_else(|| CentaurError::unreadable(path, "Missing BITPIX"))?;
    let bitpix = i32::try_from(raw_bitpix).map_err(|_| {
        CentaurError::unreadable(path, format!("Unsupported BITPIX: {}", raw_bitpix))
    })?;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(CentaurError::unreadable(
            path,
            format!("Unsupported BITPIX: {}", bitpix),
        ));
    }

    let naxis = header
        .get_i64("NAXIS")
        .ok_or_else(|| CentaurError::unreadable(path, "Missing NAXIS"))?;
    if naxis == 0 {
        return Ok(None);
    }
    if !(2..=3).contains(&naxis) {
        return Err(CentaurError::malformed(
            path,
            format!("Unsupported NAXIS: {}", naxis),
        ));
    }

    let axis = |n: i64| -> Result<usize> {
        let key = format!("NAXIS{}", n);
        match header.get_i64(&key) {
            Some(v) if v >= 0 => usize::try_from(v)
                .map_err(|_| CentaurError::unreadable(path, "image size overflows")),
            Some(v) => Err(CentaurError::malformed(path, format!("{} = {}", key, v))),
            None => Err(CentaurError::unreadable(path, format!("Missing {}", key))),
        }
    };
    let width = axis(1)?;
    let height = axis(2)?;
    let planes = if naxis == 3 { axis(3)? } else { 1 };
    if width == 0 || height == 0 || planes == 0 {
        return Ok(None);
    }

    Ok(Some(ImageLayout {
        bitpix,
        width,
        height,
        planes,
        bzero: header.get_f64("BZERO").unwrap_or(0.0),
        bscale: header.get_f64("BSCALE").unwrap_or(1.0),
    }))
}

fn decode_plane(raw: &[u8], layout: &ImageLayout, path: &Path) -> Result<Array2<f32>> {
    let bps = layout.bytes_per_sample();
    let (bzero, bscale) = (layout.bzero, layout.bscale);
    let sample: fn(&[u8]) -> f64 = match layout.bitpix {
        8 => |b| b[0] as f64,
        16 => |b| BigEndian::read_i16(b) as f64,
        32 => |b| BigEndian::read_i32(b) as f64,
        64 => |b| BigEndian::read_i64(b) as f64,
        -32 => |b| BigEndian::read_f32(b) as f64,
        -64 => |b| BigEndian::read_f64(b),
        other => {
            return Err(CentaurError::unreadable(
                path,
                format!("Unsupported BITPIX: {}", other),
            ))
        }
    };

    let values: Vec<f32> = raw
        .chunks_exact(bps)
        .map(|chunk| (bzero + bscale * sample(chunk)) as f32)
        .collect();

    Array2::from_shape_vec((layout.height, layout.width), values)
        .map_err(|e| CentaurError::unreadable(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_kinds() {
        assert_eq!(parse_value(" 300.0 / exposure"), Some(HeaderValue::Float(300.0)));
        assert_eq!(parse_value("                  16"), Some(HeaderValue::Integer(16)));
        assert_eq!(parse_value("                   T"), Some(HeaderValue::Logical(true)));
        assert_eq!(parse_value(" 1.5D2"), Some(HeaderValue::Float(150.0)));
        assert_eq!(
            parse_value(" 'Ha      '           / filter"),
            Some(HeaderValue::Text("Ha".into()))
        );
        assert_eq!(
            parse_value(" 'O''Brien'"),
            Some(HeaderValue::Text("O'Brien".into()))
        );
        assert_eq!(parse_value("   / only a comment"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut header = FitsHeader::default();
        header.insert("exptime", HeaderValue::Float(120.0));
        assert_eq!(header.get_f64("EXPTIME"), Some(120.0));
        assert_eq!(header.first_f64(&["EXPOSURE", "EXPTIME"]), Some(120.0));
    }

    #[test]
    fn test_absorb_keeps_existing_values() {
        let mut primary = FitsHeader::default();
        primary.insert("OBJECT", HeaderValue::Text("M42".into()));
        let mut ext = FitsHeader::default();
        ext.insert("OBJECT", HeaderValue::Text("other".into()));
        ext.insert("GAIN", HeaderValue::Float(0.8));
        primary.absorb(&ext);
        assert_eq!(primary.get_text("OBJECT").as_deref(), Some("M42"));
        assert_eq!(primary.get_f64("GAIN"), Some(0.8));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_layout_size_overflow_is_none() {
        let layout = ImageLayout {
            bitpix: 8,
            width: 1 << 32,
            height: 1 << 31,
            planes: 2,
            bzero: 0.0,
            bscale: 1.0,
        };
        assert_eq!(layout.plane_byte_size(), Some(1 << 63));
        assert_eq!(layout.data_byte_size(), None);

        let wide = ImageLayout { width: usize::MAX, height: 2, ..layout };
        assert_eq!(wide.plane_byte_size(), None);
    }
}
