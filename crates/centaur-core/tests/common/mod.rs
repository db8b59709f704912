use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use centaur_core::config::CentaurConfig;
use centaur_core::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};

/// A header keyword value for synthetic FITS files.
#[derive(Clone, Debug)]
pub enum Kw {
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Format one 80-byte header card.
pub fn card(key: &str, value: &Kw) -> String {
    let value = match value {
        Kw::Str(s) => format!("'{:<8}'", s.replace('\'', "''")),
        Kw::Int(i) => format!("{i:>20}"),
        Kw::Float(f) => format!("{:>20}", format!("{f:E}")),
        Kw::Bool(b) => format!("{:>20}", if *b { "T" } else { "F" }),
    };
    let mut text = format!("{key:<8}= {value}");
    text.truncate(FITS_CARD_SIZE);
    format!("{text:<80}")
}

/// Header block(s) for `cards`, terminated by END and padded with spaces.
pub fn header_bytes(cards: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for c in cards {
        buf.extend_from_slice(c.as_bytes());
    }
    buf.extend_from_slice(format!("{:<80}", "END").as_bytes());
    pad(&mut buf, b' ');
    buf
}

fn pad(buf: &mut Vec<u8>, fill: u8) {
    let rem = buf.len() % FITS_BLOCK_SIZE;
    if rem != 0 {
        buf.resize(buf.len() + FITS_BLOCK_SIZE - rem, fill);
    }
}

fn structural_cards(first: (&str, Kw), bitpix: i64, dims: &[usize]) -> Vec<String> {
    let mut cards = vec![card(first.0, &first.1), card("BITPIX", &Kw::Int(bitpix))];
    cards.push(card("NAXIS", &Kw::Int(dims.len() as i64)));
    for (i, d) in dims.iter().enumerate() {
        cards.push(card(&format!("NAXIS{}", i + 1), &Kw::Int(*d as i64)));
    }
    cards
}

fn extra_cards(extra: &[(&str, Kw)]) -> Vec<String> {
    extra.iter().map(|(k, v)| card(k, v)).collect()
}

/// 16-bit unsigned FITS (BITPIX 16 with BZERO 32768). Values are rounded
/// and clamped to 0..=65535.
pub fn build_fits_u16(data: &Array2<f32>, extra: &[(&str, Kw)]) -> Vec<u8> {
    let (h, w) = data.dim();
    let mut cards = structural_cards(("SIMPLE", Kw::Bool(true)), 16, &[w, h]);
    cards.push(card("BZERO", &Kw::Int(32768)));
    cards.push(card("BSCALE", &Kw::Int(1)));
    cards.extend(extra_cards(extra));

    let mut buf = header_bytes(&cards);
    for &v in data.iter() {
        let adu = v.round().clamp(0.0, 65535.0) as i32;
        buf.extend_from_slice(&((adu - 32768) as i16).to_be_bytes());
    }
    pad(&mut buf, 0);
    buf
}

/// 32-bit float FITS (BITPIX -32).
pub fn build_fits_f32(data: &Array2<f32>, extra: &[(&str, Kw)]) -> Vec<u8> {
    let (h, w) = data.dim();
    let mut cards = structural_cards(("SIMPLE", Kw::Bool(true)), -32, &[w, h]);
    cards.extend(extra_cards(extra));

    let mut buf = header_bytes(&cards);
    for &v in data.iter() {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    pad(&mut buf, 0);
    buf
}

/// Empty primary HDU followed by a float IMAGE extension.
pub fn build_fits_extension(
    data: &Array2<f32>,
    primary_extra: &[(&str, Kw)],
    ext_extra: &[(&str, Kw)],
) -> Vec<u8> {
    let (h, w) = data.dim();
    let mut primary = structural_cards(("SIMPLE", Kw::Bool(true)), 8, &[]);
    primary.push(card("EXTEND", &Kw::Bool(true)));
    primary.extend(extra_cards(primary_extra));
    let mut buf = header_bytes(&primary);

    let mut ext = structural_cards(("XTENSION", Kw::Str("IMAGE")), -32, &[w, h]);
    ext.push(card("PCOUNT", &Kw::Int(0)));
    ext.push(card("GCOUNT", &Kw::Int(1)));
    ext.extend(extra_cards(ext_extra));
    buf.extend_from_slice(&header_bytes(&ext));
    for &v in data.iter() {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    pad(&mut buf, 0);
    buf
}

/// Deterministic sky with an exact mean and standard deviation: evenly
/// spaced levels (a discrete uniform distribution) scattered over the frame.
pub fn uniform_sky(h: usize, w: usize, mean: f32, std: f32) -> Array2<f32> {
    let n = h * w;
    let half_width = std * 3f32.sqrt();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let k = ((r * w + c) * 7919) % n;
        let t = 2.0 * (k as f32 + 0.5) / n as f32 - 1.0;
        mean + half_width * t
    })
}

/// Calibration keywords of the reference rig.
pub fn rig_keywords() -> Vec<(&'static str, Kw)> {
    vec![
        ("EXPTIME", Kw::Float(300.0)),
        ("GAIN", Kw::Float(1.0)),
        ("PIXSCALE", Kw::Float(1.2)),
        ("SATURATE", Kw::Int(65000)),
        ("FILTER", Kw::Str("Ha")),
        ("OBJECT", Kw::Str("NGC 7000")),
        ("INSTRUME", Kw::Str("ZWO ASI6200MM Pro")),
        ("TELESCOP", Kw::Str("Takahashi FSQ-106")),
    ]
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Configuration watching `watch` with no settle delay and fast polling.
pub fn test_config(watch: &Path, output: &Path) -> CentaurConfig {
    let mut config = CentaurConfig::default();
    config.watch.path = watch.to_path_buf();
    config.watch.output = output.to_path_buf();
    config.watch.poll_interval_secs = 1;
    config.watch.settle_secs = 0;
    config.watch.io_timeout_secs = 10;
    config
}

/// Header declaring a BITPIX 8 cube of 2^32 x 2^31 x 2 samples, followed by a
/// single data block.
pub fn build_fits_oversized() -> Vec<u8> {
    let cards = structural_cards(
        ("SIMPLE", Kw::Bool(true)),
        8,
        &[1usize << 32, 1usize << 31, 2],
    );
    let mut buf = header_bytes(&cards);
    buf.resize(buf.len() + FITS_BLOCK_SIZE, 0);
    buf
}
