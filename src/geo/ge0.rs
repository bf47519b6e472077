// src/geo/ge0.rs
//! Compact share links encoding a map position, zoom and name
//!
//! Layout: `ge0://<zoom><position>/<name>` where `zoom` is one character,
//! `position` is ten characters carrying 30 bits of latitude and 30 bits of
//! longitude interleaved three bits at a time, and `name` is optional.

use crate::error::{NavError, Result};
use serde::Serialize;

pub const GE0_PREFIX: &str = "ge0://";
pub const HTTP_GE0_PREFIX: &str = "http://ge0.me/";

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const POSITION_CHARS: usize = 10;
const COORD_BITS: u32 = 30;
const MAX_COORD: f64 = ((1u32 << COORD_BITS) - 1) as f64;
const MIN_ZOOM: f64 = 4.0;
const MAX_ZOOM: f64 = 19.75;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ge0Link {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
    pub name: String,
}

fn char_value(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

fn encode_position(lat: f64, lon: f64, out: &mut String) {
    let lat_i = ((lat.clamp(-90.0, 90.0) + 90.0) / 180.0 * MAX_COORD).round() as u32;
    let lon_i = ((lon.clamp(-180.0, 180.0) + 180.0) / 360.0 * MAX_COORD).round() as u32;

    for i in 0..POSITION_CHARS as u32 {
        let shift = COORD_BITS - 3 * (i + 1);
        let la = (lat_i >> shift) & 7;
        let lo = (lon_i >> shift) & 7;
        let v = ((la & 4) << 3)
            | ((lo & 4) << 2)
            | ((la & 2) << 2)
            | ((lo & 2) << 1)
            | ((la & 1) << 1)
            | (lo & 1);
        out.push(ALPHABET[v as usize] as char);
    }
}

fn decode_position(chars: &[u8]) -> Result<(f64, f64)> {
    let mut lat_i = 0u32;
    let mut lon_i = 0u32;

    for &c in chars {
        let v = char_value(c)
            .ok_or_else(|| NavError::Parse(format!("Invalid ge0 character '{}'", c as char)))?;
        let la = ((v >> 3) & 4) | ((v >> 2) & 2) | ((v >> 1) & 1);
        let lo = ((v >> 2) & 4) | ((v >> 1) & 2) | (v & 1);
        lat_i = (lat_i << 3) | la;
        lon_i = (lon_i << 3) | lo;
    }

    let lat = lat_i as f64 / MAX_COORD * 180.0 - 90.0;
    let lon = lon_i as f64 / MAX_COORD * 360.0 - 180.0;
    Ok((lat, lon))
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

// Spaces and underscores trade places so the common case stays readable
fn swap_space_underscore(c: char) -> char {
    match c {
        ' ' => '_',
        '_' => ' ',
        other => other,
    }
}

fn encode_name(name: &str) -> String {
    let swapped: String = name.chars().map(swap_space_underscore).collect();
    let mut out = String::with_capacity(swapped.len());
    for b in swapped.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_name(encoded: &str) -> Result<String> {
    let bytes = encoded.as_bytes();
    let mut raw = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded
                .get(i + 1..i + 3)
                .ok_or_else(|| NavError::Parse("Truncated percent escape".to_string()))?;
            let b = u8::from_str_radix(hex, 16)
                .map_err(|_| NavError::Parse(format!("Invalid percent escape '%{}'", hex)))?;
            raw.push(b);
            i += 3;
        } else {
            raw.push(bytes[i]);
            i += 1;
        }
    }

    let decoded = String::from_utf8(raw)
        .map_err(|e| NavError::Parse(format!("Name is not UTF-8: {}", e)))?;
    Ok(decoded.chars().map(swap_space_underscore).collect())
}

/// Build a `ge0://` link
pub fn generate_ge0_url(lat: f64, lon: f64, zoom: f64, name: &str) -> String {
    let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    let zoom_i = ((zoom - MIN_ZOOM) * 4.0).round() as usize;

    let mut url = String::from(GE0_PREFIX);
    url.push(ALPHABET[zoom_i.min(63)] as char);
    encode_position(lat, lon, &mut url);

    if !name.is_empty() {
        url.push('/');
        url.push_str(&encode_name(name));
    }
    url
}

/// Same link with the web-resolvable prefix
pub fn http_ge0_url(lat: f64, lon: f64, zoom: f64, name: &str) -> String {
    let url = generate_ge0_url(lat, lon, zoom, name);
    url.replacen(GE0_PREFIX, HTTP_GE0_PREFIX, 1)
}

/// Parse a link produced by [`generate_ge0_url`] or [`http_ge0_url`]
pub fn decode_ge0_url(url: &str) -> Result<Ge0Link> {
    let body = url
        .strip_prefix(GE0_PREFIX)
        .or_else(|| url.strip_prefix(HTTP_GE0_PREFIX))
        .ok_or_else(|| NavError::Parse(format!("Not a ge0 link: '{}'", url)))?;

    let (code, name) = match body.split_once('/') {
        Some((code, name)) => (code, name),
        None => (body, ""),
    };

    let code = code.as_bytes();
    if code.len() != POSITION_CHARS + 1 {
        return Err(NavError::Parse(format!(
            "ge0 code must be {} characters, got {}",
            POSITION_CHARS + 1,
            code.len()
        )));
    }

    let zoom_i = char_value(code[0])
        .ok_or_else(|| NavError::Parse("Invalid ge0 zoom character".to_string()))?;
    let (lat, lon) = decode_position(&code[1..])?;

    Ok(Ge0Link {
        lat,
        lon,
        zoom: MIN_ZOOM + zoom_i as f64 / 4.0,
        name: decode_name(name)?,
    })
}
