// src/geo/format.rs
//! Locale-agnostic formatting and parsing of coordinates, altitude, speed and distance

use crate::config::Units;
use crate::error::{NavError, Result};

/// Fractional digits in decimal coordinate output (about 0.1 m)
pub const DECIMAL_DIGITS: usize = 6;

const HUNDREDTHS_PER_DEGREE: f64 = 360_000.0;
const FEET_PER_METER: f64 = 3.280_84;
const METERS_PER_MILE: f64 = 1_609.344;

fn format_decimal(value: f64) -> String {
    format!("{:.*}", DECIMAL_DIGITS, value)
}

fn format_dms(value: f64, positive: char, negative: char) -> String {
    // Work in hundredths of a second so rounding carries into minutes and degrees
    let total = (value.abs() * HUNDREDTHS_PER_DEGREE).round() as u64;
    let degrees = total / 360_000;
    let minutes = (total % 360_000) / 6_000;
    let hundredths = total % 6_000;
    let hemisphere = if value < 0.0 && total > 0 { negative } else { positive };

    format!(
        "{}°{:02}′{:02}.{:02}″{}",
        degrees,
        minutes,
        hundredths / 100,
        hundredths % 100,
        hemisphere
    )
}

/// Format a coordinate pair as one string
pub fn format_lat_lon(lat: f64, lon: f64, use_dms: bool) -> String {
    let [lat_s, lon_s] = format_lat_lon_to_arr(lat, lon, use_dms);
    if use_dms {
        format!("{} {}", lat_s, lon_s)
    } else {
        format!("{}, {}", lat_s, lon_s)
    }
}

/// Format latitude and longitude independently
pub fn format_lat_lon_to_arr(lat: f64, lon: f64, use_dms: bool) -> [String; 2] {
    if use_dms {
        [format_dms(lat, 'N', 'S'), format_dms(lon, 'E', 'W')]
    } else {
        [format_decimal(lat), format_decimal(lon)]
    }
}

fn parse_number(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| NavError::Parse(format!("Invalid number: '{}'", s)))
}

/// Parse one latitude or longitude in decimal or DMS notation
pub fn parse_coordinate_component(input: &str) -> Result<f64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(NavError::Parse("Empty coordinate".to_string()));
    }

    let (body, sign) = match s.chars().last() {
        Some('N') | Some('E') => (&s[..s.len() - 1], 1.0),
        Some('S') | Some('W') => (&s[..s.len() - 1], -1.0),
        _ => (s, 1.0),
    };

    if !body.contains('°') {
        return Ok(sign * parse_number(body)?);
    }

    let (deg, rest) = body
        .split_once('°')
        .ok_or_else(|| NavError::Parse(format!("Invalid DMS value: '{}'", input)))?;
    let (min, rest) = rest
        .split_once(|c: char| c == '′' || c == '\'')
        .ok_or_else(|| NavError::Parse(format!("Missing minutes in '{}'", input)))?;
    let sec = rest.trim_end_matches(|c: char| c == '″' || c == '"');

    let deg = parse_number(deg)?;
    let min = parse_number(min)?;
    let sec = parse_number(sec)?;
    if !(0.0..60.0).contains(&min) || !(0.0..60.0).contains(&sec) {
        return Err(NavError::Parse(format!("Minutes/seconds out of range in '{}'", input)));
    }

    let magnitude = deg.abs() + min / 60.0 + sec / 3_600.0;
    let sign = if deg < 0.0 { -sign } else { sign };
    Ok(sign * magnitude)
}

/// Parse the output of [`format_lat_lon`] in either mode
pub fn parse_lat_lon(input: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = if input.contains(',') {
        input.split(',').collect()
    } else {
        input.split_whitespace().collect()
    };

    if parts.len() != 2 {
        return Err(NavError::Parse(format!("Expected two components in '{}'", input)));
    }

    let lat = parse_coordinate_component(parts[0])?;
    let lon = parse_coordinate_component(parts[1])?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(NavError::InvalidCoordinate { lat, lon });
    }

    Ok((lat, lon))
}

pub fn format_altitude(meters: f64, units: Units) -> String {
    match units {
        Units::Metric => format!("{} m", meters.round() as i64),
        Units::Imperial => format!("{} ft", (meters * FEET_PER_METER).round() as i64),
    }
}

pub fn format_speed(meters_per_second: f64, units: Units) -> String {
    match units {
        Units::Metric => format!("{} km/h", (meters_per_second * 3.6).round() as i64),
        Units::Imperial => format!(
            "{} mph",
            (meters_per_second * 3_600.0 / METERS_PER_MILE).round() as i64
        ),
    }
}

/// Distance label with the unit switching at human-friendly thresholds
pub fn format_distance(meters: f64, units: Units) -> String {
    match units {
        Units::Metric => {
            if meters < 1_000.0 {
                format!("{} m", meters.round() as i64)
            } else if meters < 10_000.0 {
                format!("{:.1} km", meters / 1_000.0)
            } else {
                format!("{} km", (meters / 1_000.0).round() as i64)
            }
        }
        Units::Imperial => {
            let miles = meters / METERS_PER_MILE;
            if miles < 0.1 {
                format!("{} ft", (meters * FEET_PER_METER).round() as i64)
            } else if miles < 10.0 {
                format!("{:.1} mi", miles)
            } else {
                format!("{} mi", miles.round() as i64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECIMAL_PRECISION: f64 = 0.5e-6;
    const DMS_PRECISION: f64 = 0.005 / 3_600.0 + 1e-12;

    #[test]
    fn test_decimal_format() {
        assert_eq!(format_lat_lon(48.85837, 2.294481, false), "48.858370, 2.294481");
        assert_eq!(
            format_lat_lon_to_arr(-33.8688, 151.2093, false),
            ["-33.868800".to_string(), "151.209300".to_string()]
        );
    }

    #[test]
    fn test_dms_format() {
        assert_eq!(
            format_lat_lon(48.858370, 2.294481, true),
            "48°51′30.13″N 2°17′40.13″E"
        );
        assert_eq!(format_lat_lon(-33.5, -70.25, true), "33°30′00.00″S 70°15′00.00″W");
    }

    #[test]
    fn test_dms_rounding_carries() {
        // 59.9999 seconds rounds up into the next minute
        let v = 10.0 + 59.0 / 60.0 + 59.9999 / 3_600.0;
        assert_eq!(format_lat_lon_to_arr(v, 0.0, true)[0], "11°00′00.00″N");
    }

    #[test]
    fn test_roundtrip_including_boundaries() {
        let values = [
            (90.0, 180.0),
            (-90.0, -180.0),
            (0.0, 0.0),
            (45.123456789, -122.987654321),
            (-12.000001, 0.000001),
            (89.999999, 179.999999),
        ];

        for (lat, lon) in values {
            let (plat, plon) = parse_lat_lon(&format_lat_lon(lat, lon, false)).unwrap();
            assert!((plat - lat).abs() <= DECIMAL_PRECISION, "{} vs {}", plat, lat);
            assert!((plon - lon).abs() <= DECIMAL_PRECISION, "{} vs {}", plon, lon);

            let (plat, plon) = parse_lat_lon(&format_lat_lon(lat, lon, true)).unwrap();
            assert!((plat - lat).abs() <= DMS_PRECISION, "{} vs {}", plat, lat);
            assert!((plon - lon).abs() <= DMS_PRECISION, "{} vs {}", plon, lon);
        }
    }

    #[test]
    fn test_parse_ascii_dms() {
        let v = parse_coordinate_component("48°51'30.13\"N").unwrap();
        assert!((v - 48.858369).abs() < 1e-5);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_lat_lon("").is_err());
        assert!(parse_lat_lon("1.0").is_err());
        assert!(parse_lat_lon("91.0, 0.0").is_err());
        assert!(parse_coordinate_component("12°75′00.00″N").is_err());
        assert!(parse_coordinate_component("abc").is_err());
    }

    #[test]
    fn test_altitude_and_speed() {
        assert_eq!(format_altitude(123.4, Units::Metric), "123 m");
        assert_eq!(format_altitude(100.0, Units::Imperial), "328 ft");
        assert_eq!(format_speed(10.0, Units::Metric), "36 km/h");
        assert_eq!(format_speed(10.0, Units::Imperial), "22 mph");
    }

    #[test]
    fn test_distance() {
        assert_eq!(format_distance(420.4, Units::Metric), "420 m");
        assert_eq!(format_distance(1_260.0, Units::Metric), "1.3 km");
        assert_eq!(format_distance(25_400.0, Units::Metric), "25 km");
        assert_eq!(format_distance(100.0, Units::Imperial), "328 ft");
        assert_eq!(format_distance(3_218.688, Units::Imperial), "2.0 mi");
    }
}
