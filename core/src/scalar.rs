//! Scalar parsing helpers that have no ecosystem type in this workspace:
//! colors, IP prefixes, Go-style durations, time layouts, hex bytes, and
//! escaped lists.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime, ParseError, TimeDelta};
use serde::{Deserialize, Serialize};

/// An RGBA color.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, and
/// `rgba(r, g, b, a)` with 0-255 components. Renders as `#rrggbb`, or
/// `#rrggbbaa` when not fully opaque.
///
/// # Examples
///
/// ```
/// use argot_core::Color;
///
/// let c: Color = "rgb(255, 0, 136)".parse().unwrap();
/// assert_eq!(c.to_string(), "#ff0088");
/// assert_eq!("#f08".parse::<Color>().unwrap(), c);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex_color(hex);
        }
        let lower = s.to_ascii_lowercase();
        let (body, with_alpha) = if let Some(body) = lower.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = lower.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err("expected #hex, rgb(), or rgba()".to_string());
        };
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| "missing closing parenthesis".to_string())?;
        let parts = body
            .split(',')
            .map(|p| p.trim().parse::<u8>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        match (parts.as_slice(), with_alpha) {
            ([r, g, b], false) => Ok(Self {
                r: *r,
                g: *g,
                b: *b,
                a: 255,
            }),
            ([r, g, b, a], true) => Ok(Self {
                r: *r,
                g: *g,
                b: *b,
                a: *a,
            }),
            _ => Err("wrong number of components".to_string()),
        }
    }
}

fn parse_hex_color(hex: &str) -> Result<Color, String> {
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return Err(format!("invalid hex color length {}", hex.len())),
    };
    let bytes = decode_hex(&expanded)?;
    Ok(Color {
        r: bytes[0],
        g: bytes[1],
        b: bytes[2],
        a: bytes.get(3).copied().unwrap_or(255),
    })
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// An IP network prefix such as `10.0.0.0/8` or `fd00::/64`.
///
/// Host bits are kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl FromStr for Prefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| "missing prefix length".to_string())?;
        let addr: IpAddr = addr.parse().map_err(|e: std::net::AddrParseError| e.to_string())?;
        let len: u8 = len.parse().map_err(|_| format!("invalid prefix length {len:?}"))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if len > max {
            return Err(format!("prefix length {len} exceeds {max}"));
        }
        Ok(Self { addr, len })
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;
const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MIN;

/// Parses a Go-style duration: an optional sign followed by one or more
/// `<number><unit>` groups, units `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
/// A bare `0` is accepted.
pub fn parse_duration(s: &str) -> Result<TimeDelta, String> {
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {s:?}"))?;
        if digits_end == 0 {
            return Err(format!("expected number in duration {s:?}"));
        }
        let number = &rest[..digits_end];
        rest = &rest[digits_end..];
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = match &rest[..unit_end] {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            other => return Err(format!("unknown unit {other:?} in duration {s:?}")),
        };
        rest = &rest[unit_end..];
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(format!("invalid number in duration {s:?}"));
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("invalid number in duration {s:?}"))?
        };
        let out_of_range = || format!("duration {s:?} out of range");
        total = whole
            .checked_mul(u128::from(unit))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(out_of_range)?;
        if !frac.is_empty() {
            let frac_digits = frac.len().min(18);
            let frac_value: u128 = frac[..frac_digits]
                .parse()
                .map_err(|_| format!("invalid fraction in duration {s:?}"))?;
            total = frac_value
                .checked_mul(u128::from(unit))
                .map(|n| n / 10u128.pow(frac_digits as u32))
                .and_then(|n| total.checked_add(n))
                .ok_or_else(out_of_range)?;
        }
        if total > i64::MAX as u128 {
            return Err(out_of_range());
        }
    }
    let nanos = total as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Checks that `layout` is a valid chrono strftime layout.
pub fn check_layout(layout: &str) -> Result<(), String> {
    if layout.is_empty() {
        return Err("empty layout".to_string());
    }
    if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid layout {layout:?}"));
    }
    Ok(())
}

/// Parses a timestamp with a strftime layout. Layouts without an offset
/// read the time as UTC.
///
/// # Examples
///
/// ```
/// use argot_core::scalar::parse_timestamp;
///
/// let t = parse_timestamp("02/01/2024 03:04", "%d/%m/%Y %H:%M").unwrap();
/// assert_eq!(t.to_rfc3339(), "2024-01-02T03:04:00+00:00");
/// ```
pub fn parse_timestamp(s: &str, layout: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_str(s, layout).or_else(|err| {
        NaiveDateTime::parse_from_str(s, layout)
            .map(|t| t.and_utc().fixed_offset())
            .map_err(|_| err)
    })
}

/// Renders chrono's delayed formatting, yielding an empty string when the
/// value lacks a field the layout asks for.
pub fn strftime(formatted: impl fmt::Display) -> String {
    use fmt::Write;

    let mut out = String::new();
    if write!(out, "{formatted}").is_err() {
        out.clear();
    }
    out
}

/// Formats a duration the way Go's `time.Duration` does (`1h30m0s`,
/// `1.5s`, `250ms`, `0s`).
pub fn format_duration(d: TimeDelta) -> String {
    let nanos = d.num_nanoseconds().unwrap_or(i64::MAX);
    if nanos == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let n = nanos.unsigned_abs();
    if n < NANOS_PER_SEC {
        let (scale, unit) = if n < NANOS_PER_MICRO {
            (1, "ns")
        } else if n < NANOS_PER_MILLI {
            (NANOS_PER_MICRO, "µs")
        } else {
            (NANOS_PER_MILLI, "ms")
        };
        out.push_str(&format_fraction(n, scale));
        out.push_str(unit);
        return out;
    }
    let hours = n / NANOS_PER_HOUR;
    let minutes = (n % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let seconds = n % NANOS_PER_MIN;
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format_fraction(seconds, NANOS_PER_SEC));
    out.push('s');
    out
}

fn format_fraction(value: u64, scale: u64) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Decodes a hex string (either case) into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex byte at offset {i}"))
        })
        .collect()
}

/// Encodes bytes as lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses a boolean the way Go's `strconv.ParseBool` does.
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("expected a boolean".to_string()),
    }
}

/// Splits `s` on `sep`, treating a backslash as an escape for the next
/// character.
///
/// # Examples
///
/// ```
/// use argot_core::scalar::split_escaped;
///
/// assert_eq!(split_escaped(r"a\,b,c", ','), vec!["a,b", "c"]);
/// ```
pub fn split_escaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => push_char(&mut parts, next),
                None => push_char(&mut parts, '\\'),
            },
            c if c == sep => parts.push(String::new()),
            c => push_char(&mut parts, c),
        }
    }
    parts
}

fn push_char(parts: &mut [String], c: char) {
    if let Some(last) = parts.last_mut() {
        last.push(c);
    }
}

/// Escapes `sep` and backslashes so that [`split_escaped`] recovers `s`.
pub fn escape(s: &str, sep: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == sep {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
