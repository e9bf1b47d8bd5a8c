//! Type descriptors and the closed set of typed flag values.
//!
//! A [`Type`] names what a flag holds; [`Type::new_value`] builds the zero
//! [`Value`] for it. Values are assigned from command-line text with
//! [`Value::set`] and rendered back with [`Value::render`]. Scalars
//! overwrite on every assignment, while [`Type::Slice`] and [`Type::Map`]
//! accumulate.
//!
//! # Examples
//!
//! ```
//! use argot_core::{Type, Value};
//!
//! let mut depth = Type::Int.new_value().unwrap();
//! depth.set("42").unwrap();
//! assert_eq!(depth.render(), "42");
//!
//! let mut tags = Value::slice(Type::String).unwrap();
//! tags.set("a,b").unwrap();
//! tags.set("c").unwrap();
//! assert_eq!(tags.as_slice().map(|items| items.len()), Some(3));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use bigdecimal::BigDecimal;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use num_bigint::BigInt;
use num_complex::Complex;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::command::CommandRef;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::scalar::{self, Color, Prefix};

/// Default layout accepted and produced by [`Type::DateTime`].
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
/// Default layout accepted and produced by [`Type::Date`].
pub const DATE_LAYOUT: &str = "%Y-%m-%d";
/// Default layout accepted and produced by [`Type::Time`].
pub const TIME_LAYOUT: &str = "%H:%M:%S";

/// Type descriptor for a flag.
///
/// Serializes to the lowercase descriptor name (`"int64"`, `"addrport"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    String,
    Bytes,
    Base64,
    Hex,
    Bool,
    Byte,
    Rune,
    Int,
    Int64,
    Int32,
    Int16,
    Int8,
    Uint,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
    Float64,
    Float32,
    Complex128,
    Complex64,
    BigInt,
    BigRat,
    /// Arbitrary precision decimal.
    BigFloat,
    /// RFC 3339 timestamp.
    Timestamp,
    /// `YYYY-MM-DD HH:MM:SS`.
    DateTime,
    Date,
    Time,
    /// Go-style duration such as `1h30m` or `250ms`.
    Duration,
    /// IP address.
    Addr,
    /// IP address and port.
    AddrPort,
    /// IP prefix.
    Cidr,
    Url,
    Uuid,
    Color,
    Path,
    /// Repeatable counter (`-vvv`).
    Count,
    Slice,
    Map,
    /// Action invoked when the flag is seen. Holds no data.
    Hook,
}

impl Type {
    /// Every descriptor, in declaration order.
    pub const ALL: [Type; 40] = [
        Type::String,
        Type::Bytes,
        Type::Base64,
        Type::Hex,
        Type::Bool,
        Type::Byte,
        Type::Rune,
        Type::Int,
        Type::Int64,
        Type::Int32,
        Type::Int16,
        Type::Int8,
        Type::Uint,
        Type::Uint64,
        Type::Uint32,
        Type::Uint16,
        Type::Uint8,
        Type::Float64,
        Type::Float32,
        Type::Complex128,
        Type::Complex64,
        Type::BigInt,
        Type::BigRat,
        Type::BigFloat,
        Type::Timestamp,
        Type::DateTime,
        Type::Date,
        Type::Time,
        Type::Duration,
        Type::Addr,
        Type::AddrPort,
        Type::Cidr,
        Type::Url,
        Type::Uuid,
        Type::Color,
        Type::Path,
        Type::Count,
        Type::Slice,
        Type::Map,
        Type::Hook,
    ];

    /// Returns the descriptor name.
    pub fn name(self) -> &'static str {
        match self {
            Type::String => "string",
            Type::Bytes => "bytes",
            Type::Base64 => "base64",
            Type::Hex => "hex",
            Type::Bool => "bool",
            Type::Byte => "byte",
            Type::Rune => "rune",
            Type::Int => "int",
            Type::Int64 => "int64",
            Type::Int32 => "int32",
            Type::Int16 => "int16",
            Type::Int8 => "int8",
            Type::Uint => "uint",
            Type::Uint64 => "uint64",
            Type::Uint32 => "uint32",
            Type::Uint16 => "uint16",
            Type::Uint8 => "uint8",
            Type::Float64 => "float64",
            Type::Float32 => "float32",
            Type::Complex128 => "complex128",
            Type::Complex64 => "complex64",
            Type::BigInt => "bigint",
            Type::BigRat => "bigrat",
            Type::BigFloat => "bigfloat",
            Type::Timestamp => "timestamp",
            Type::DateTime => "datetime",
            Type::Date => "date",
            Type::Time => "time",
            Type::Duration => "duration",
            Type::Addr => "addr",
            Type::AddrPort => "addrport",
            Type::Cidr => "cidr",
            Type::Url => "url",
            Type::Uuid => "uuid",
            Type::Color => "color",
            Type::Path => "path",
            Type::Count => "count",
            Type::Slice => "slice",
            Type::Map => "map",
            Type::Hook => "hook",
        }
    }

    /// Returns `true` for types whose values accumulate across assignments.
    pub fn is_container(self) -> bool {
        matches!(self, Type::Slice | Type::Map)
    }

    /// Returns `true` for types allowed as map keys.
    pub fn is_map_key(self) -> bool {
        matches!(
            self,
            Type::String
                | Type::Path
                | Type::Bool
                | Type::Byte
                | Type::Rune
                | Type::Int
                | Type::Int64
                | Type::Int32
                | Type::Int16
                | Type::Int8
                | Type::Uint
                | Type::Uint64
                | Type::Uint32
                | Type::Uint16
                | Type::Uint8
        )
    }

    /// Returns `true` for the types that accept a text layout.
    pub fn is_time(self) -> bool {
        matches!(self, Type::Timestamp | Type::DateTime | Type::Date | Type::Time)
    }

    /// Returns `true` for types allowed as slice or map elements.
    pub fn is_element(self) -> bool {
        !matches!(self, Type::Slice | Type::Map | Type::Hook)
    }

    /// Builds the zero value for this type.
    ///
    /// Containers get string keys and elements; use [`Value::slice`] or
    /// [`Value::map`] to choose others. Hooks need an action and cannot be
    /// built here.
    pub fn new_value(self) -> Result<Value> {
        let value = match self {
            Type::String => Value::String(String::new()),
            Type::Bytes => Value::Bytes(Vec::new()),
            Type::Base64 => Value::Base64(Vec::new()),
            Type::Hex => Value::Hex(Vec::new()),
            Type::Bool => Value::Bool(false),
            Type::Byte => Value::Byte(0),
            Type::Rune => Value::Rune('\0'),
            Type::Int => Value::Int(0),
            Type::Int64 => Value::Int64(0),
            Type::Int32 => Value::Int32(0),
            Type::Int16 => Value::Int16(0),
            Type::Int8 => Value::Int8(0),
            Type::Uint => Value::Uint(0),
            Type::Uint64 => Value::Uint64(0),
            Type::Uint32 => Value::Uint32(0),
            Type::Uint16 => Value::Uint16(0),
            Type::Uint8 => Value::Uint8(0),
            Type::Float64 => Value::Float64(0.0),
            Type::Float32 => Value::Float32(0.0),
            Type::Complex128 => Value::Complex128(Complex::new(0.0, 0.0)),
            Type::Complex64 => Value::Complex64(Complex::new(0.0, 0.0)),
            Type::BigInt => Value::BigInt(BigInt::default()),
            Type::BigRat => Value::BigRat(BigRational::from_integer(BigInt::default())),
            Type::BigFloat => Value::BigFloat(BigDecimal::default()),
            Type::Timestamp => Value::Timestamp(DateTime::<Utc>::default().fixed_offset(), None),
            Type::DateTime => Value::DateTime(NaiveDateTime::default(), None),
            Type::Date => Value::Date(NaiveDate::default(), None),
            Type::Time => Value::Time(NaiveTime::default(), None),
            Type::Duration => Value::Duration(TimeDelta::zero()),
            Type::Addr => Value::Addr(None),
            Type::AddrPort => Value::AddrPort(None),
            Type::Cidr => Value::Cidr(None),
            Type::Url => Value::Url(None),
            Type::Uuid => Value::Uuid(Uuid::nil()),
            Type::Color => Value::Color(Color::default()),
            Type::Path => Value::Path(PathBuf::new()),
            Type::Count => Value::Count(0),
            Type::Slice => Value::slice(Type::String)?,
            Type::Map => Value::map(Type::String, Type::String)?,
            Type::Hook => return Err(Error::InvalidType("hook requires an action".to_string())),
        };
        Ok(value)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Type::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| Error::InvalidType(s.to_string()))
    }
}

/// Action run by a hook flag.
pub type HookFn = Arc<dyn Fn(&Context, CommandRef<'_>) -> Result<()> + Send + Sync>;

/// A hook action, compared by identity.
#[derive(Clone)]
pub struct Hook(HookFn);

impl Hook {
    /// Wraps an action.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context, CommandRef<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the action.
    pub fn call(&self, ctx: &Context, cmd: CommandRef<'_>) -> Result<()> {
        (self.0)(ctx, cmd)
    }
}

impl From<HookFn> for Hook {
    fn from(f: HookFn) -> Self {
        Self(f)
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Accumulating list of values of one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceValue {
    pub elem: Type,
    /// Layout given to time elements.
    pub layout: Option<String>,
    pub items: Vec<Value>,
}

/// Ordered key of a [`MapValue`].
///
/// Renders exactly as the key's value would.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Char(char),
    Text(String),
}

impl MapKey {
    fn from_value(value: &Value) -> Option<Self> {
        let key = match value {
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(n) | Value::Int64(n) => MapKey::Signed(*n),
            Value::Int32(n) => MapKey::Signed(i64::from(*n)),
            Value::Int16(n) => MapKey::Signed(i64::from(*n)),
            Value::Int8(n) => MapKey::Signed(i64::from(*n)),
            Value::Uint(n) | Value::Uint64(n) => MapKey::Unsigned(*n),
            Value::Uint32(n) => MapKey::Unsigned(u64::from(*n)),
            Value::Uint16(n) => MapKey::Unsigned(u64::from(*n)),
            Value::Uint8(n) => MapKey::Unsigned(u64::from(*n)),
            Value::Byte(b) => MapKey::Char(char::from(*b)),
            Value::Rune(c) => MapKey::Char(*c),
            Value::String(s) => MapKey::Text(s.clone()),
            Value::Path(p) => MapKey::Text(p.display().to_string()),
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Signed(n) => write!(f, "{n}"),
            MapKey::Unsigned(n) => write!(f, "{n}"),
            MapKey::Char(c) => write!(f, "{c}"),
            MapKey::Text(s) => f.write_str(s),
        }
    }
}

/// Accumulating key/value map; later keys replace earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub key: Type,
    pub elem: Type,
    /// Layout given to time elements.
    pub layout: Option<String>,
    pub entries: BTreeMap<MapKey, Value>,
}

/// A typed flag value.
///
/// Time variants carry an optional strftime layout that replaces their
/// default text format for both parsing and rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bytes(Vec<u8>),
    Base64(Vec<u8>),
    Hex(Vec<u8>),
    Bool(bool),
    Byte(u8),
    Rune(char),
    Int(i64),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    Uint(u64),
    Uint64(u64),
    Uint32(u32),
    Uint16(u16),
    Uint8(u8),
    Float64(f64),
    Float32(f32),
    Complex128(Complex<f64>),
    Complex64(Complex<f32>),
    BigInt(BigInt),
    BigRat(BigRational),
    BigFloat(BigDecimal),
    Timestamp(DateTime<FixedOffset>, Option<String>),
    DateTime(NaiveDateTime, Option<String>),
    Date(NaiveDate, Option<String>),
    Time(NaiveTime, Option<String>),
    Duration(TimeDelta),
    Addr(Option<IpAddr>),
    AddrPort(Option<SocketAddr>),
    Cidr(Option<Prefix>),
    Url(Option<Url>),
    Uuid(Uuid),
    Color(Color),
    Path(PathBuf),
    Count(i64),
    Slice(SliceValue),
    Map(MapValue),
    Hook(Hook),
}

fn parse<T>(ty: Type, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| Error::invalid_value(ty, raw, e))
}

fn single_char(ty: Type, raw: &str) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::invalid_value(ty, raw, "expected a single character")),
    }
}

impl Value {
    /// Builds an empty slice of `elem` values.
    pub fn slice(elem: Type) -> Result<Value> {
        if !elem.is_element() {
            return Err(Error::InvalidType(format!("{elem} is not a valid slice element")));
        }
        Ok(Value::Slice(SliceValue {
            elem,
            layout: None,
            items: Vec::new(),
        }))
    }

    /// Builds an empty map from `key` to `elem` values.
    pub fn map(key: Type, elem: Type) -> Result<Value> {
        if !key.is_map_key() {
            return Err(Error::InvalidType(format!("{key} is not a valid map key")));
        }
        if !elem.is_element() {
            return Err(Error::InvalidType(format!("{elem} is not a valid map element")));
        }
        Ok(Value::Map(MapValue {
            key,
            elem,
            layout: None,
            entries: BTreeMap::new(),
        }))
    }

    /// Replaces the text layout of a time value, or of the time elements of
    /// a slice or map. Other values are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use argot_core::{Type, Value};
    ///
    /// let mut day = Type::Date.new_value().unwrap().with_layout(Some("%d.%m.%Y"));
    /// day.set("02.01.2024").unwrap();
    /// assert_eq!(day.render(), "02.01.2024");
    /// ```
    pub fn with_layout(mut self, layout: Option<&str>) -> Value {
        let layout = layout.map(str::to_string);
        match &mut self {
            Value::Timestamp(_, l) | Value::DateTime(_, l) | Value::Date(_, l) | Value::Time(_, l) => *l = layout,
            Value::Slice(slice) if slice.elem.is_time() => slice.layout = layout,
            Value::Map(map) if map.elem.is_time() => map.layout = layout,
            _ => {}
        }
        self
    }

    /// Returns this value's type descriptor.
    pub fn ty(&self) -> Type {
        match self {
            Value::String(_) => Type::String,
            Value::Bytes(_) => Type::Bytes,
            Value::Base64(_) => Type::Base64,
            Value::Hex(_) => Type::Hex,
            Value::Bool(_) => Type::Bool,
            Value::Byte(_) => Type::Byte,
            Value::Rune(_) => Type::Rune,
            Value::Int(_) => Type::Int,
            Value::Int64(_) => Type::Int64,
            Value::Int32(_) => Type::Int32,
            Value::Int16(_) => Type::Int16,
            Value::Int8(_) => Type::Int8,
            Value::Uint(_) => Type::Uint,
            Value::Uint64(_) => Type::Uint64,
            Value::Uint32(_) => Type::Uint32,
            Value::Uint16(_) => Type::Uint16,
            Value::Uint8(_) => Type::Uint8,
            Value::Float64(_) => Type::Float64,
            Value::Float32(_) => Type::Float32,
            Value::Complex128(_) => Type::Complex128,
            Value::Complex64(_) => Type::Complex64,
            Value::BigInt(_) => Type::BigInt,
            Value::BigRat(_) => Type::BigRat,
            Value::BigFloat(_) => Type::BigFloat,
            Value::Timestamp(..) => Type::Timestamp,
            Value::DateTime(..) => Type::DateTime,
            Value::Date(..) => Type::Date,
            Value::Time(..) => Type::Time,
            Value::Duration(_) => Type::Duration,
            Value::Addr(_) => Type::Addr,
            Value::AddrPort(_) => Type::AddrPort,
            Value::Cidr(_) => Type::Cidr,
            Value::Url(_) => Type::Url,
            Value::Uuid(_) => Type::Uuid,
            Value::Color(_) => Type::Color,
            Value::Path(_) => Type::Path,
            Value::Count(_) => Type::Count,
            Value::Slice(_) => Type::Slice,
            Value::Map(_) => Type::Map,
            Value::Hook(_) => Type::Hook,
        }
    }

    /// Returns `true` if assignments accumulate instead of overwriting.
    pub fn is_container(&self) -> bool {
        self.ty().is_container()
    }

    /// Coerces `raw` to this value's type and assigns it.
    ///
    /// On error the value is left unchanged.
    pub fn set(&mut self, raw: &str) -> Result<()> {
        let ty = self.ty();
        match self {
            Value::String(v) => *v = raw.to_string(),
            Value::Bytes(v) => *v = raw.as_bytes().to_vec(),
            Value::Base64(v) => {
                *v = STANDARD
                    .decode(raw)
                    .map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            Value::Hex(v) => *v = scalar::decode_hex(raw).map_err(|e| Error::invalid_value(ty, raw, e))?,
            Value::Bool(v) => *v = scalar::parse_bool(raw).map_err(|e| Error::invalid_value(ty, raw, e))?,
            Value::Byte(v) => {
                let c = single_char(ty, raw)?;
                *v = u8::try_from(c)
                    .ok()
                    .filter(u8::is_ascii)
                    .ok_or_else(|| Error::invalid_value(ty, raw, "expected an ASCII character"))?;
            }
            Value::Rune(v) => *v = single_char(ty, raw)?,
            Value::Int(v) | Value::Int64(v) => *v = parse(ty, raw)?,
            Value::Int32(v) => *v = parse(ty, raw)?,
            Value::Int16(v) => *v = parse(ty, raw)?,
            Value::Int8(v) => *v = parse(ty, raw)?,
            Value::Uint(v) | Value::Uint64(v) => *v = parse(ty, raw)?,
            Value::Uint32(v) => *v = parse(ty, raw)?,
            Value::Uint16(v) => *v = parse(ty, raw)?,
            Value::Uint8(v) => *v = parse(ty, raw)?,
            Value::Float64(v) => *v = parse(ty, raw)?,
            Value::Float32(v) => *v = parse(ty, raw)?,
            Value::Complex128(v) => *v = parse(ty, raw)?,
            Value::Complex64(v) => *v = parse(ty, raw)?,
            Value::BigInt(v) => *v = parse(ty, raw)?,
            Value::BigRat(v) => *v = parse(ty, raw)?,
            Value::BigFloat(v) => *v = parse(ty, raw)?,
            Value::Timestamp(v, layout) => {
                *v = match layout {
                    Some(layout) => scalar::parse_timestamp(raw, layout),
                    None => DateTime::parse_from_rfc3339(raw),
                }
                .map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            Value::DateTime(v, layout) => {
                *v = NaiveDateTime::parse_from_str(raw, layout.as_deref().unwrap_or(DATETIME_LAYOUT))
                    .map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            Value::Date(v, layout) => {
                *v = NaiveDate::parse_from_str(raw, layout.as_deref().unwrap_or(DATE_LAYOUT))
                    .map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            Value::Time(v, layout) => {
                *v = NaiveTime::parse_from_str(raw, layout.as_deref().unwrap_or(TIME_LAYOUT))
                    .map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            Value::Duration(v) => {
                *v = scalar::parse_duration(raw).map_err(|e| Error::invalid_value(ty, raw, e))?
            }
            // An empty raw value resets the optional network and URL types.
            Value::Addr(v) => *v = optional(ty, raw)?,
            Value::AddrPort(v) => *v = optional(ty, raw)?,
            Value::Cidr(v) => *v = optional(ty, raw)?,
            Value::Url(v) => *v = optional(ty, raw)?,
            Value::Uuid(v) => *v = Uuid::parse_str(raw).map_err(|e| Error::invalid_value(ty, raw, e))?,
            Value::Color(v) => *v = parse(ty, raw)?,
            Value::Path(v) => *v = PathBuf::from(raw),
            Value::Count(v) => {
                if raw.is_empty() {
                    *v = v
                        .checked_add(1)
                        .ok_or_else(|| Error::invalid_value(ty, raw, "count overflow"))?;
                } else {
                    *v = parse(ty, raw)?;
                }
            }
            Value::Slice(slice) => {
                let items = scalar::split_escaped(raw, ',')
                    .iter()
                    .map(|item| {
                        let mut value = slice.elem.new_value()?.with_layout(slice.layout.as_deref());
                        value.set(item)?;
                        Ok(value)
                    })
                    .collect::<Result<Vec<_>>>()?;
                slice.items.extend(items);
            }
            Value::Map(map) => {
                let mut entries = Vec::new();
                for pair in scalar::split_escaped(raw, ',') {
                    let (k, v) = pair
                        .split_once('=')
                        .ok_or_else(|| Error::invalid_value(ty, raw, "expected key=value"))?;
                    let mut key = map.key.new_value()?;
                    key.set(k)?;
                    let key = MapKey::from_value(&key)
                        .ok_or_else(|| Error::InvalidType(format!("{} is not a valid map key", map.key)))?;
                    let mut value = map.elem.new_value()?.with_layout(map.layout.as_deref());
                    value.set(v)?;
                    entries.push((key, value));
                }
                map.entries.extend(entries);
            }
            Value::Hook(_) => {}
        }
        Ok(())
    }

    /// Renders the value as text.
    ///
    /// Scalar renderings parse back to the same value. Slices and maps join
    /// their items with `,`, escaping embedded commas.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Base64(b) => STANDARD.encode(b),
            Value::Hex(b) => scalar::encode_hex(b),
            Value::Bool(b) => b.to_string(),
            Value::Byte(b) => char::from(*b).to_string(),
            Value::Rune(c) => c.to_string(),
            Value::Int(n) | Value::Int64(n) | Value::Count(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Int16(n) => n.to_string(),
            Value::Int8(n) => n.to_string(),
            Value::Uint(n) | Value::Uint64(n) => n.to_string(),
            Value::Uint32(n) => n.to_string(),
            Value::Uint16(n) => n.to_string(),
            Value::Uint8(n) => n.to_string(),
            Value::Float64(n) => n.to_string(),
            Value::Float32(n) => n.to_string(),
            Value::Complex128(n) => n.to_string(),
            Value::Complex64(n) => n.to_string(),
            Value::BigInt(n) => n.to_string(),
            Value::BigRat(n) => n.to_string(),
            Value::BigFloat(n) => n.to_string(),
            Value::Timestamp(t, None) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Value::Timestamp(t, Some(layout)) => scalar::strftime(t.format(layout)),
            Value::DateTime(t, layout) => scalar::strftime(t.format(layout.as_deref().unwrap_or(DATETIME_LAYOUT))),
            Value::Date(t, layout) => scalar::strftime(t.format(layout.as_deref().unwrap_or(DATE_LAYOUT))),
            Value::Time(t, layout) => scalar::strftime(t.format(layout.as_deref().unwrap_or(TIME_LAYOUT))),
            Value::Duration(d) => scalar::format_duration(*d),
            Value::Addr(a) => a.map(|a| a.to_string()).unwrap_or_default(),
            Value::AddrPort(a) => a.map(|a| a.to_string()).unwrap_or_default(),
            Value::Cidr(p) => p.map(|p| p.to_string()).unwrap_or_default(),
            Value::Url(u) => u.as_ref().map(Url::to_string).unwrap_or_default(),
            Value::Uuid(u) => u.to_string(),
            Value::Color(c) => c.to_string(),
            Value::Path(p) => p.display().to_string(),
            Value::Slice(slice) => slice
                .items
                .iter()
                .map(|item| scalar::escape(&item.render(), ','))
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(map) => map
                .entries
                .iter()
                .map(|(k, v)| format!("{}={}", scalar::escape(&k.to_string(), ','), scalar::escape(&v.render(), ',')))
                .collect::<Vec<_>>()
                .join(","),
            Value::Hook(_) => String::new(),
        }
    }

    /// Returns the text of a string or path value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Path(p) => p.to_str(),
            _ => None,
        }
    }

    /// Returns the raw bytes of a bytes, base64, or hex value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::Base64(b) | Value::Hex(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Rune(c) => Some(*c),
            Value::Byte(b) => Some(char::from(*b)),
            _ => None,
        }
    }

    /// Returns any integer value that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) | Value::Int64(n) | Value::Count(n) => Some(*n),
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int16(n) => Some(i64::from(*n)),
            Value::Int8(n) => Some(i64::from(*n)),
            _ => self.as_u64().and_then(|n| i64::try_from(n).ok()),
        }
    }

    /// Returns any non-negative integer value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(n) | Value::Uint64(n) => Some(*n),
            Value::Uint32(n) => Some(u64::from(*n)),
            Value::Uint16(n) => Some(u64::from(*n)),
            Value::Uint8(n) | Value::Byte(n) => Some(u64::from(*n)),
            Value::Int(n) | Value::Int64(n) | Value::Count(n) => u64::try_from(*n).ok(),
            Value::Int32(n) => u64::try_from(*n).ok(),
            Value::Int16(n) => u64::try_from(*n).ok(),
            Value::Int8(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(n) => Some(*n),
            Value::Float32(n) => Some(f64::from(*n)),
            _ => self.as_i64().map(|n| n as f64),
        }
    }

    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Slice(slice) => Some(&slice.items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(map) => Some(&map.entries),
            _ => None,
        }
    }

    pub fn as_hook(&self) -> Option<&Hook> {
        match self {
            Value::Hook(hook) => Some(hook),
            _ => None,
        }
    }
}

fn optional<T>(ty: Type, raw: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if raw.is_empty() {
        return Ok(None);
    }
    parse(ty, raw).map(Some)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ty: Type, raw: &str) -> Value {
        let mut value = ty.new_value().unwrap();
        value.set(raw).unwrap();
        value
    }

    #[test]
    fn test_type_names_round_trip() {
        for ty in Type::ALL {
            assert_eq!(ty.name().parse::<Type>().unwrap(), ty);
        }
        assert!(matches!("float".parse::<Type>(), Err(Error::InvalidType(_))));
    }

    #[test]
    fn test_type_serde_matches_name() {
        for ty in Type::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.name()));
            assert_eq!(serde_json::from_str::<Type>(&json).unwrap(), ty);
        }
    }

    fn sample(ty: Type) -> Option<&'static str> {
        let raw = match ty {
            Type::String => "hello",
            Type::Bytes => "raw",
            Type::Base64 => "aGVsbG8=",
            Type::Hex => "deadbeef",
            Type::Bool => "true",
            Type::Byte => "x",
            Type::Rune => "λ",
            Type::Int => "-42",
            Type::Int64 => "-9223372036854775808",
            Type::Int32 => "2147483647",
            Type::Int16 => "-32768",
            Type::Int8 => "-128",
            Type::Uint => "42",
            Type::Uint64 => "18446744073709551615",
            Type::Uint32 => "4294967295",
            Type::Uint16 => "65535",
            Type::Uint8 => "255",
            Type::Float64 => "1.5",
            Type::Float32 => "0.1",
            Type::Complex128 => "1+2i",
            Type::Complex64 => "1.5-2i",
            Type::BigInt => "123456789012345678901234567890",
            Type::BigRat => "3/4",
            Type::BigFloat => "3.14159265358979323846264338327950288",
            Type::Timestamp => "2024-01-02T03:04:05Z",
            Type::DateTime => "2024-01-02 03:04:05",
            Type::Date => "2024-01-02",
            Type::Time => "23:59:59",
            Type::Duration => "1h30m0s",
            Type::Addr => "192.168.1.1",
            Type::AddrPort => "[::1]:8080",
            Type::Cidr => "10.0.0.0/8",
            Type::Url => "https://example.com/path?q=1",
            Type::Uuid => "67e55044-10b1-426f-9247-bb680e5fe0c8",
            Type::Color => "#ff8000",
            Type::Path => "/tmp/x",
            Type::Count => "3",
            Type::Slice | Type::Map | Type::Hook => return None,
        };
        Some(raw)
    }

    #[test]
    fn test_scalar_render_is_format_stable() {
        let mut checked = 0;
        for ty in Type::ALL {
            let Some(raw) = sample(ty) else {
                assert!(ty.is_container() || ty == Type::Hook);
                continue;
            };
            let first = set(ty, raw).render();
            assert_eq!(first, raw, "{ty} rendering changed its input");
            assert_eq!(set(ty, &first).render(), first, "{ty} is not format-stable");
            checked += 1;
        }
        assert_eq!(checked, Type::ALL.len() - 3);
    }

    #[test]
    fn test_layouts_drive_time_text() {
        let mut day = Type::Date.new_value().unwrap().with_layout(Some("%d/%m/%Y"));
        day.set("02/01/2024").unwrap();
        assert_eq!(day.render(), "02/01/2024");
        assert!(day.set("2024-01-02").is_err());

        let mut stamp = Type::Timestamp.new_value().unwrap().with_layout(Some("%Y-%m-%d %H:%M %z"));
        stamp.set("2024-01-02 03:04 +0100").unwrap();
        assert_eq!(stamp.render(), "2024-01-02 03:04 +0100");

        let mut utc = Type::Timestamp.new_value().unwrap().with_layout(Some("%Y%m%d%H%M%S"));
        utc.set("20240102030405").unwrap();
        assert_eq!(utc.clone().with_layout(None).render(), "2024-01-02T03:04:05Z");

        let mut clock = Type::Time.new_value().unwrap().with_layout(Some("%H.%M"));
        clock.set("07.30").unwrap();
        assert_eq!(clock.render(), "07.30");

        let mut days = Value::slice(Type::Date).unwrap().with_layout(Some("%d.%m.%Y"));
        days.set("01.02.2024,03.04.2024").unwrap();
        assert_eq!(days.render(), "01.02.2024,03.04.2024");

        let mut plain = Type::Int.new_value().unwrap().with_layout(Some("%Y"));
        plain.set("7").unwrap();
        assert_eq!(plain, Value::Int(7));
    }

    #[test]
    fn test_bigfloat_keeps_precision() {
        let value = set(Type::BigFloat, "0.1000000000000000000000000000001");
        assert_eq!(value.render(), "0.1000000000000000000000000000001");
        assert!(Type::BigFloat.new_value().unwrap().set("1.2.3").is_err());
        assert_eq!("bigfloat".parse::<Type>().unwrap(), Type::BigFloat);
    }

    #[test]
    fn test_rendering_normalizes() {
        assert_eq!(set(Type::Timestamp, "2024-01-02T03:04:05+00:00").render(), "2024-01-02T03:04:05Z");
        assert_eq!(set(Type::Duration, "90m").render(), "1h30m0s");
        assert_eq!(set(Type::BigRat, "6/8").render(), "3/4");
        assert_eq!(set(Type::Bool, "T").render(), "true");
    }

    #[test]
    fn test_invalid_value_reports_type() {
        let mut value = Type::Int.new_value().unwrap();
        let err = value.set("ten").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ty: Type::Int, ref raw, .. } if raw == "ten"));
        assert_eq!(value, Value::Int(0));

        assert!(Type::Uint8.new_value().unwrap().set("256").is_err());
        assert!(Type::Byte.new_value().unwrap().set("é").is_err());
        assert!(Type::Rune.new_value().unwrap().set("ab").is_err());
        assert!(Type::BigRat.new_value().unwrap().set("1/0").is_err());
        assert!(Type::Hex.new_value().unwrap().set("xyz").is_err());
    }

    #[test]
    fn test_count_increments_or_assigns() {
        let mut count = Type::Count.new_value().unwrap();
        count.set("").unwrap();
        count.set("").unwrap();
        assert_eq!(count.as_i64(), Some(2));
        count.set("10").unwrap();
        assert_eq!(count.as_i64(), Some(10));
    }

    #[test]
    fn test_count_overflow_is_an_error() {
        let mut count = set(Type::Count, "9223372036854775807");
        let err = count.set("").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ty: Type::Count, ref reason, .. } if reason == "count overflow"));
        assert_eq!(count, Value::Count(i64::MAX));
    }

    #[test]
    fn test_slice_appends_split_items() {
        let mut ints = Value::slice(Type::Int).unwrap();
        ints.set("1,2").unwrap();
        ints.set("3").unwrap();
        assert_eq!(ints.render(), "1,2,3");
        assert!(ints.set("4,x").is_err());
        assert_eq!(ints.as_slice().unwrap().len(), 3);

        let mut strings = Value::slice(Type::String).unwrap();
        strings.set(r"a\,b,c").unwrap();
        assert_eq!(strings.as_slice().unwrap()[0], Value::String("a,b".into()));
        assert_eq!(strings.render(), r"a\,b,c");
    }

    #[test]
    fn test_map_merges_keys() {
        let mut map = Value::map(Type::String, Type::Int).unwrap();
        map.set("a=1,b=2").unwrap();
        map.set("a=3").unwrap();
        assert_eq!(map.render(), "a=3,b=2");
        assert!(map.set("c").is_err());

        let mut by_num = Value::map(Type::Int, Type::String).unwrap();
        by_num.set("10=x,2=y").unwrap();
        assert_eq!(by_num.render(), "2=y,10=x");
    }

    #[test]
    fn test_container_type_checks() {
        assert!(Value::map(Type::Float64, Type::String).is_err());
        assert!(Value::map(Type::Rune, Type::Slice).is_err());
        assert!(Value::slice(Type::Hook).is_err());
        assert!(Type::Hook.new_value().is_err());
    }

    #[test]
    fn test_empty_resets_optional_types() {
        let mut addr = set(Type::Addr, "::1");
        addr.set("").unwrap();
        assert_eq!(addr, Value::Addr(None));
        assert_eq!(addr.render(), "");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(set(Type::Uint8, "7").as_i64(), Some(7));
        assert_eq!(set(Type::Int, "-1").as_u64(), None);
        assert_eq!(set(Type::Float32, "0.5").as_f64(), Some(0.5));
        assert_eq!(set(Type::Path, "a/b").as_str(), Some("a/b"));
        assert_eq!(set(Type::Hex, "0a").as_bytes(), Some(&[10u8][..]));
        assert!(set(Type::String, "x").as_bool().is_none());
    }
}
