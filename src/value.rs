//! Conversion between wire payloads and host values.
//!
//! Payloads are opaque bytes at the frame layer; what they mean is decided
//! by the OID that was queried. [`decode_value`] and [`encode_value`] map
//! between those bytes and typed host values, driven by the [`DataType`]
//! recorded for the OID in the registry.

use thiserror::Error;

use crate::decode::{Decode, DecodeError};
use crate::encode::{append, encode_to_vec};

/// Payload types known to the protocol.
///
/// All numeric types travel big-endian. `TimeSeries` and `EventTable` are
/// compound aggregates that only ever appear in responses; requests for
/// them carry a plain `Uint32` query timestamp.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Opaque bytes, passed through unchanged.
    #[default]
    Unknown,
    /// Single byte, zero is false and anything else is true.
    Bool,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    /// Enumerated value, one byte on the wire.
    Enum,
    /// IEEE-754 single precision.
    Float,
    /// NUL-terminated ASCII of variable length.
    String,
    /// Query timestamp followed by timestamp/value pairs.
    TimeSeries,
    /// Query timestamp followed by 5-word event records.
    EventTable,
}

/// A decoded payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Float(f32),
    String(String),
    TimeSeries(TimeSeries),
    EventTable(EventTable),
    Bytes(Vec<u8>),
}

/// One sample of a time series response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesEntry {
    /// Unix timestamp of the sample.
    pub timestamp: u32,
    pub value: f32,
}

/// Decoded time series payload: the query timestamp the table was requested
/// with, followed by the recorded samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub query: u32,
    pub entries: Vec<TimeSeriesEntry>,
}

/// One record of the device's event log.
///
/// Only the marker's low byte is understood so far, see [`EventKind`]. The
/// remaining four words change meaning with the event kind; the second is
/// a start timestamp for every kind observed to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTableEntry {
    pub marker: u32,
    pub element2: u32,
    pub element3: u32,
    pub element4: u32,
    pub element5: u32,
}

impl EventTableEntry {
    /// The event kind identified by the marker's low byte.
    pub const fn kind(self) -> EventKind {
        EventKind::from_marker(self.marker as u8)
    }
}

/// Decoded event table payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTable {
    pub query: u32,
    pub entries: Vec<EventTableEntry>,
}

/// Event kinds identified by the low byte of an event record's marker.
///
/// Markers outside the known set are preserved verbatim as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Switch-on undervoltage limit reached, phase L1.
    SwOnUminL1,
    /// Switch-on overvoltage limit reached, phase L1.
    SwOnUmaxL1,
    /// Switch-on frequency limit reached, phase L1.
    SwOnFmaxL1,
    SwOnUminL2,
    SwOnUmaxL2,
    SwOnUminL3,
    SwOnUmaxL3,
    Surge,
    NoGrid,
    PhasePos,
    BatOvervoltage,
    CanTimeout,
    BatIntern,
    /// A parameter was changed.
    PrmChange,
    Reset,
    Update,
    FrtOvervoltage,
    FrtUndervoltage,
    Unknown(u8),
}

impl EventKind {
    /// Maps a marker low byte to its event kind.
    pub const fn from_marker(byte: u8) -> Self {
        match byte {
            0x4F => Self::SwOnUminL1,
            0x50 => Self::SwOnUmaxL1,
            0x52 => Self::SwOnFmaxL1,
            0x53 => Self::SwOnUminL2,
            0x54 => Self::SwOnUmaxL2,
            0x57 => Self::SwOnUminL3,
            0x58 => Self::SwOnUmaxL3,
            0x59 => Self::Surge,
            0x5A => Self::NoGrid,
            0x61 => Self::PhasePos,
            0x64 => Self::BatOvervoltage,
            0x6B => Self::CanTimeout,
            0x72 => Self::BatIntern,
            0x73 => Self::PrmChange,
            0x76 => Self::Reset,
            0x77 => Self::Update,
            0x78 => Self::FrtOvervoltage,
            0x79 => Self::FrtUndervoltage,
            other => Self::Unknown(other),
        }
    }
}

/// Returned when a value cannot be turned into payload bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value's variant does not fit the requested data type.
    #[error("value does not match data type {0:?}")]
    TypeMismatch(DataType),

    /// A string value contained characters outside the ASCII range.
    #[error("string value contains non-ASCII data")]
    NonAscii,

    /// Whole tables cannot be sent to the device.
    #[error("{0:?} tables are receive-only, encode the query timestamp instead")]
    TableEncode(DataType),
}

/// Encodes a host value into payload bytes for the given data type.
///
/// `TimeSeries` and `EventTable` accept only the query timestamp form, a
/// `Uint32` that is written to the table OID to trigger the device's
/// response.
pub fn encode_value(ty: DataType, value: &Value) -> Result<Vec<u8>, EncodeError> {
    match (ty, value) {
        (DataType::Bool, Value::Bool(v)) => Ok(vec![u8::from(*v)]),
        (DataType::Uint8 | DataType::Enum, Value::Uint8(v)) => Ok(encode_to_vec(v)),
        (DataType::Int8, Value::Int8(v)) => Ok(encode_to_vec(v)),
        (DataType::Uint16, Value::Uint16(v)) => Ok(encode_to_vec(v)),
        (DataType::Int16, Value::Int16(v)) => Ok(encode_to_vec(v)),
        (DataType::Uint32, Value::Uint32(v)) => Ok(encode_to_vec(v)),
        (DataType::Int32, Value::Int32(v)) => Ok(encode_to_vec(v)),
        (DataType::Float, Value::Float(v)) => Ok(encode_to_vec(v)),
        (DataType::String, Value::String(v)) => {
            if !v.is_ascii() {
                return Err(EncodeError::NonAscii);
            }
            let mut data = Vec::with_capacity(v.len() + 1);
            append(&mut data, &v.as_bytes());
            data.push(0x00);
            Ok(data)
        }
        (DataType::TimeSeries | DataType::EventTable, Value::Uint32(v)) => Ok(encode_to_vec(v)),
        (DataType::TimeSeries, Value::TimeSeries(_))
        | (DataType::EventTable, Value::EventTable(_)) => Err(EncodeError::TableEncode(ty)),
        (DataType::Unknown, Value::Bytes(v)) => Ok(v.clone()),
        _ => Err(EncodeError::TypeMismatch(ty)),
    }
}

/// Decodes payload bytes into a host value for the given data type.
///
/// Scalar types require the exact byte count of the type. Strings stop at
/// the first NUL; devices are known to pad the remainder with garbage, and
/// some omit the terminator entirely, in which case the whole slice is
/// taken.
pub fn decode_value(ty: DataType, data: &[u8]) -> Result<Value, DecodeError> {
    match ty {
        DataType::Unknown => Ok(Value::Bytes(data.to_vec())),
        DataType::Bool => Ok(Value::Bool(scalar::<u8>(data)? != 0)),
        DataType::Uint8 | DataType::Enum => Ok(Value::Uint8(scalar(data)?)),
        DataType::Int8 => Ok(Value::Int8(scalar(data)?)),
        DataType::Uint16 => Ok(Value::Uint16(scalar(data)?)),
        DataType::Int16 => Ok(Value::Int16(scalar(data)?)),
        DataType::Uint32 => Ok(Value::Uint32(scalar(data)?)),
        DataType::Int32 => Ok(Value::Int32(scalar(data)?)),
        DataType::Float => Ok(Value::Float(scalar(data)?)),
        DataType::String => decode_string(data),
        DataType::TimeSeries => decode_timeseries(data),
        DataType::EventTable => decode_event_table(data),
    }
}

/// Decodes a scalar that must cover the payload exactly.
fn scalar<T: Decode>(mut data: &[u8]) -> Result<T, DecodeError> {
    let expected = size_of::<T>();
    if data.len() != expected {
        return Err(DecodeError::Length {
            expected,
            actual: data.len(),
        });
    }
    T::decode(&mut data)
}

fn decode_string(data: &[u8]) -> Result<Value, DecodeError> {
    let end = data.iter().position(|&b| b == 0x00).unwrap_or(data.len());
    let text = &data[..end];
    if !text.is_ascii() {
        return Err(DecodeError::NonAscii);
    }
    let text = std::str::from_utf8(text).map_err(|_| DecodeError::NonAscii)?;
    Ok(Value::String(text.to_owned()))
}

fn decode_timeseries(mut data: &[u8]) -> Result<Value, DecodeError> {
    let len = data.len();
    // A query timestamp plus n pairs: 4 * (2n + 1) bytes.
    if len % 4 != 0 || (len / 4) % 2 != 1 {
        return Err(DecodeError::TimeSeriesLayout(len));
    }
    let query = u32::decode(&mut data)?;
    let mut entries = Vec::with_capacity(len / 8);
    while !data.is_empty() {
        entries.push(TimeSeriesEntry {
            timestamp: u32::decode(&mut data)?,
            value: f32::decode(&mut data)?,
        });
    }
    Ok(Value::TimeSeries(TimeSeries { query, entries }))
}

fn decode_event_table(mut data: &[u8]) -> Result<Value, DecodeError> {
    let len = data.len();
    // A query timestamp plus n records: 4 * (5n + 1) bytes.
    if len % 4 != 0 || len / 4 == 0 || (len / 4 - 1) % 5 != 0 {
        return Err(DecodeError::EventTableLayout(len));
    }
    let query = u32::decode(&mut data)?;
    let mut entries = Vec::with_capacity((len / 4 - 1) / 5);
    while !data.is_empty() {
        entries.push(EventTableEntry {
            marker: u32::decode(&mut data)?,
            element2: u32::decode(&mut data)?,
            element3: u32::decode(&mut data)?,
            element4: u32::decode(&mut data)?,
            element5: u32::decode(&mut data)?,
        });
    }
    Ok(Value::EventTable(EventTable { query, entries }))
}
