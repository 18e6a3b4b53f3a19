//! Implementation of the serial communication protocol spoken by [RCT Power]
//! solar inverters over TCP, usually on port 8899.
//!
//! This crate is sans-I/O: it encodes outbound request frames, incrementally
//! decodes inbound frames from whatever byte chunks the transport delivers,
//! and converts typed payloads between their wire form and host values. It
//! never opens a socket; connection lifecycle, retries and timeouts stay
//! with the caller. The devices are known to silently drop requests and to
//! truncate responses at valid CRC boundaries when pre-empted by a
//! concurrent request, so a real client needs both.
//!
//! [RCT Power]: https://www.rct-power.com/
//!
//! Requests are built with [`make_frame`] and responses parsed with a
//! [`ReceiveFrame`] per frame:
//!
//! ```
//! use rct_serial::{decode_value, make_frame, Command, DataType, ReceiveFrame, Value};
//!
//! // Query the battery state of charge.
//! let request = make_frame(Command::Read, 0x959930BF, &[], None)?;
//!
//! // Feed whatever the socket returned; partial chunks are fine.
//! let response = [0x2B, 0x05, 0x08, 0x95, 0x99, 0x30, 0xBF, 0x3E, 0x97, 0xB1, 0x91, 0x9C, 0x86];
//! let mut frame = ReceiveFrame::new();
//! frame.consume(&response)?;
//! assert!(frame.complete());
//!
//! // The OID decides how the payload decodes.
//! let soc = decode_value(DataType::Float, frame.data())?;
//! assert!(matches!(soc, Value::Float(v) if (v - 0.296).abs() < 0.001));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Which `DataType` belongs to which OID is recorded in a [`Registry`] of
//! [`ObjectInfo`] entries. The registry's shape ships here; its content is
//! a large static table supplied by the embedding application.

pub mod command;
pub mod crc;
pub mod decode;
pub mod encode;
pub mod fault;
pub mod frame;
pub mod registry;
pub mod value;

pub use command::Command;
pub use crc::crc16;
pub use decode::{Decode, DecodeError};
pub use encode::Encode;
pub use fault::FaultBits;
pub use frame::{
    make_frame, FrameBuildError, ReceiveError, ReceiveFrame, ESCAPE_TOKEN, START_TOKEN,
};
pub use registry::{LookupError, ObjectGroup, ObjectInfo, Registry, RegistryError};
pub use value::{
    decode_value, encode_value, DataType, EncodeError, EventKind, EventTable, EventTableEntry,
    TimeSeries, TimeSeriesEntry, Value,
};
