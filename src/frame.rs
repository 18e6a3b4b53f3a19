//! Frame construction and streaming frame reception.
//!
//! The wire format is a start token followed by the escaped logical
//! content:
//!
//! | Field     | Size   | Description |
//! |-----------|--------|-------------|
//! | `start`   | 1      | [`START_TOKEN`], never escaped. |
//! | `command` | 1      | A [`Command`] code. |
//! | `length`  | 1 or 2 | Big-endian, counts address + OID + payload. 2 bytes for long commands. |
//! | `address` | 0 or 4 | Plant address, only for plant commands. |
//! | `oid`     | 4      | Object identifier. |
//! | `payload` | n      | Encoded payload, see [`encode_value`](crate::value::encode_value). |
//! | `crc16`   | 2      | Checksum over command through payload, see [`crc16`]. |
//!
//! Length and CRC are measured in logical bytes: any [`START_TOKEN`] or
//! [`ESCAPE_TOKEN`] occurring in the content is preceded by an
//! [`ESCAPE_TOKEN`] on the wire, and those inserted bytes are invisible to
//! both counters.

use core::fmt;

use log::{debug, trace};
use thiserror::Error;

use crate::command::Command;
use crate::crc::{crc16, RCT_CRC16};
use crate::encode::append;

/// Token that starts a frame.
pub const START_TOKEN: u8 = 0x2B;
/// Token that escapes the next byte.
pub const ESCAPE_TOKEN: u8 = 0x2D;

/// Returned when [`make_frame`] is given inconsistent inputs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameBuildError {
    /// A plant command was built without an address.
    #[error("command {0:?} requires a plant address")]
    MissingAddress(Command),

    /// A non-plant command was built with an address.
    #[error("command {0:?} does not carry a plant address")]
    UnexpectedAddress(Command),

    /// The payload is too large for the command's length field.
    #[error("length {length} overflows the length field of {command:?}")]
    LengthOverflow { command: Command, length: usize },
}

/// Returned when [`ReceiveFrame`] hits corrupt input.
///
/// Every variant is terminal for the instance it came from and carries the
/// number of raw bytes the failing [`consume`](ReceiveFrame::consume) call
/// took, so the caller can advance its buffer and resync with a fresh
/// receiver.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveError {
    /// The command byte is not in the known set.
    #[error("unknown command byte {command:#04x}")]
    InvalidCommand { command: u8, consumed: usize },

    /// The received checksum does not match the computed one.
    #[error("CRC mismatch, received {received:#06x} but calculated {calculated:#06x}")]
    CrcMismatch {
        received: u16,
        calculated: u16,
        consumed: usize,
    },

    /// More payload arrived than the length field declared, or the length
    /// field cannot cover the frame's fixed fields. Both point at a corrupt
    /// length.
    #[error("frame data exceeds the declared length")]
    FrameLengthExceeded { consumed: usize },
}

impl ReceiveError {
    /// Raw bytes consumed by the `consume` call that produced this error.
    pub const fn consumed(&self) -> usize {
        match self {
            Self::InvalidCommand { consumed, .. }
            | Self::CrcMismatch { consumed, .. }
            | Self::FrameLengthExceeded { consumed } => *consumed,
        }
    }
}

/// Builds a complete outbound frame, ready to be written to the socket.
///
/// `address` must be given exactly when `command` is a plant command. Read
/// commands carry no payload; any payload passed with one is dropped, the
/// device replies based on the OID alone.
///
/// ```
/// use rct_serial::{make_frame, Command};
///
/// let frame = make_frame(Command::Read, 0x959930BF, &[], None)?;
/// assert_eq!(frame, [0x2B, 0x01, 0x04, 0x95, 0x99, 0x30, 0xBF, 0x0D, 0x65]);
/// # Ok::<(), rct_serial::FrameBuildError>(())
/// ```
pub fn make_frame(
    command: Command,
    id: u32,
    payload: &[u8],
    address: Option<u32>,
) -> Result<Vec<u8>, FrameBuildError> {
    let address = match (command.is_plant(), address) {
        (true, Some(address)) => Some(address),
        (true, None) => return Err(FrameBuildError::MissingAddress(command)),
        (false, Some(_)) => return Err(FrameBuildError::UnexpectedAddress(command)),
        (false, None) => None,
    };

    let payload: &[u8] = if matches!(command, Command::Read | Command::PlantRead) {
        &[]
    } else {
        payload
    };

    let length = 4 + payload.len() + if command.is_plant() { 4 } else { 0 };
    let max = if command.is_long() {
        u16::MAX as usize
    } else {
        u8::MAX as usize
    };
    if length > max {
        return Err(FrameBuildError::LengthOverflow { command, length });
    }

    let mut content = Vec::with_capacity(length + 5);
    append(&mut content, &(command as u8));
    if command.is_long() {
        append(&mut content, &(length as u16));
    } else {
        append(&mut content, &(length as u8));
    }
    if let Some(address) = address {
        append(&mut content, &address);
    }
    append(&mut content, &id);
    append(&mut content, &payload);
    let crc = crc16(&content);
    append(&mut content, &crc);

    let mut frame = Vec::with_capacity(content.len() + 1);
    frame.push(START_TOKEN);
    for byte in content {
        if byte == START_TOKEN || byte == ESCAPE_TOKEN {
            frame.push(ESCAPE_TOKEN);
        }
        frame.push(byte);
    }
    Ok(frame)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitStart,
    AwaitCommand,
    AwaitLength,
    AwaitAddress,
    AwaitOid,
    AwaitPayload,
    AwaitCrc,
    Complete,
    Failed,
}

/// Incremental parser for one inbound frame.
///
/// Feed raw socket bytes through [`consume`](Self::consume) until
/// [`complete`](Self::complete) turns true; the accessors then hold the
/// decoded fields. One instance parses exactly one frame: after completion
/// or an error it consumes nothing further, construct a fresh one to
/// continue with the rest of the buffer.
///
/// Input before the first start token is discarded without error, devices
/// are known to prepend a stray NUL. A transient shortage of input is not
/// an error either, `consume` simply returns and `complete` stays false.
pub struct ReceiveFrame {
    state: State,
    escaping: bool,
    permissive: bool,
    crc_ok: bool,
    /// Running checksum over the logical content, command through payload.
    digest: Option<crc::Digest<'static, u16>>,
    /// Count of bytes fed to `digest`, for the odd-length padding rule.
    crc_len: usize,
    /// Accumulator for the fixed-width fields.
    field: [u8; 4],
    field_len: usize,
    length_width: usize,
    plant: bool,
    payload_len: usize,
    command: Option<Command>,
    id: u32,
    address: u32,
    payload: Vec<u8>,
}

impl ReceiveFrame {
    /// Creates a receiver for one frame.
    pub fn new() -> Self {
        Self {
            state: State::AwaitStart,
            escaping: false,
            permissive: false,
            crc_ok: false,
            digest: Some(RCT_CRC16.digest()),
            crc_len: 0,
            field: [0; 4],
            field_len: 0,
            length_width: 1,
            plant: false,
            payload_len: 0,
            command: None,
            id: 0,
            address: 0,
            payload: Vec::new(),
        }
    }

    /// Creates a receiver that completes frames even when their CRC does
    /// not match, for inspecting traffic from misbehaving devices. The
    /// mismatch is still visible through [`crc_ok`](Self::crc_ok).
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::new()
        }
    }

    /// Whether the frame has been fully received.
    pub fn complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Whether the received checksum matched the computed one. Only
    /// meaningful once the frame is complete; a strict receiver never
    /// completes with a mismatch.
    pub fn crc_ok(&self) -> bool {
        self.crc_ok
    }

    /// The frame's command, `None` until the command byte was decoded.
    pub fn command(&self) -> Option<Command> {
        self.command
    }

    /// The frame's OID, 0 until decoded.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The plant address, 0 unless the frame is a plant frame.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The received payload so far. Borrowed from the receiver's buffer;
    /// copy it out if it must outlive the receiver.
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes raw bytes and returns how many were taken, including
    /// discarded garbage before the start token and escape bytes.
    ///
    /// Stops early once the frame completes, leaving the remainder for the
    /// caller's next frame. A terminal receiver returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Corrupt input fails with a [`ReceiveError`] and poisons the
    /// receiver; the error's `consumed` count tells the caller how far to
    /// advance its buffer before resyncing.
    pub fn consume(&mut self, data: &[u8]) -> Result<usize, ReceiveError> {
        if matches!(self.state, State::Complete | State::Failed) {
            return Ok(0);
        }

        let mut consumed = 0;
        for &raw in data {
            consumed += 1;

            if self.state == State::AwaitStart {
                if raw == START_TOKEN {
                    trace!("synchronized to start token");
                    self.state = State::AwaitCommand;
                }
                continue;
            }

            // Escape decoding. The byte after an escape is taken verbatim,
            // a lone escape at the end of input waits for the next call.
            let byte = if self.escaping {
                self.escaping = false;
                raw
            } else if raw == ESCAPE_TOKEN {
                self.escaping = true;
                continue;
            } else {
                raw
            };

            match self.state {
                State::AwaitCommand => {
                    let Some(command) = Command::from_u8(byte) else {
                        self.state = State::Failed;
                        return Err(ReceiveError::InvalidCommand {
                            command: byte,
                            consumed,
                        });
                    };
                    self.push_logical(byte);
                    self.command = Some(command);
                    self.length_width = command.length_width();
                    self.plant = command.is_plant();
                    self.state = State::AwaitLength;
                    trace!("command {command:?}");
                }
                State::AwaitLength => {
                    self.push_logical(byte);
                    self.field[self.field_len] = byte;
                    self.field_len += 1;
                    if self.field_len == self.length_width {
                        let declared = if self.length_width == 2 {
                            u16::from_be_bytes([self.field[0], self.field[1]]) as usize
                        } else {
                            self.field[0] as usize
                        };
                        let fixed = if self.plant { 8 } else { 4 };
                        if declared < fixed {
                            self.state = State::Failed;
                            return Err(ReceiveError::FrameLengthExceeded { consumed });
                        }
                        self.payload_len = declared - fixed;
                        self.payload.reserve(self.payload_len);
                        self.field_len = 0;
                        self.state = if self.plant {
                            State::AwaitAddress
                        } else {
                            State::AwaitOid
                        };
                        trace!("expecting {} payload bytes", self.payload_len);
                    }
                }
                State::AwaitAddress => {
                    self.push_logical(byte);
                    self.field[self.field_len] = byte;
                    self.field_len += 1;
                    if self.field_len == 4 {
                        self.address = u32::from_be_bytes(self.field);
                        self.field_len = 0;
                        self.state = State::AwaitOid;
                    }
                }
                State::AwaitOid => {
                    self.push_logical(byte);
                    self.field[self.field_len] = byte;
                    self.field_len += 1;
                    if self.field_len == 4 {
                        self.id = u32::from_be_bytes(self.field);
                        self.field_len = 0;
                        self.state = if self.payload_len == 0 {
                            State::AwaitCrc
                        } else {
                            State::AwaitPayload
                        };
                    }
                }
                State::AwaitPayload => {
                    // Invariant guard, a correct length transition leaves
                    // this state at exactly `payload_len` bytes.
                    if self.payload.len() >= self.payload_len {
                        self.state = State::Failed;
                        return Err(ReceiveError::FrameLengthExceeded { consumed });
                    }
                    self.push_logical(byte);
                    self.payload.push(byte);
                    if self.payload.len() == self.payload_len {
                        self.state = State::AwaitCrc;
                    }
                }
                State::AwaitCrc => {
                    self.field[self.field_len] = byte;
                    self.field_len += 1;
                    if self.field_len == 2 {
                        let received = u16::from_be_bytes([self.field[0], self.field[1]]);
                        let calculated = self.finalize_crc();
                        if received == calculated {
                            self.crc_ok = true;
                        } else if self.permissive {
                            debug!(
                                "completing frame despite CRC mismatch, received \
                                 {received:#06x} but calculated {calculated:#06x}"
                            );
                        } else {
                            self.state = State::Failed;
                            return Err(ReceiveError::CrcMismatch {
                                received,
                                calculated,
                                consumed,
                            });
                        }
                        self.state = State::Complete;
                        trace!(
                            "frame complete: command {:?}, id {:#010x}, {} payload bytes",
                            self.command,
                            self.id,
                            self.payload.len()
                        );
                    }
                }
                // Start is handled before escape decoding, terminal states
                // before the loop.
                State::AwaitStart | State::Complete | State::Failed => {}
            }

            if self.state == State::Complete {
                break;
            }
        }
        Ok(consumed)
    }

    fn push_logical(&mut self, byte: u8) {
        if let Some(digest) = self.digest.as_mut() {
            digest.update(&[byte]);
        }
        self.crc_len += 1;
    }

    fn finalize_crc(&mut self) -> u16 {
        let mut digest = self.digest.take().unwrap_or_else(|| RCT_CRC16.digest());
        if self.crc_len % 2 != 0 {
            digest.update(&[0x00]);
        }
        digest.finalize()
    }
}

impl Default for ReceiveFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReceiveFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveFrame")
            .field("state", &self.state)
            .field("command", &self.command)
            .field("id", &self.id)
            .field("address", &self.address)
            .field("payload_len", &self.payload.len())
            .field("crc_ok", &self.crc_ok)
            .finish_non_exhaustive()
    }
}
