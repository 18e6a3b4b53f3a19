//! Command codes used on the wire.

/// Bit set on the command byte for plant communication. Plant frames carry
/// a 4-byte address between the length field and the OID.
pub const PLANT_BIT: u8 = 0x40;

/// Commands understood by the protocol.
///
/// Every frame starts with one of these codes right after the start token.
/// The `Plant*` variants are the base commands with [`PLANT_BIT`] set and
/// address a specific device through a plant leader. The vendor app's
/// `EXTENSION` code (0x3C) switches to an undocumented sub-protocol and is
/// deliberately not part of this set; frames carrying it are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Requests the value of an OID.
    Read = 0x01,
    /// Writes a payload to an OID.
    Write = 0x02,
    /// Writes a payload too large for a 1-byte length field.
    LongWrite = 0x03,
    /// Reply to a read or write.
    Response = 0x05,
    /// Reply too large for a 1-byte length field.
    LongResponse = 0x06,
    /// Asks the device to push the OID periodically.
    ReadPeriodically = 0x08,
    /// [`Command::Read`] forwarded to an addressed peer.
    PlantRead = 0x41,
    /// [`Command::Write`] forwarded to an addressed peer.
    PlantWrite = 0x42,
    /// [`Command::LongWrite`] forwarded to an addressed peer.
    PlantLongWrite = 0x43,
    /// [`Command::Response`] from an addressed peer.
    PlantResponse = 0x45,
    /// [`Command::LongResponse`] from an addressed peer.
    PlantLongResponse = 0x46,
    /// [`Command::ReadPeriodically`] forwarded to an addressed peer.
    PlantReadPeriodically = 0x48,
}

impl Command {
    /// Decodes a command byte. Returns `None` for codes outside the known
    /// set, including the vendor's 0x3C extension escape.
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => Self::Read,
            0x02 => Self::Write,
            0x03 => Self::LongWrite,
            0x05 => Self::Response,
            0x06 => Self::LongResponse,
            0x08 => Self::ReadPeriodically,
            0x41 => Self::PlantRead,
            0x42 => Self::PlantWrite,
            0x43 => Self::PlantLongWrite,
            0x45 => Self::PlantResponse,
            0x46 => Self::PlantLongResponse,
            0x48 => Self::PlantReadPeriodically,
            _ => return None,
        })
    }

    /// Whether this command addresses a peer through a plant leader.
    /// Plant frames carry a 4-byte address field.
    pub const fn is_plant(self) -> bool {
        self as u8 & PLANT_BIT != 0
    }

    /// Whether this command uses a 2-byte length field.
    pub const fn is_long(self) -> bool {
        matches!(
            self,
            Self::LongWrite | Self::LongResponse | Self::PlantLongWrite | Self::PlantLongResponse
        )
    }

    /// Whether this command requests data from the device.
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::Read | Self::ReadPeriodically | Self::PlantRead | Self::PlantReadPeriodically
        )
    }

    /// Whether this command writes data to the device.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Write | Self::LongWrite | Self::PlantWrite | Self::PlantLongWrite
        )
    }

    /// Whether this command is a reply from the device.
    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::Response | Self::LongResponse | Self::PlantResponse | Self::PlantLongResponse
        )
    }

    /// Width of the length field in bytes, 2 for long commands and 1
    /// otherwise.
    pub const fn length_width(self) -> usize {
        if self.is_long() {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn round_trips_through_byte_form() {
        for cmd in [
            Command::Read,
            Command::Write,
            Command::LongWrite,
            Command::Response,
            Command::LongResponse,
            Command::ReadPeriodically,
            Command::PlantRead,
            Command::PlantWrite,
            Command::PlantLongWrite,
            Command::PlantResponse,
            Command::PlantLongResponse,
            Command::PlantReadPeriodically,
        ] {
            assert_eq!(Command::from_u8(cmd as u8), Some(cmd));
        }
    }

    #[test]
    fn rejects_unknown_bytes() {
        assert_eq!(Command::from_u8(0x00), None);
        assert_eq!(Command::from_u8(0x04), None);
        assert_eq!(Command::from_u8(0xFF), None);
        // The extension escape is never accepted.
        assert_eq!(Command::from_u8(0x3C), None);
        assert_eq!(Command::from_u8(0x7C), None);
    }

    #[test]
    fn classification() {
        assert!(Command::PlantRead.is_plant());
        assert!(!Command::Read.is_plant());
        assert!(Command::PlantLongResponse.is_long());
        assert!(Command::PlantLongResponse.is_response());
        assert!(!Command::Response.is_long());
        assert!(Command::LongWrite.is_write());
        assert!(!Command::ReadPeriodically.is_write());
        assert_eq!(Command::LongWrite.length_width(), 2);
        assert_eq!(Command::Write.length_width(), 1);
    }
}
