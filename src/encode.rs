/// A value that can be written into the logical-byte layer of a frame.
///
/// All multi-byte primitives travel big-endian on the wire.
pub trait Encode {
    /// Returns the number of bytes this value takes when encoded.
    fn size(&self) -> usize;

    /// Encodes this value into the front of the provided byte slice.
    fn encode(&self, data: &mut [u8]);
}

/// Encodes a value into a freshly allocated buffer.
pub fn encode_to_vec<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut data = vec![0; value.size()];
    value.encode(&mut data);
    data
}

/// Appends a value's encoding to an existing buffer.
pub fn append<T: Encode + ?Sized>(buf: &mut Vec<u8>, value: &T) {
    let start = buf.len();
    buf.resize(start + value.size(), 0);
    value.encode(&mut buf[start..]);
}

macro_rules! impl_encode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn size(&self) -> usize {
                    size_of::<Self>()
                }

                fn encode(&self, data: &mut [u8]) {
                    data[..size_of::<Self>()].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_encode_for_primitive!(u8, u16, u32, i8, i16, i32, f32);

impl Encode for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

impl Encode for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        self.as_slice().encode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::{append, encode_to_vec};

    #[test]
    fn primitives_are_big_endian() {
        assert_eq!(encode_to_vec(&0xC0DEu16), [0xC0, 0xDE]);
        assert_eq!(encode_to_vec(&0x959930BFu32), [0x95, 0x99, 0x30, 0xBF]);
        assert_eq!(encode_to_vec(&-2i16), [0xFF, 0xFE]);
        assert_eq!(
            encode_to_vec(&f32::from_bits(0x3E97B191)),
            [0x3E, 0x97, 0xB1, 0x91]
        );
    }

    #[test]
    fn append_grows_the_buffer() {
        let mut buf = vec![0x01];
        append(&mut buf, &0x0004u8);
        append(&mut buf, &0xC0DEu32);
        assert_eq!(buf, [0x01, 0x04, 0x00, 0x00, 0xC0, 0xDE]);
    }
}
