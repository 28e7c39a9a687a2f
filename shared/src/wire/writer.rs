/// Writes fixed-width little-endian values into a growable byte buffer.
/// Each write returns the number of bytes it appended.
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) -> usize {
        self.buffer.push(value);
        1
    }

    pub fn write_u16(&mut self, value: u16) -> usize {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        2
    }

    /// Writes the low 24 bits of `value` little-endian. The caller is
    /// responsible for ensuring the value fits; the top byte is dropped.
    pub fn write_u24(&mut self, value: u32) -> usize {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..3]);
        3
    }

    pub fn write_u32(&mut self, value: u32) -> usize {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        4
    }

    pub fn write_f32(&mut self, value: f32) -> usize {
        self.write_u32(value.to_bits())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        self.buffer.extend_from_slice(bytes);
        bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteReader;

    #[test]
    fn writes_report_byte_counts() {
        let mut writer = ByteWriter::new();
        assert_eq!(writer.write_u8(1), 1);
        assert_eq!(writer.write_u16(2), 2);
        assert_eq!(writer.write_u24(3), 3);
        assert_eq!(writer.write_u32(4), 4);
        assert_eq!(writer.write_f32(5.0), 4);
        assert_eq!(writer.len(), 14);
    }

    #[test]
    fn scalar_round_trip() {
        let mut writer = ByteWriter::new();
        writer.write_u8(0xab);
        writer.write_u16(0xbeef);
        writer.write_u24(0x00c0ffe);
        writer.write_u32(0xdeadbeef);
        writer.write_f32(-0.5);

        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0xab);
        assert_eq!(reader.read_u16().unwrap(), 0xbeef);
        assert_eq!(reader.read_u24().unwrap(), 0x00c0ffe);
        assert_eq!(reader.read_u32().unwrap(), 0xdeadbeef);
        assert_eq!(reader.read_f32().unwrap(), -0.5);
        assert_eq!(reader.remaining(), 0);
    }
}
