//! Scoped MSB-first bit output and the matching input.
//!
//! A [`BitSink`] pads its last byte and flushes exactly once: in
//! [`BitSink::finish`] when encoding succeeds, otherwise when it is dropped.
//! Errors from the drop path cannot be reported and are ignored.

use crate::error::{Error, Result};
use crate::huffman::Codeword;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use std::io::{self, Read, Write};

pub struct BitSink<W: Write> {
    /// `None` once finished
    writer: Option<BitWriter<W, BigEndian>>,
    bits_written: u64,
}

impl<W: Write> BitSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Some(BitWriter::endian(inner, BigEndian)),
            bits_written: 0,
        }
    }

    fn writer(&mut self) -> io::Result<&mut BitWriter<W, BigEndian>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("bit sink already finished"))
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.writer()?.write_bit(bit)?;
        self.bits_written += 1;
        Ok(())
    }

    /// Writes the low `bits` bits of `value`, most significant first.
    pub fn write_bits(&mut self, bits: u32, value: u64) -> Result<()> {
        if bits == 0 {
            return Ok(());
        }
        self.writer()?.write(bits, value)?;
        self.bits_written += u64::from(bits);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bits(32, u64::from(value))
    }

    pub fn write_codeword(&mut self, code: Codeword) -> Result<()> {
        self.write_bits(u32::from(code.len()), code.bits())
    }

    /// Bits written so far, padding excluded.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pads to a byte boundary, flushes and hands back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("bit sink already finished"))?;
        writer.byte_align()?;
        writer.flush()?;
        Ok(writer.into_writer())
    }
}

impl<W: Write> Drop for BitSink<W> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.byte_align();
            let _ = writer.flush();
        }
    }
}

/// Reads what a [`BitSink`] wrote.
pub struct BitSource<R: Read> {
    reader: BitReader<R, BigEndian>,
    bits_read: u64,
}

impl<R: Read> BitSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BitReader::endian(inner, BigEndian),
            bits_read: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        let bit = self.reader.read_bit().map_err(truncated)?;
        self.bits_read += 1;
        Ok(bit)
    }

    pub fn read_bits(&mut self, bits: u32) -> Result<u64> {
        if bits == 0 {
            return Ok(0);
        }
        let value = self.reader.read::<u64>(bits).map_err(truncated)?;
        self.bits_read += u64::from(bits);
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read::<u32>(32).map_err(truncated)?;
        self.bits_read += 32;
        Ok(value)
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }
}

/// Running out of input means the stream was cut short.
fn truncated(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::corrupt("bitstream ends early")
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts flushes so tests can check the scope guard.
    struct Recorder<'a> {
        bytes: &'a mut Vec<u8>,
        flushes: &'a mut usize,
    }

    impl Write for Recorder<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_msb_first_with_padding() {
        let mut sink = BitSink::new(Vec::new());
        sink.write_bit(true).unwrap();
        sink.write_bits(3, 0b010).unwrap();
        sink.write_bits(0, 0).unwrap();
        assert_eq!(sink.bits_written(), 4);
        let bytes = sink.finish().unwrap();
        assert_eq!(bytes, vec![0b1010_0000]);
    }

    #[test]
    fn test_read_back() {
        let mut sink = BitSink::new(Vec::new());
        sink.write_u32(0xDEAD_BEEF).unwrap();
        sink.write_codeword(Codeword::new(0b101, 3)).unwrap();
        sink.write_bits(64, u64::MAX).unwrap();
        let bytes = sink.finish().unwrap();

        let mut source = BitSource::new(bytes.as_slice());
        assert_eq!(source.read_u32().unwrap(), 0xDEAD_BEEF);
        assert!(source.read_bit().unwrap());
        assert!(!source.read_bit().unwrap());
        assert!(source.read_bit().unwrap());
        assert_eq!(source.read_bits(64).unwrap(), u64::MAX);
        assert_eq!(source.bits_read(), 99);
    }

    #[test]
    fn test_flush_once_on_finish() {
        let mut bytes = Vec::new();
        let mut flushes = 0;
        {
            let mut sink = BitSink::new(Recorder {
                bytes: &mut bytes,
                flushes: &mut flushes,
            });
            sink.write_bit(true).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(flushes, 1);
        assert_eq!(bytes, vec![0b1000_0000]);
    }

    #[test]
    fn test_flush_once_on_drop() {
        let mut bytes = Vec::new();
        let mut flushes = 0;
        {
            let mut sink = BitSink::new(Recorder {
                bytes: &mut bytes,
                flushes: &mut flushes,
            });
            sink.write_bits(2, 0b11).unwrap();
            // dropped without finish, e.g. on an early return
        }
        assert_eq!(flushes, 1);
        assert_eq!(bytes, vec![0b1100_0000]);
    }

    #[test]
    fn test_truncated_input() {
        let mut source = BitSource::new([0xFFu8].as_slice());
        assert_eq!(source.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(source.read_bit(), Err(Error::Corrupt(_))));
    }
}
