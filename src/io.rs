//! Endian primitives (C1) and the positioned file I/O adapter (C2).
//!
//! Every multi-byte integer on disk is big-endian; `f64` is big-endian for
//! format version >= 2 and raw host-order for version 1 (see
//! [`crate::header`]). This module never looks at `version` itself, the
//! header codec picks which encode/decode path to call.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, ErrorKind, Result};

/// Byte order of a value as stored on disk, used by the "simple" facade
/// to decide whether a buffer needs swapping at the user boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub const fn host() -> Endian {
        #[cfg(target_endian = "big")]
        { Endian::Big }
        #[cfg(target_endian = "little")]
        { Endian::Little }
    }
}

pub fn encode_i32(value: i32) -> [u8; 4] {
    let mut buffer = [0u8; 4];
    BigEndian::write_i32(&mut buffer, value);
    buffer
}

pub fn decode_i32(bytes: &[u8]) -> i32 {
    BigEndian::read_i32(bytes)
}

pub fn encode_u64(value: u64) -> [u8; 8] {
    let mut buffer = [0u8; 8];
    BigEndian::write_u64(&mut buffer, value);
    buffer
}

pub fn decode_u64(bytes: &[u8]) -> u64 {
    BigEndian::read_u64(bytes)
}

pub fn encode_f64(value: f64) -> [u8; 8] {
    let mut buffer = [0u8; 8];
    BigEndian::write_f64(&mut buffer, value);
    buffer
}

pub fn decode_f64(bytes: &[u8]) -> f64 {
    BigEndian::read_f64(bytes)
}

/// In-place byte-swap of a buffer of fixed-size elements.
///
/// Each element is reversed independently: byte `i` trades places with its
/// mirror byte `elem_size - 1 - i` within the same element, never with a
/// byte belonging to a different element.
pub fn swap_bytes(buffer: &mut [u8], elem_size: usize) {
    debug_assert!(matches!(elem_size, 1 | 2 | 4 | 8));
    debug_assert_eq!(buffer.len() % elem_size, 0);

    for element in buffer.chunks_exact_mut(elem_size) {
        for i in 0..elem_size / 2 {
            element.swap(i, elem_size - 1 - i);
        }
    }
}

/// No-op if `code` already matches the host's endianness, else [`swap_bytes`].
pub fn host_to_code(buffer: &mut [u8], elem_size: usize, code: Endian) {
    if code != Endian::host() {
        swap_bytes(buffer, elem_size);
    }
}

/// Inverse of [`host_to_code`]; swapping is its own inverse so this is the
/// same operation, kept as a distinct name because call sites read more
/// naturally as "convert from wire code to host".
pub fn code_to_host(buffer: &mut [u8], elem_size: usize, code: Endian) {
    host_to_code(buffer, elem_size, code)
}

/// Positioned read/write/seek/truncate over a file, with a sticky first
/// error: once an operation fails, the handle latches that error kind and
/// every subsequent operation short-circuits with it.
#[derive(Debug)]
pub struct PositionedFile {
    file: File,
    read_only: bool,
    sticky: Option<ErrorKind>,
}

impl PositionedFile {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true).write(true).create(true).truncate(true)
            .open(path)
            .map_err(|e| Error::io("create", e))?;

        Ok(PositionedFile { file, read_only: false, sticky: None })
    }

    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true).write(!read_only)
            .open(path)
            .map_err(|e| Error::io("open", e))?;

        Ok(PositionedFile { file, read_only, sticky: None })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn sticky_error(&self) -> Option<ErrorKind> {
        self.sticky
    }

    fn check_sticky(&self) -> Result<()> {
        match self.sticky {
            Some(kind) => Err(Error::new(kind, "sticky")),
            None => Ok(()),
        }
    }

    fn latch(&mut self, kind: ErrorKind) {
        if self.sticky.is_none() {
            self.sticky = Some(kind);
        }
    }

    pub fn read_at(&mut self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        self.check_sticky()?;

        self.file.seek(SeekFrom::Start(offset)).map_err(|e| {
            self.latch(ErrorKind::Seek);
            Error::io("read_at/seek", e)
        })?;

        self.file.read_exact(buffer).map_err(|e| {
            self.latch(ErrorKind::Read);
            Error::io("read_at", e)
        })
    }

    pub fn write_at(&mut self, offset: u64, buffer: &[u8]) -> Result<()> {
        self.check_sticky()?;

        if self.read_only {
            return Err(Error::new(ErrorKind::InvalidFileMode, "write_at"));
        }

        self.file.seek(SeekFrom::Start(offset)).map_err(|e| {
            self.latch(ErrorKind::Seek);
            Error::io("write_at/seek", e)
        })?;

        self.file.write_all(buffer).map_err(|e| {
            self.latch(ErrorKind::Write);
            Error::io("write_at", e)
        })
    }

    pub fn len(&mut self) -> Result<u64> {
        self.check_sticky()?;
        self.file.seek(SeekFrom::End(0)).map_err(|e| {
            self.latch(ErrorKind::Seek);
            Error::io("len/seek", e)
        })
    }

    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.check_sticky()?;

        if self.read_only {
            return Err(Error::new(ErrorKind::InvalidFileMode, "truncate"));
        }

        self.file.set_len(len).map_err(|e| {
            self.latch(ErrorKind::Truncate);
            Error::io("truncate", e)
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.check_sticky()?;
        self.file.flush().map_err(|e| {
            self.latch(ErrorKind::Write);
            Error::io("flush", e)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn swap_bytes_reverses_each_element_independently() {
        let mut buffer = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        swap_bytes(&mut buffer, 4);
        assert_eq!(buffer, [0x44, 0x33, 0x22, 0x11, 0x88, 0x77, 0x66, 0x55]);
    }

    #[test]
    fn swap_bytes_is_involution() {
        let mut buffer = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let original = buffer;
        swap_bytes(&mut buffer, 2);
        swap_bytes(&mut buffer, 2);
        assert_eq!(buffer, original);
    }

    #[test]
    fn encode_decode_i32_roundtrip() {
        let bytes = encode_i32(-12345);
        assert_eq!(decode_i32(&bytes), -12345);
        assert_eq!(bytes, [0xFF, 0xFF, 0xCF, 0xC7]);
    }

    #[test]
    fn encode_decode_f64_roundtrip() {
        let bytes = encode_f64(3.5);
        assert_eq!(decode_f64(&bytes), 3.5);
    }

    #[test]
    fn host_to_code_noop_when_codes_match() {
        let mut buffer = [1u8, 2, 3, 4];
        let original = buffer;
        host_to_code(&mut buffer, 4, Endian::host());
        assert_eq!(buffer, original);
    }

    #[test]
    fn positioned_file_roundtrips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.bin");
        let mut file = PositionedFile::create(&path).unwrap();
        file.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut buffer = [0u8; 4];
        file.read_at(10, &mut buffer).unwrap();
        assert_eq!(buffer, [1, 2, 3, 4]);
    }

    #[test]
    fn opening_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(PositionedFile::open(&path, false).is_err());
    }

    #[test]
    fn write_on_read_only_file_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.bin");
        PositionedFile::create(&path).unwrap();

        let mut file = PositionedFile::open(&path, true).unwrap();
        let result = file.write_at(0, &[1, 2, 3]);
        assert!(matches!(result, Err(e) if e.kind == ErrorKind::InvalidFileMode));
    }
}
