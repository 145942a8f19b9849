//! Meta-data store (C8): a keyed byte-blob dictionary persisted right
//! after the last used block.

use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};
use crate::io::{self, PositionedFile};

/// Reserved key naming the projection WKT string.
pub const KEY_PROJECTION: &[u8] = b"_sif_proj";
/// Reserved key naming the user-data-type convention ("simple" facade).
pub const KEY_AGREEMENT: &[u8] = b"_sif_agree";

pub fn is_reserved(key: &[u8]) -> bool {
    key.starts_with(b"_sif_")
}

/// Unordered key -> value dictionary. Any reasonable hash suffices;
/// `std::HashMap` is the idiomatic choice here.
#[derive(Debug, Clone, Default)]
pub struct MetaStore {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl MetaStore {
    pub fn new() -> Self {
        MetaStore { entries: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &[u8]) -> Result<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
            .ok_or_else(|| Error::new(ErrorKind::MetaDataKey, "metadata::get"))
    }

    /// Like [`Self::get`], but requires the value to contain a NUL byte
    /// (the string convenience API is conventionally NUL-terminated).
    pub fn get_string(&self, key: &[u8]) -> Result<&[u8]> {
        let value = self.get(key)?;
        if !value.contains(&0) {
            return Err(Error::new(ErrorKind::MetaDataValue, "metadata::get_string"));
        }
        Ok(value)
    }

    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::new(ErrorKind::MetaDataKey, "metadata::remove"))
    }

    pub fn keys(&self) -> Vec<&[u8]> {
        self.entries.keys().map(Vec::as_slice).collect()
    }

    /// Empty string for a missing key; this convenience accessor never
    /// surfaces `KeyNotFound`.
    pub fn get_projection(&self) -> String {
        self.get_string(KEY_PROJECTION)
            .map(|bytes| String::from_utf8_lossy(strip_nul(bytes)).into_owned())
            .unwrap_or_default()
    }

    pub fn set_projection(&mut self, wkt: &str) {
        self.set(KEY_PROJECTION, nul_terminated(wkt));
    }

    pub fn get_agreement(&self) -> String {
        self.get_string(KEY_AGREEMENT)
            .map(|bytes| String::from_utf8_lossy(strip_nul(bytes)).into_owned())
            .unwrap_or_default()
    }

    pub fn set_agreement(&mut self, agreement: &str) {
        self.set(KEY_AGREEMENT, nul_terminated(agreement));
    }

    /// Read exactly `n_keys` records starting at `offset`. Any short read
    /// aborts and releases the partially-read store.
    pub fn read_all(file: &mut PositionedFile, offset: u64, n_keys: i32) -> Result<Self> {
        let mut store = MetaStore::new();
        let mut cursor = offset;

        for _ in 0..n_keys {
            let mut len_buffer = [0u8; 4];
            file.read_at(cursor, &mut len_buffer).map_err(|_| Error::new(ErrorKind::Read, "metadata::read_all/key_len"))?;
            let key_length = io::decode_i32(&len_buffer);
            if key_length <= 0 {
                return Err(Error::new(ErrorKind::MetaDataKey, "metadata::read_all/key_len"));
            }
            cursor += 4;

            let mut key = vec![0u8; key_length as usize];
            file.read_at(cursor, &mut key).map_err(|_| Error::new(ErrorKind::Read, "metadata::read_all/key"))?;
            cursor += key_length as u64;

            file.read_at(cursor, &mut len_buffer).map_err(|_| Error::new(ErrorKind::Read, "metadata::read_all/value_len"))?;
            let value_length = io::decode_i32(&len_buffer);
            if value_length < 0 {
                return Err(Error::new(ErrorKind::MetaDataValue, "metadata::read_all/value_len"));
            }
            cursor += 4;

            let mut value = vec![0u8; value_length as usize];
            file.read_at(cursor, &mut value).map_err(|_| Error::new(ErrorKind::Read, "metadata::read_all/value"))?;
            cursor += value_length as u64;

            store.entries.insert(key, value);
        }

        Ok(store)
    }

    /// Write every entry at `offset` with no padding and no key ordering
    /// guarantee. Returns the offset one past the last byte written,
    /// which the caller truncates the file to (the `+1` is a bit-exact
    /// compatibility quirk of the on-disk format).
    pub fn write_all(&self, file: &mut PositionedFile, offset: u64) -> Result<u64> {
        let mut cursor = offset;

        for (key, value) in &self.entries {
            file.write_at(cursor, &io::encode_i32(key.len() as i32))?;
            cursor += 4;
            file.write_at(cursor, key)?;
            cursor += key.len() as u64;

            file.write_at(cursor, &io::encode_i32(value.len() as i32))?;
            cursor += 4;
            file.write_at(cursor, value)?;
            cursor += value.len() as u64;
        }

        Ok(cursor + 1)
    }
}

fn nul_terminated(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn strip_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(at) => &bytes[..at],
        None => bytes,
    }
}
