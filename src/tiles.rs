//! Tile-header table (C4): the fixed-length array of per-tile records
//! stored immediately after the file header.

use bit_field::BitField;

use crate::error::{Error, ErrorKind, Result};
use crate::header::{ImageParams, HEADER_BYTES};
use crate::io::{self, PositionedFile};

/// One on-disk tile record.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    /// `bands` bits, MSB-first within each byte; bit `b` set ⇔ band `b`
    /// is uniform.
    pub uniform_flags: Vec<u8>,
    /// `bands * data_unit_size` bytes; slot `b` holds the common pixel for
    /// band `b` when its uniform bit is set.
    pub uniform_pixel_values: Vec<u8>,
    /// Index into the block region, or -1 when every band is uniform.
    pub block_num: i32,
}

impl TileRecord {
    pub fn new_uniform(params: &ImageParams) -> Self {
        let mut uniform_flags = vec![0u8; params.n_uniform_flags() as usize];
        for byte in uniform_flags.iter_mut() {
            *byte = 0xFF;
        }

        TileRecord {
            uniform_flags,
            uniform_pixel_values: vec![0u8; (params.bands * params.data_unit_size) as usize],
            block_num: -1,
        }
    }

    pub fn is_band_uniform(&self, band: u32) -> bool {
        let byte = (band / 8) as usize;
        let bit = 7 - (band % 8);
        self.uniform_flags[byte].get_bit(bit as usize)
    }

    pub fn set_band_uniform(&mut self, band: u32, uniform: bool) {
        let byte = (band / 8) as usize;
        let bit = 7 - (band % 8);
        self.uniform_flags[byte].set_bit(bit as usize, uniform);
    }

    pub fn uniform_pixel(&self, band: u32, data_unit_size: u32) -> &[u8] {
        let start = (band * data_unit_size) as usize;
        &self.uniform_pixel_values[start..start + data_unit_size as usize]
    }

    pub fn set_uniform_pixel(&mut self, band: u32, data_unit_size: u32, value: &[u8]) {
        let start = (band * data_unit_size) as usize;
        self.uniform_pixel_values[start..start + data_unit_size as usize].copy_from_slice(value);
    }

    /// Shallow ("all bands uniform") test: trailing bits above `bands - 1`
    /// in the last flag byte are neutralized before checking that every
    /// byte reads `0xFF`.
    pub fn all_bands_uniform(&self, bands: u32) -> bool {
        let trailing = bands % 8;
        let mut flags = self.uniform_flags.clone();

        if trailing != 0 {
            if let Some(last) = flags.last_mut() {
                *last |= 0xFFu8 >> (8 - trailing);
            }
        }

        flags.iter().all(|&byte| byte == 0xFF)
    }

    fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(
            self.uniform_pixel_values.len() + self.uniform_flags.len() + 4,
        );
        buffer.extend_from_slice(&self.uniform_pixel_values);
        buffer.extend_from_slice(&self.uniform_flags);
        buffer.extend_from_slice(&io::encode_i32(self.block_num));
        buffer
    }

    fn decode(bytes: &[u8], params: &ImageParams) -> Self {
        let pixel_len = (params.bands * params.data_unit_size) as usize;
        let flags_len = params.n_uniform_flags() as usize;

        let uniform_pixel_values = bytes[0..pixel_len].to_vec();
        let uniform_flags = bytes[pixel_len..pixel_len + flags_len].to_vec();
        let block_num = io::decode_i32(&bytes[pixel_len + flags_len..pixel_len + flags_len + 4]);

        TileRecord { uniform_flags, uniform_pixel_values, block_num }
    }
}

/// In-memory array of tile records.
#[derive(Debug, Clone)]
pub struct TileTable {
    records: Vec<TileRecord>,
}

impl TileTable {
    pub fn new_uniform(params: &ImageParams) -> Self {
        let records = (0..params.n_tiles()).map(|_| TileRecord::new_uniform(params)).collect();
        TileTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, tile: usize) -> Result<&TileRecord> {
        self.records.get(tile).ok_or_else(|| Error::new(ErrorKind::InvalidTileNo, "tiles::get"))
    }

    pub fn get_mut(&mut self, tile: usize) -> Result<&mut TileRecord> {
        self.records.get_mut(tile).ok_or_else(|| Error::new(ErrorKind::InvalidTileNo, "tiles::get_mut"))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TileRecord> {
        self.records.iter()
    }

    pub fn read_all(file: &mut PositionedFile, params: &ImageParams) -> Result<Self> {
        let record_bytes = params.tile_header_bytes() as usize;
        let mut records = Vec::with_capacity(params.n_tiles() as usize);

        let mut scratch = vec![0u8; record_bytes];
        for tile in 0..params.n_tiles() as u64 {
            let offset = HEADER_BYTES as u64 + tile * record_bytes as u64;
            file.read_at(offset, &mut scratch)?;
            records.push(TileRecord::decode(&scratch, params));
        }

        Ok(TileTable { records })
    }

    pub fn write_all(&self, file: &mut PositionedFile, params: &ImageParams) -> Result<()> {
        let record_bytes = params.tile_header_bytes() as usize;

        for (tile, record) in self.records.iter().enumerate() {
            let offset = HEADER_BYTES as u64 + tile as u64 * record_bytes as u64;
            file.write_at(offset, &record.encode())?;
        }

        Ok(())
    }

    pub fn write_one(&self, file: &mut PositionedFile, params: &ImageParams, tile: usize) -> Result<()> {
        let record = self.get(tile)?;
        let record_bytes = params.tile_header_bytes() as usize;
        let offset = HEADER_BYTES as u64 + tile as u64 * record_bytes as u64;
        file.write_at(offset, &record.encode())
    }
}
