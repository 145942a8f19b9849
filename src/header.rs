//! Header codec (C3): encode/decode the fixed file header and gate the
//! format version.

use std::convert::TryInto;

use crate::error::{Error, ErrorKind, Result};
use crate::io;
use crate::math::compute_tile_count;

/// Literal ASCII magic at byte offset 4 of the file.
pub const MAGIC: [u8; 8] = *b"!**SIF**";

/// The format version this crate writes by default and the newest version
/// it knows how to read.
pub const LIBRARY_VERSION: i32 = 2;

/// Fixed size of the on-disk header: 80 bytes of integers followed by six
/// big/host-order doubles.
pub const HEADER_BYTES: usize = 80 + 6 * 8;

/// Immutable-after-create image parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub data_unit_size: u32,
    pub user_data_type: i32,
    pub consolidate: bool,
    pub defragment: bool,
    pub intrinsic_write: bool,
    /// The version this file was created with / last read as.
    pub version: i32,
    pub affine_geo_transform: [f64; 6],
}

impl ImageParams {
    pub fn n_tiles_across(&self) -> u32 {
        compute_tile_count(self.width, self.tile_width)
    }

    pub fn n_tiles_down(&self) -> u32 {
        compute_tile_count(self.height, self.tile_height)
    }

    pub fn n_tiles(&self) -> u32 {
        self.n_tiles_across() * self.n_tiles_down()
    }

    pub fn units_per_slice(&self) -> u32 {
        self.tile_width * self.tile_height
    }

    pub fn tile_bytes(&self) -> u32 {
        self.units_per_slice() * self.bands * self.data_unit_size
    }

    pub fn n_uniform_flags(&self) -> u32 {
        (self.bands + 7) / 8
    }

    /// Bytes consumed by one on-disk tile record: the uniform pixel
    /// values, the uniform-flags bitset, and the `i32` block number.
    pub fn tile_header_bytes(&self) -> u32 {
        self.bands * self.data_unit_size + self.n_uniform_flags() + 4
    }

    pub fn base_location(&self) -> u64 {
        HEADER_BYTES as u64 + self.n_tiles() as u64 * self.tile_header_bytes() as u64
    }

    pub(crate) fn validate_dimensions(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.bands == 0
            || self.tile_width == 0 || self.tile_height == 0 || self.data_unit_size == 0
        {
            return Err(Error::new(ErrorKind::InvalidTileSize, "validate_dimensions"));
        }
        Ok(())
    }
}

fn write_i32(buffer: &mut Vec<u8>, value: i32) {
    buffer.extend_from_slice(&io::encode_i32(value));
}

fn write_bool_flag(buffer: &mut Vec<u8>, value: bool) {
    write_i32(buffer, if value { 1 } else { 0 });
}

/// Encode the header. `n_keys` is the live meta-data entry count at flush
/// time; `use_file_version` is the wire version to encode with (it may
/// differ from `params.version` only in the narrow "rewrite a v1 file as
/// v2" scenario exercised by [`crate::file::SifFile::use_file_format_version`]).
pub fn encode(params: &ImageParams, n_keys: i32, use_file_version: i32) -> Result<Vec<u8>> {
    if use_file_version < 1 {
        return Err(Error::new(ErrorKind::CannotWriteVersion, "encode"));
    }

    let mut buffer = Vec::with_capacity(HEADER_BYTES);

    // header_bytes is rewritten below once the true length is known.
    write_i32(&mut buffer, 0);
    buffer.extend_from_slice(&MAGIC);
    write_i32(&mut buffer, use_file_version);
    write_i32(&mut buffer, params.width as i32);
    write_i32(&mut buffer, params.height as i32);
    write_i32(&mut buffer, params.bands as i32);
    write_i32(&mut buffer, n_keys);
    write_i32(&mut buffer, params.n_tiles() as i32);
    write_i32(&mut buffer, params.tile_width as i32);
    write_i32(&mut buffer, params.tile_height as i32);
    write_i32(&mut buffer, params.tile_bytes() as i32);
    write_i32(&mut buffer, params.n_tiles_across() as i32);
    write_i32(&mut buffer, params.data_unit_size as i32);
    write_i32(&mut buffer, params.user_data_type);
    write_bool_flag(&mut buffer, params.defragment);
    write_bool_flag(&mut buffer, params.consolidate);
    write_bool_flag(&mut buffer, params.intrinsic_write);
    write_i32(&mut buffer, params.tile_header_bytes() as i32);
    write_i32(&mut buffer, params.n_uniform_flags() as i32);

    for &value in &params.affine_geo_transform {
        if use_file_version >= 2 {
            buffer.extend_from_slice(&io::encode_f64(value));
        } else {
            // version 1 files store the affine transform in raw host order, kept
            // for backward compatibility with files written before version 2.
            buffer.extend_from_slice(&value.to_ne_bytes());
        }
    }

    debug_assert_eq!(buffer.len(), HEADER_BYTES);

    let header_bytes = io::encode_i32(buffer.len() as i32);
    buffer[0..4].copy_from_slice(&header_bytes);

    Ok(buffer)
}

/// Decoded header plus the live meta-data entry count it was written with.
pub struct DecodedHeader {
    pub params: ImageParams,
    pub n_keys: i32,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedHeader> {
    if bytes.len() < HEADER_BYTES {
        return Err(Error::new(ErrorKind::Read, "decode"));
    }

    let header_bytes = io::decode_i32(&bytes[0..4]);
    if &bytes[4..12] != &MAGIC {
        return Err(Error::new(ErrorKind::Read, "decode/magic"));
    }

    let version = io::decode_i32(&bytes[12..16]);
    if version > LIBRARY_VERSION {
        return Err(Error::new(ErrorKind::IncompatibleVersion, "decode"));
    }

    let width = io::decode_i32(&bytes[16..20]);
    let height = io::decode_i32(&bytes[20..24]);
    let bands = io::decode_i32(&bytes[24..28]);
    let n_keys = io::decode_i32(&bytes[28..32]);
    let n_tiles = io::decode_i32(&bytes[32..36]);
    let tile_width = io::decode_i32(&bytes[36..40]);
    let tile_height = io::decode_i32(&bytes[40..44]);
    let tile_bytes = io::decode_i32(&bytes[44..48]);
    let n_tiles_across = io::decode_i32(&bytes[48..52]);
    let data_unit_size = io::decode_i32(&bytes[52..56]);
    let user_data_type = io::decode_i32(&bytes[56..60]);
    let defragment = io::decode_i32(&bytes[60..64]) != 0;
    let consolidate = io::decode_i32(&bytes[64..68]) != 0;
    let intrinsic_write = io::decode_i32(&bytes[68..72]) != 0;
    let tile_header_bytes = io::decode_i32(&bytes[72..76]);
    let n_uniform_flags = io::decode_i32(&bytes[76..80]);

    let mut affine_geo_transform = [0.0f64; 6];
    for (i, slot) in affine_geo_transform.iter_mut().enumerate() {
        let start = 80 + i * 8;
        let field = &bytes[start..start + 8];
        *slot = if version >= 2 {
            io::decode_f64(field)
        } else {
            f64::from_ne_bytes(field.try_into().unwrap())
        };
    }

    if width <= 0 || height <= 0 || bands <= 0 || tile_width <= 0 || tile_height <= 0 || data_unit_size <= 0 {
        return Err(Error::new(ErrorKind::InvalidTileSize, "decode"));
    }

    let params = ImageParams {
        width: width as u32,
        height: height as u32,
        bands: bands as u32,
        tile_width: tile_width as u32,
        tile_height: tile_height as u32,
        data_unit_size: data_unit_size as u32,
        user_data_type,
        consolidate,
        defragment,
        intrinsic_write,
        version,
        affine_geo_transform,
    };

    // Validate the stored header_bytes against the size we actually decoded
    // instead of trusting it blindly.
    if header_bytes as usize != HEADER_BYTES {
        return Err(Error::new(ErrorKind::Read, "decode/header_bytes"));
    }

    // Cross-check the derived quantities the file also happens to store,
    // catching a corrupt or foreign file early rather than at first tile access.
    if n_tiles != params.n_tiles() as i32
        || tile_bytes != params.tile_bytes() as i32
        || n_tiles_across != params.n_tiles_across() as i32
        || tile_header_bytes != params.tile_header_bytes() as i32
        || n_uniform_flags != params.n_uniform_flags() as i32
    {
        return Err(Error::new(ErrorKind::Read, "decode/derived_mismatch"));
    }

    Ok(DecodedHeader { params, n_keys })
}
