//! "Simple" typed facade (C11): layers {base type, endianness} onto the
//! opaque `user_data_type` slot and swaps bytes at the read/write boundary
//! so callers always see host-native order regardless of how the file was
//! written.

use std::path::Path;

use smallvec::SmallVec;

use crate::error::{Error, ErrorKind, Result};
use crate::file::{CreateOptions, SifFile};
use crate::header;
use crate::io::{self, Endian, PositionedFile};

/// The scalar element type a "simple" file's pixels are stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BaseType {
    U8 = 0, I8 = 1, U16 = 2, I16 = 3, U32 = 4, I32 = 5, U64 = 6, I64 = 7, F32 = 8, F64 = 9,
}

impl BaseType {
    pub fn data_unit_size(self) -> u32 {
        match self {
            BaseType::U8 | BaseType::I8 => 1,
            BaseType::U16 | BaseType::I16 => 2,
            BaseType::U32 | BaseType::I32 | BaseType::F32 => 4,
            BaseType::U64 | BaseType::I64 | BaseType::F64 => 8,
        }
    }

    fn from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => BaseType::U8, 1 => BaseType::I8, 2 => BaseType::U16, 3 => BaseType::I16,
            4 => BaseType::U32, 5 => BaseType::I32, 6 => BaseType::U64, 7 => BaseType::I64,
            8 => BaseType::F32, 9 => BaseType::F64,
            _ => return Err(Error::new(ErrorKind::UndefinedDataType, "BaseType::from_i32")),
        })
    }
}

fn endian_to_i32(endian: Endian) -> i32 {
    match endian {
        Endian::Little => 0,
        Endian::Big => 1,
    }
}

fn endian_from_i32(value: i32) -> Result<Endian> {
    match value {
        0 => Ok(Endian::Little),
        1 => Ok(Endian::Big),
        _ => Err(Error::new(ErrorKind::UndefinedEndian, "endian_from_i32")),
    }
}

fn decode_user_data_type(value: i32) -> Result<(Endian, BaseType)> {
    Ok((endian_from_i32(value / 10)?, BaseType::from_i32(value % 10)?))
}

#[allow(clippy::too_many_arguments)]
pub fn simple_create(
    path: impl AsRef<Path>, width: u32, height: u32, bands: u32,
    base_type: BaseType, endian: Endian,
    tile_width: u32, tile_height: u32,
    consolidate: bool, defragment: bool, intrinsic_write: bool,
) -> Result<SifFile> {
    let options = CreateOptions {
        width, height, bands,
        data_unit_size: base_type.data_unit_size(),
        user_data_type: endian_to_i32(endian) * 10 + base_type as i32,
        consolidate, defragment, tile_width, tile_height, intrinsic_write,
    };

    let mut file = SifFile::create(path, options)?;
    file.set_agreement("simple")?;
    Ok(file)
}

pub fn simple_create_defaults(
    path: impl AsRef<Path>, width: u32, height: u32, bands: u32,
    base_type: BaseType, endian: Endian,
) -> Result<SifFile> {
    simple_create(path, width, height, bands, base_type, endian, 64, 64, true, true, true)
}

pub fn simple_open(path: impl AsRef<Path>, read_only: bool) -> Result<SifFile> {
    let file = SifFile::open(path, read_only)?;
    if !is_simple(&file) {
        return Err(Error::new(ErrorKind::IncorrectDataType, "simple_open"));
    }
    Ok(file)
}

pub fn simple_get_endian(file: &SifFile) -> Result<Endian> {
    decode_user_data_type(file.get_user_data_type()).map(|(endian, _)| endian)
}

pub fn simple_set_endian(file: &mut SifFile, endian: Endian) -> Result<()> {
    file.guard_mutation("simple_set_endian")?;
    let (_, base_type) = decode_user_data_type(file.get_user_data_type())?;
    file.set_user_data_type(endian_to_i32(endian) * 10 + base_type as i32);
    Ok(())
}

pub fn simple_get_data_type(file: &SifFile) -> Result<BaseType> {
    decode_user_data_type(file.get_user_data_type()).map(|(_, base_type)| base_type)
}

pub fn simple_set_data_type(file: &mut SifFile, base_type: BaseType) -> Result<()> {
    file.guard_mutation("simple_set_data_type")?;
    let (endian, _) = decode_user_data_type(file.get_user_data_type())?;
    file.set_user_data_type(endian_to_i32(endian) * 10 + base_type as i32);
    Ok(())
}

fn needs_swap(file: &SifFile) -> Result<bool> {
    Ok(simple_get_endian(file)? != Endian::host())
}

fn element_size(file: &SifFile) -> usize {
    file.params().data_unit_size as usize
}

pub fn simple_get_raster(file: &mut SifFile, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Vec<u8>> {
    let mut data = file.get_raster(x, y, w, h, band)?;
    if needs_swap(file)? {
        io::swap_bytes(&mut data, element_size(file));
    }
    Ok(data)
}

pub fn simple_set_raster(file: &mut SifFile, data: &[u8], x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<()> {
    if needs_swap(file)? {
        let mut swapped = data.to_vec();
        io::swap_bytes(&mut swapped, element_size(file));
        file.set_raster(&swapped, x, y, w, h, band)
    } else {
        file.set_raster(data, x, y, w, h, band)
    }
}

pub fn simple_fill_raster(file: &mut SifFile, x: u32, y: u32, w: u32, h: u32, band: u32, value: &[u8]) -> Result<()> {
    file.guard_mutation("simple_fill_raster")?;
    let dus = element_size(file);
    if value.len() != dus {
        return Err(Error::new(ErrorKind::InvalidBuffer, "simple_fill_raster"));
    }

    let mut unit: SmallVec<[u8; 8]> = SmallVec::from_slice(value);
    if needs_swap(file)? {
        io::swap_bytes(&mut unit, dus);
    }

    let mut buffer = Vec::with_capacity((w * h) as usize * dus);
    for _ in 0..(w * h) {
        buffer.extend_from_slice(&unit);
    }
    file.set_raster(&buffer, x, y, w, h, band)
}

pub fn simple_get_tile_slice(file: &mut SifFile, tx: u32, ty: u32, band: u32) -> Result<Vec<u8>> {
    let mut data = file.get_tile_slice(tx, ty, band)?;
    if needs_swap(file)? {
        io::swap_bytes(&mut data, element_size(file));
    }
    Ok(data)
}

pub fn simple_set_tile_slice(file: &mut SifFile, buffer: &[u8], tx: u32, ty: u32, band: u32) -> Result<()> {
    if needs_swap(file)? {
        let mut swapped = buffer.to_vec();
        io::swap_bytes(&mut swapped, element_size(file));
        file.set_tile_slice(&swapped, tx, ty, band)
    } else {
        file.set_tile_slice(buffer, tx, ty, band)
    }
}

pub fn simple_fill_tile_slice(file: &mut SifFile, tx: u32, ty: u32, band: u32, value: &[u8]) -> Result<()> {
    let mut unit: SmallVec<[u8; 8]> = SmallVec::from_slice(value);
    if needs_swap(file)? {
        io::swap_bytes(&mut unit, element_size(file));
    }
    file.fill_tile_slice(tx, ty, band, &unit)
}

pub fn simple_fill_tiles(file: &mut SifFile, band: u32, value: &[u8]) -> Result<()> {
    let mut unit: SmallVec<[u8; 8]> = SmallVec::from_slice(value);
    if needs_swap(file)? {
        io::swap_bytes(&mut unit, element_size(file));
    }
    file.fill_tiles(band, &unit)
}

pub fn simple_is_shallow_uniform(file: &SifFile, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Option<Vec<u8>>> {
    let swap = needs_swap(file)?;
    Ok(file.is_shallow_uniform(x, y, w, h, band)?.map(|mut value| {
        if swap {
            io::swap_bytes(&mut value, element_size(file));
        }
        value
    }))
}

pub fn simple_is_slice_shallow_uniform(file: &SifFile, tx: u32, ty: u32, band: u32) -> Result<Option<Vec<u8>>> {
    let swap = needs_swap(file)?;
    Ok(file.is_slice_shallow_uniform(tx, ty, band)?.map(|mut value| {
        if swap {
            io::swap_bytes(&mut value, element_size(file));
        }
        value
    }))
}

pub fn is_simple(file: &SifFile) -> bool {
    file.get_agreement() == "simple"
}

/// Magic-only check, cheap enough to run before a full [`SifFile::open`].
pub fn is_possibly_sif_file(path: impl AsRef<Path>) -> Result<bool> {
    let mut io = PositionedFile::open(path.as_ref(), true)?;
    let mut magic = [0u8; 8];
    match io.read_at(4, &mut magic) {
        Ok(()) => Ok(magic == header::MAGIC),
        Err(_) => Ok(false),
    }
}

pub fn is_simple_by_name(path: impl AsRef<Path>) -> Result<bool> {
    if !is_possibly_sif_file(path.as_ref())? {
        return Ok(false);
    }
    let file = SifFile::open(path, true)?;
    Ok(is_simple(&file))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn user_data_type_roundtrips_through_endian_and_base_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = simple_create(
            dir.path().join("a.sif"), 8, 8, 1, BaseType::U16, Endian::Big,
            4, 4, false, false, false,
        ).unwrap();

        assert_eq!(simple_get_endian(&file).unwrap(), Endian::Big);
        assert_eq!(simple_get_data_type(&file).unwrap(), BaseType::U16);

        simple_set_endian(&mut file, Endian::Little).unwrap();
        assert_eq!(simple_get_endian(&file).unwrap(), Endian::Little);
        assert_eq!(simple_get_data_type(&file).unwrap(), BaseType::U16);
    }

    #[test]
    fn simple_create_tags_the_agreement_meta_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = simple_create_defaults(dir.path().join("b.sif"), 8, 8, 1, BaseType::U8, Endian::Little).unwrap();
        assert!(is_simple(&file));
    }

    #[test]
    fn simple_open_rejects_a_non_simple_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.sif");
        SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() }).unwrap().close().unwrap();

        let err = simple_open(&path, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncorrectDataType);
    }

    #[test]
    fn opposite_endian_round_trip_preserves_host_values() {
        let dir = tempfile::tempdir().unwrap();
        let foreign = if Endian::host() == Endian::Big { Endian::Little } else { Endian::Big };

        let mut file = simple_create(
            dir.path().join("d.sif"), 4, 4, 1, BaseType::U16, foreign,
            4, 4, false, false, false,
        ).unwrap();

        let host_values: Vec<u8> = (0..16u16).flat_map(|v| v.to_ne_bytes()).collect();
        simple_set_raster(&mut file, &host_values, 0, 0, 4, 4, 0).unwrap();
        let read_back = simple_get_raster(&mut file, 0, 0, 4, 4, 0).unwrap();
        assert_eq!(read_back, host_values);
    }

    #[test]
    fn big_endian_file_on_the_wire_stores_swapped_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = simple_create(
            dir.path().join("e.sif"), 2, 1, 1, BaseType::U16, Endian::Big,
            2, 1, false, false, false,
        ).unwrap();

        // two u16 values 0x1234, 0x5678 in host order
        let host_values = [0x1234u16.to_ne_bytes(), 0x5678u16.to_ne_bytes()].concat();
        simple_set_raster(&mut file, &host_values, 0, 0, 2, 1, 0).unwrap();

        let wire_bytes = file.get_tile_slice(0, 0, 0).unwrap();
        if Endian::host() == Endian::Big {
            assert_eq!(wire_bytes, host_values);
        } else {
            assert_eq!(wire_bytes, [0x12, 0x34, 0x56, 0x78]);
        }
    }

    #[test]
    fn is_possibly_sif_file_checks_the_magic_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.sif");
        SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() }).unwrap().close().unwrap();
        assert!(is_possibly_sif_file(&path).unwrap());

        let garbage_path = dir.path().join("garbage.bin");
        std::fs::write(&garbage_path, vec![0u8; 64]).unwrap();
        assert!(!is_possibly_sif_file(&garbage_path).unwrap());
    }
}
