use sif::prelude::*;
use sif::simple::{self, BaseType};

#[test]
fn simple_create_defaults_uses_64x64_tiles_and_sets_every_flag() {
    let dir = tempfile::tempdir().unwrap();
    let file = simple::simple_create_defaults(
        dir.path().join("defaults.sif"), 10, 10, 1, BaseType::U8, Endian::Little,
    ).unwrap();

    assert_eq!(file.params().tile_width, 64);
    assert_eq!(file.params().tile_height, 64);
    assert!(file.is_consolidate());
    assert!(file.is_defragment());
    assert!(file.is_intrinsic_write());
    assert!(simple::is_simple(&file));
}

#[test]
fn simple_open_on_a_plain_sif_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.sif");
    SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() })
        .unwrap().close().unwrap();

    let err = simple::simple_open(&path, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncorrectDataType);
}

#[test]
fn is_simple_by_name_distinguishes_simple_files_from_plain_ones_and_garbage() {
    let dir = tempfile::tempdir().unwrap();

    let simple_path = dir.path().join("s.sif");
    simple::simple_create_defaults(&simple_path, 4, 4, 1, BaseType::U8, Endian::Little).unwrap();
    assert!(simple::is_simple_by_name(&simple_path).unwrap());

    let plain_path = dir.path().join("p.sif");
    SifFile::create(&plain_path, CreateOptions { width: 4, height: 4, ..Default::default() })
        .unwrap().close().unwrap();
    assert!(!simple::is_simple_by_name(&plain_path).unwrap());

    let garbage_path = dir.path().join("g.bin");
    std::fs::write(&garbage_path, b"not a sif file at all").unwrap();
    assert!(!simple::is_simple_by_name(&garbage_path).unwrap());
}

#[test]
fn simple_fill_tiles_swaps_the_scalar_before_writing_a_foreign_endian_file() {
    let dir = tempfile::tempdir().unwrap();
    let foreign = if Endian::host() == Endian::Big { Endian::Little } else { Endian::Big };

    let mut file = simple::simple_create(
        dir.path().join("f.sif"), 4, 4, 1, BaseType::U32, foreign,
        4, 4, false, false, false,
    ).unwrap();

    simple::simple_fill_tiles(&mut file, 0, &0xAABBCCDDu32.to_ne_bytes()).unwrap();
    let read_back = simple::simple_get_tile_slice(&mut file, 0, 0, 0).unwrap();
    for chunk in read_back.chunks_exact(4) {
        assert_eq!(u32::from_ne_bytes(chunk.try_into().unwrap()), 0xAABBCCDD);
    }
}

#[test]
fn changing_data_type_preserves_the_endian_half_of_user_data_type() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = simple::simple_create(
        dir.path().join("dt.sif"), 4, 4, 1, BaseType::U8, Endian::Big,
        4, 4, false, false, false,
    ).unwrap();

    simple::simple_set_data_type(&mut file, BaseType::I32).unwrap();
    assert_eq!(simple::simple_get_endian(&file).unwrap(), Endian::Big);
    assert_eq!(simple::simple_get_data_type(&file).unwrap(), BaseType::I32);
}
