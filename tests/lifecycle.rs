use sif::prelude::*;

#[test]
fn create_flush_reopen_preserves_dimensions_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifecycle.sif");

    {
        let mut file = SifFile::create(&path, CreateOptions {
            width: 100, height: 80, bands: 3,
            tile_width: 32, tile_height: 32,
            consolidate: true, defragment: true, intrinsic_write: true,
            ..Default::default()
        }).unwrap();

        file.set_projection("EPSG:4326").unwrap();
        file.set_meta_data(b"notes", "created by the lifecycle test").unwrap();
        file.close().unwrap();
    }

    let file = SifFile::open(&path, true).unwrap();
    assert_eq!(file.params().width, 100);
    assert_eq!(file.params().height, 80);
    assert_eq!(file.params().bands, 3);
    assert!(file.is_consolidate());
    assert!(file.is_defragment());
    assert!(file.is_intrinsic_write());
    assert_eq!(file.get_projection(), "EPSG:4326");
    assert_eq!(file.get_meta_data_num_items(), 2);
}

#[test]
fn create_copy_duplicates_the_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let original_path = dir.path().join("orig.sif");
    let copy_path = dir.path().join("copy.sif");

    let mut original = SifFile::create(&original_path, CreateOptions {
        width: 16, height: 16, bands: 1, tile_width: 8, tile_height: 8,
        ..Default::default()
    }).unwrap();
    original.set_raster(&vec![0x42u8; 256], 0, 0, 16, 16, 0).unwrap();

    let copy = original.create_copy(&copy_path).unwrap();
    assert_eq!(copy.params().width, 16);
    drop(copy);

    let mut reopened = SifFile::open(&copy_path, false).unwrap();
    assert_eq!(reopened.get_raster(0, 0, 16, 16, 0).unwrap(), vec![0x42u8; 256]);
}

#[test]
fn reopening_a_newer_version_than_supported_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sif");

    SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() })
        .unwrap()
        .close()
        .unwrap();

    // corrupt the on-disk version field (offset 12, big-endian i32) to
    // something newer than this crate understands.
    let bytes = std::fs::read(&path).unwrap();
    let mut bytes = bytes;
    bytes[12..16].copy_from_slice(&99i32.to_be_bytes());
    std::fs::write(&path, bytes).unwrap();

    let err = SifFile::open(&path, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncompatibleVersion);
}

#[test]
fn empty_meta_data_round_trips_through_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty_meta.sif");

    SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() })
        .unwrap()
        .close()
        .unwrap();

    let file = SifFile::open(&path, true).unwrap();
    assert_eq!(file.get_meta_data_num_items(), 0);
}

#[test]
fn removing_a_meta_data_key_then_reopening_drops_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remove_meta.sif");

    {
        let mut file = SifFile::create(&path, CreateOptions { width: 4, height: 4, ..Default::default() }).unwrap();
        file.set_meta_data(b"a", "1").unwrap();
        file.set_meta_data(b"b", "2").unwrap();
        file.remove_meta_data_item(b"a").unwrap();
        file.close().unwrap();
    }

    let file = SifFile::open(&path, true).unwrap();
    assert_eq!(file.get_meta_data_num_items(), 1);
    assert!(file.get_meta_data(b"a").is_err());
}
