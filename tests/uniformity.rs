use sif::prelude::*;

fn create(dir: &tempfile::TempDir, name: &str, w: u32, h: u32, b: u32, tw: u32, th: u32, intrinsic: bool) -> SifFile {
    SifFile::create(dir.path().join(name), CreateOptions {
        width: w, height: h, bands: b, tile_width: tw, tile_height: th,
        intrinsic_write: intrinsic, ..Default::default()
    }).unwrap()
}

#[test]
fn bands_not_a_multiple_of_8_still_collapse_correctly() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = create(&dir, "a.sif", 8, 8, 3, 8, 8, false);

    // band 2 starts non-uniform, forcing a block allocation.
    let varied: Vec<u8> = (0..64).collect();
    file.set_tile_slice(&varied, 0, 0, 2).unwrap();
    assert!(file.block_of_tile(0) >= 0);

    file.fill_tile_slice(0, 0, 0, &[1]).unwrap();
    file.fill_tile_slice(0, 0, 1, &[2]).unwrap();
    assert!(file.block_of_tile(0) >= 0, "band 2 is still non-uniform");

    file.fill_tile_slice(0, 0, 2, &[3]).unwrap();
    assert_eq!(file.block_of_tile(0), -1, "every one of the 3 bands is uniform, the tile must collapse");
}

#[test]
fn single_tile_image_has_exactly_one_tile() {
    let dir = tempfile::tempdir().unwrap();
    let file = create(&dir, "b.sif", 10, 10, 1, 64, 64, false);
    assert_eq!(file.params().n_tiles(), 1);
}

#[test]
fn tile_width_larger_than_image_width_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = create(&dir, "c.sif", 5, 5, 1, 64, 64, true);

    let data: Vec<u8> = (0..25).collect();
    file.set_raster(&data, 0, 0, 5, 5, 0).unwrap();
    assert_eq!(file.get_raster(0, 0, 5, 5, 0).unwrap(), data);
}

#[test]
fn is_shallow_uniform_returns_none_for_a_non_uniform_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = create(&dir, "d.sif", 8, 8, 1, 4, 4, false);

    file.set_raster(&(0..64).collect::<Vec<u8>>(), 0, 0, 8, 8, 0).unwrap();
    assert_eq!(file.is_shallow_uniform(0, 0, 8, 8, 0).unwrap(), None);
}

#[test]
fn consolidate_flag_on_flush_collapses_a_tile_written_piecewise() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("e.sif");

    {
        let mut file = SifFile::create(&path, CreateOptions {
            width: 8, height: 8, bands: 1, tile_width: 8, tile_height: 8,
            consolidate: true, intrinsic_write: false, ..Default::default()
        }).unwrap();

        file.set_tile_slice(&[0x09u8; 64], 0, 0, 0).unwrap();
        assert!(file.block_of_tile(0) >= 0);
        file.close().unwrap(); // flush runs consolidate
    }

    let file = SifFile::open(&path, true).unwrap();
    assert_eq!(file.block_of_tile(0), -1);
}
