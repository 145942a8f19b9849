//! Uniformity engine (C6): shallow and deep uniformity tests, and tile
//! collapse once every band of a tile has gone uniform.

use crate::blocks::BlockAllocator;
use crate::error::Result;
use crate::file::SifFile;
use crate::math::tile_extent;
use crate::tiles::TileRecord;

/// Deep/intrinsic uniformity test over the *in-image* sub-rectangle of a
/// tile buffer. Border tiles must only scan `extent_x * extent_y`; the
/// rest of the buffer is junk and must not disqualify uniformity. Returns
/// the common element when uniform.
pub fn deep_uniform_value(
    buffer: &[u8],
    data_unit_size: usize,
    tile_width: usize,
    extent_x: usize,
    extent_y: usize,
) -> Option<Vec<u8>> {
    debug_assert!(extent_x >= 1 && extent_y >= 1);
    let row_stride = tile_width * data_unit_size;
    let first = buffer[0..data_unit_size].to_vec();

    match data_unit_size {
        1 => {
            let value = first[0];
            for y in 0..extent_y {
                let row = &buffer[y * row_stride..y * row_stride + extent_x];
                if row.iter().any(|&b| b != value) {
                    return None;
                }
            }
        }
        2 => {
            let value = u16::from_ne_bytes([first[0], first[1]]);
            for y in 0..extent_y {
                let row_start = y * row_stride;
                for x in 0..extent_x {
                    let at = row_start + x * 2;
                    if u16::from_ne_bytes([buffer[at], buffer[at + 1]]) != value {
                        return None;
                    }
                }
            }
        }
        _ => {
            for y in 0..extent_y {
                let row_start = y * row_stride;
                for x in 0..extent_x {
                    let at = row_start + x * data_unit_size;
                    if buffer[at..at + data_unit_size] != first[..] {
                        return None;
                    }
                }
            }
        }
    }

    Some(first)
}

/// If every band of `tile` is now shallow uniform and it still owns a
/// block, release the block. Returns whether a collapse happened.
pub fn attempt_collapse(
    tile: &mut TileRecord,
    blocks: &mut BlockAllocator,
    tile_index: usize,
    bands: u32,
) -> bool {
    if tile.all_bands_uniform(bands) && tile.block_num != -1 {
        blocks.release(tile_index);
        tile.block_num = -1;
        log::debug!("tile {} collapsed to uniform, block released", tile_index);
        true
    } else {
        false
    }
}

/// Lazy consolidation: re-test every dirty tile that still owns a block,
/// collapsing whichever bands have gone uniform since the last
/// consolidation pass. Runs on `flush` when `params.consolidate` is set,
/// rather than after every single write.
pub fn consolidate(file: &mut SifFile) -> Result<()> {
    let bands = file.params.bands;
    let dus = file.params.data_unit_size as usize;
    let tile_width = file.params.tile_width as usize;
    let units = file.params.units_per_slice() as usize;
    let tile_bytes = file.params.tile_bytes() as u64;
    let base = file.params.base_location();

    for index in 0..file.tiles.len() {
        if !file.dirty[index] {
            continue;
        }

        let block = file.tiles.get(index)?.block_num;
        if block < 0 {
            file.dirty[index] = false;
            continue;
        }

        let tx = (index as u32) % file.params.n_tiles_across();
        let ty = (index as u32) / file.params.n_tiles_across();
        let extent_x = tile_extent(file.params.width, file.params.tile_width, tx) as usize;
        let extent_y = tile_extent(file.params.height, file.params.tile_height, ty) as usize;

        let block_base = base + block as u64 * tile_bytes;
        let mut buffer = vec![0u8; units * dus];

        for band in 0..bands {
            if file.tiles.get(index)?.is_band_uniform(band) {
                continue;
            }

            let offset = block_base + band as u64 * units as u64 * dus as u64;
            file.io.read_at(offset, &mut buffer)?;

            if let Some(value) = deep_uniform_value(&buffer, dus, tile_width, extent_x, extent_y) {
                let tile = file.tiles.get_mut(index)?;
                tile.set_uniform_pixel(band, file.params.data_unit_size, &value);
                tile.set_band_uniform(band, true);
            }
        }

        let tile = file.tiles.get_mut(index)?;
        attempt_collapse(tile, &mut file.blocks, index, bands);
        file.tiles.write_one(&mut file.io, &file.params, index)?;
        file.dirty[index] = false;
    }

    Ok(())
}
