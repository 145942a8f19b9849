//! Raster <-> tile mapper (C7): translates rectangular `(x, y, w, h, band)`
//! regions into per-tile sub-region copies.

use crate::error::{Error, ErrorKind, Result};
use crate::file::SifFile;
use crate::math::tile_extent;
use crate::uniform;

fn tile_index(file: &SifFile, tx: u32, ty: u32) -> Result<usize> {
    if tx >= file.params.n_tiles_across() || ty >= file.params.n_tiles_down() {
        return Err(Error::new(ErrorKind::InvalidCoord, "tile_index"));
    }
    Ok((ty * file.params.n_tiles_across() + tx) as usize)
}

fn check_band(file: &SifFile, band: u32) -> Result<()> {
    if band >= file.params.bands {
        return Err(Error::new(ErrorKind::InvalidBand, "check_band"));
    }
    Ok(())
}

fn check_region(file: &SifFile, x: u32, y: u32, w: u32, h: u32) -> Result<()> {
    if w == 0 || h == 0 {
        return Err(Error::new(ErrorKind::InvalidRegionSize, "check_region"));
    }
    if x.checked_add(w).map_or(true, |end| end > file.params.width)
        || y.checked_add(h).map_or(true, |end| end > file.params.height)
    {
        return Err(Error::new(ErrorKind::InvalidCoord, "check_region"));
    }
    Ok(())
}

/// The in-image valid extent of a tile along each axis (border tiles may
/// be only partially covered by real pixels).
fn tile_valid_extent(file: &SifFile, tx: u32, ty: u32) -> (u32, u32) {
    let extent_x = tile_extent(file.params.width, file.params.tile_width, tx);
    let extent_y = tile_extent(file.params.height, file.params.tile_height, ty);
    (extent_x, extent_y)
}

pub fn get_tile_slice(file: &mut SifFile, tx: u32, ty: u32, band: u32) -> Result<Vec<u8>> {
    check_band(file, band)?;
    let index = tile_index(file, tx, ty)?;

    let dus = file.params.data_unit_size;
    let units = file.params.units_per_slice();
    let len = (units * dus) as usize;

    let record = file.tiles.get(index)?;

    if record.is_band_uniform(band) {
        let value = record.uniform_pixel(band, dus).to_vec();
        let mut buffer = Vec::with_capacity(len);
        for _ in 0..units {
            buffer.extend_from_slice(&value);
        }
        return Ok(buffer);
    }

    let block = record.block_num;
    debug_assert!(block >= 0, "non-uniform band must have a block (invariant T1)");
    let offset = file.params.base_location()
        + block as u64 * file.params.tile_bytes() as u64
        + band as u64 * units as u64 * dus as u64;

    let mut buffer = vec![0u8; len];
    file.io.read_at(offset, &mut buffer)?;
    Ok(buffer)
}

pub fn set_tile_slice(file: &mut SifFile, buffer: &[u8], tx: u32, ty: u32, band: u32) -> Result<()> {
    file.guard_mutation("set_tile_slice")?;
    check_band(file, band)?;
    let index = tile_index(file, tx, ty)?;

    let dus = file.params.data_unit_size;
    let units = file.params.units_per_slice();
    let expected_len = (units * dus) as usize;
    if buffer.len() != expected_len {
        return Err(Error::new(ErrorKind::InvalidBuffer, "set_tile_slice"));
    }

    if file.params.intrinsic_write {
        let (extent_x, extent_y) = tile_valid_extent(file, tx, ty);
        if let Some(value) = uniform::deep_uniform_value(
            buffer, dus as usize, file.params.tile_width as usize,
            extent_x as usize, extent_y as usize,
        ) {
            let bands = file.params.bands;
            let tile = file.tiles.get_mut(index)?;
            tile.set_uniform_pixel(band, dus, &value);
            tile.set_band_uniform(band, true);
            uniform::attempt_collapse(tile, &mut file.blocks, index, bands);
            file.tiles.write_one(&mut file.io, &file.params, index)?;
            return Ok(());
        }
    }

    if file.tiles.get(index)?.block_num == -1 {
        let block = file.blocks.allocate(index)?;
        file.tiles.get_mut(index)?.block_num = block;

        let block_base = file.params.base_location() + block as u64 * file.params.tile_bytes() as u64;
        for b in 0..file.params.bands {
            let offset = block_base + b as u64 * units as u64 * dus as u64;
            file.io.write_at(offset, buffer)?;
        }
    }

    let block = file.tiles.get(index)?.block_num;
    let slice_offset = file.params.base_location()
        + block as u64 * file.params.tile_bytes() as u64
        + band as u64 * units as u64 * dus as u64;
    file.io.write_at(slice_offset, buffer)?;

    let intrinsic_write = file.params.intrinsic_write;
    let tile = file.tiles.get_mut(index)?;
    tile.set_band_uniform(band, false);
    if !intrinsic_write {
        file.dirty[index] = true;
    }

    file.tiles.write_one(&mut file.io, &file.params, index)?;
    Ok(())
}

pub fn fill_tile_slice(file: &mut SifFile, tx: u32, ty: u32, band: u32, value: &[u8]) -> Result<()> {
    file.guard_mutation("fill_tile_slice")?;
    check_band(file, band)?;
    let index = tile_index(file, tx, ty)?;

    let dus = file.params.data_unit_size;
    if value.len() != dus as usize {
        return Err(Error::new(ErrorKind::InvalidBuffer, "fill_tile_slice"));
    }

    let bands = file.params.bands;
    let tile = file.tiles.get_mut(index)?;
    tile.set_uniform_pixel(band, dus, value);
    tile.set_band_uniform(band, true);
    uniform::attempt_collapse(tile, &mut file.blocks, index, bands);
    file.tiles.write_one(&mut file.io, &file.params, index)
}

pub fn fill_tiles(file: &mut SifFile, band: u32, value: &[u8]) -> Result<()> {
    file.guard_mutation("fill_tiles")?;
    check_band(file, band)?;

    let dus = file.params.data_unit_size;
    if value.len() != dus as usize {
        return Err(Error::new(ErrorKind::InvalidBuffer, "fill_tiles"));
    }

    let bands = file.params.bands;
    for index in 0..file.tiles.len() {
        let tile = file.tiles.get_mut(index)?;
        tile.set_uniform_pixel(band, dus, value);
        tile.set_band_uniform(band, true);
        uniform::attempt_collapse(tile, &mut file.blocks, index, bands);
    }

    file.tiles.write_all(&mut file.io, &file.params)
}

pub fn is_slice_shallow_uniform(file: &SifFile, tx: u32, ty: u32, band: u32) -> Result<Option<Vec<u8>>> {
    check_band(file, band)?;
    let index = tile_index(file, tx, ty)?;
    let tile = file.tiles.get(index)?;

    Ok(if tile.is_band_uniform(band) {
        Some(tile.uniform_pixel(band, file.params.data_unit_size).to_vec())
    } else {
        None
    })
}

pub fn is_shallow_uniform(file: &SifFile, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Option<Vec<u8>>> {
    check_region(file, x, y, w, h)?;
    check_band(file, band)?;

    let tw = file.params.tile_width;
    let th = file.params.tile_height;

    let mut common: Option<Vec<u8>> = None;
    for ty in (y / th)..=((y + h - 1) / th) {
        for tx in (x / tw)..=((x + w - 1) / tw) {
            let index = tile_index(file, tx, ty)?;
            let tile = file.tiles.get(index)?;
            if !tile.is_band_uniform(band) {
                return Ok(None);
            }
            let value = tile.uniform_pixel(band, file.params.data_unit_size);
            match &common {
                None => common = Some(value.to_vec()),
                Some(first) if first.as_slice() != value => return Ok(None),
                Some(_) => {}
            }
        }
    }

    Ok(common)
}

/// Overlap geometry of one tile against a raster window, in tile-local
/// and raster-local coordinates.
struct Overlap {
    sxt: u32, ext: u32, syt: u32, eyt: u32,
    sxd: u32, syd: u32,
}

fn overlap(file: &SifFile, tx: u32, ty: u32, x: u32, y: u32, w: u32, h: u32) -> Overlap {
    let tw = file.params.tile_width as i64;
    let th = file.params.tile_height as i64;
    let (tile_x0, tile_y0) = (tx as i64 * tw, ty as i64 * th);
    let (x, y, w, h) = (x as i64, y as i64, w as i64, h as i64);

    let sxt = (x - tile_x0).max(0);
    let ext = (x + w - 1 - tile_x0).min(tw - 1);
    let syt = (y - tile_y0).max(0);
    let eyt = (y + h - 1 - tile_y0).min(th - 1);

    Overlap {
        sxt: sxt as u32, ext: ext as u32, syt: syt as u32, eyt: eyt as u32,
        sxd: (tile_x0 + sxt - x) as u32, syd: (tile_y0 + syt - y) as u32,
    }
}

pub fn get_raster(file: &mut SifFile, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Vec<u8>> {
    check_region(file, x, y, w, h)?;
    check_band(file, band)?;

    let dus = file.params.data_unit_size;
    let mut data = vec![0u8; (w * h * dus) as usize];
    let tile_row_stride = file.params.tile_width * dus;
    let data_row_stride = w * dus;

    let tw = file.params.tile_width;
    let th = file.params.tile_height;

    for ty in (y / th)..=((y + h - 1) / th) {
        for tx in (x / tw)..=((x + w - 1) / tw) {
            let ov = overlap(file, tx, ty, x, y, w, h);
            let slice = get_tile_slice(file, tx, ty, band)?;
            let row_bytes = ((ov.ext - ov.sxt + 1) * dus) as usize;

            for row in 0..=(ov.eyt - ov.syt) {
                let src_row = ov.syt + row;
                let dst_row = ov.syd + row;
                let src_start = (src_row * tile_row_stride + ov.sxt * dus) as usize;
                let dst_start = (dst_row * data_row_stride + ov.sxd * dus) as usize;
                data[dst_start..dst_start + row_bytes].copy_from_slice(&slice[src_start..src_start + row_bytes]);
            }
        }
    }

    Ok(data)
}

pub fn set_raster(file: &mut SifFile, data: &[u8], x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<()> {
    file.guard_mutation("set_raster")?;
    check_region(file, x, y, w, h)?;
    check_band(file, band)?;

    let dus = file.params.data_unit_size;
    if data.len() != (w * h * dus) as usize {
        return Err(Error::new(ErrorKind::InvalidBuffer, "set_raster"));
    }

    let tile_row_stride = file.params.tile_width * dus;
    let data_row_stride = w * dus;

    let tw = file.params.tile_width;
    let th = file.params.tile_height;

    for ty in (y / th)..=((y + h - 1) / th) {
        for tx in (x / tw)..=((x + w - 1) / tw) {
            let ov = overlap(file, tx, ty, x, y, w, h);
            let mut slice = get_tile_slice(file, tx, ty, band)?;
            let row_bytes = ((ov.ext - ov.sxt + 1) * dus) as usize;

            for row in 0..=(ov.eyt - ov.syt) {
                let src_row = ov.syd + row;
                let dst_row = ov.syt + row;
                let src_start = (src_row * data_row_stride + ov.sxd * dus) as usize;
                let dst_start = (dst_row * tile_row_stride + ov.sxt * dus) as usize;
                slice[dst_start..dst_start + row_bytes].copy_from_slice(&data[src_start..src_start + row_bytes]);
            }

            set_tile_slice(file, &slice, tx, ty, band)?;
        }
    }

    Ok(())
}
