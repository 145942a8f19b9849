//! Defragmenter (C9): compact the block region so every used block sits in
//! `0..n_used` with no holes, so a later truncate can reclaim the tail.

use crate::error::Result;
use crate::file::SifFile;

/// Walk tiles in index order, relocating each one's block to the next free
/// slot at the front of the block region. `bn1` is the running cursor onto
/// that next free slot.
pub fn defragment(file: &mut SifFile) -> Result<()> {
    let tile_bytes = file.params.tile_bytes() as u64;
    let base = file.params.base_location();
    let n_tiles = file.tiles.len();

    let mut buf_a = vec![0u8; tile_bytes as usize];
    let mut buf_b = vec![0u8; tile_bytes as usize];

    let mut bn1: i32 = 0;
    for t in 0..n_tiles {
        let bk = file.blocks.block_of(t);
        if bk < 0 {
            continue;
        }

        if bk != bn1 {
            let displaced_tile = file.blocks.tile_of(bn1 as usize);

            file.io.read_at(base + bk as u64 * tile_bytes, &mut buf_a)?;
            file.io.read_at(base + bn1 as u64 * tile_bytes, &mut buf_b)?;
            file.io.write_at(base + bn1 as u64 * tile_bytes, &buf_a)?;
            file.io.write_at(base + bk as u64 * tile_bytes, &buf_b)?;

            if displaced_tile >= 0 {
                file.blocks.reassign(displaced_tile as usize, bk);
                file.tiles.get_mut(displaced_tile as usize)?.block_num = bk;
                file.tiles.write_one(&mut file.io, &file.params, displaced_tile as usize)?;
            } else {
                file.blocks.clear_block(bk as usize);
            }

            file.blocks.reassign(t, bn1);
            file.tiles.get_mut(t)?.block_num = bn1;
            file.tiles.write_one(&mut file.io, &file.params, t)?;
        }

        bn1 += 1;
    }

    log::debug!("defragmented: {} blocks in use", bn1);
    Ok(())
}
