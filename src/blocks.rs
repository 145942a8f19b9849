//! Block allocator (C5): the tile<->block bijection, encapsulated behind
//! one API so invariant I1 is enforced by the type instead of by caller
//! discipline.

use log::trace;

use crate::error::{Error, ErrorKind, Result};

/// Maintains `tile_to_block[t] = block_num` and its inverse
/// `block_to_tile[k] = t`, kept mutually consistent (invariant I1) by
/// every method here.
#[derive(Debug, Clone)]
pub struct BlockAllocator {
    tile_to_block: Vec<i32>,
    block_to_tile: Vec<i32>,
}

impl BlockAllocator {
    pub fn new(n_tiles: usize) -> Self {
        BlockAllocator {
            tile_to_block: vec![-1; n_tiles],
            block_to_tile: vec![-1; n_tiles],
        }
    }

    /// Rebuild both indices from the `block_num` stored in each tile
    /// record, as done on open.
    pub fn rebuild(block_nums: &[i32]) -> Self {
        let n = block_nums.len();
        let mut allocator = BlockAllocator::new(n);

        for (tile, &block_num) in block_nums.iter().enumerate() {
            allocator.tile_to_block[tile] = block_num;
            if block_num >= 0 {
                allocator.block_to_tile[block_num as usize] = tile as i32;
            }
        }

        allocator
    }

    pub fn block_of(&self, tile: usize) -> i32 {
        self.tile_to_block[tile]
    }

    pub fn tile_of(&self, block: usize) -> i32 {
        self.block_to_tile[block]
    }

    pub fn len(&self) -> usize {
        self.tile_to_block.len()
    }

    /// Smallest free block index, assigned to `tile`. A SIF image never
    /// needs more than one block per tile, so the search space is bounded
    /// by `n_tiles`.
    pub fn allocate(&mut self, tile: usize) -> Result<i32> {
        if self.tile_to_block[tile] >= 0 {
            return Ok(self.tile_to_block[tile]);
        }

        let block = self.block_to_tile.iter().position(|&t| t == -1)
            .ok_or_else(|| Error::new(ErrorKind::InvalidBlockNo, "allocate"))?;

        self.tile_to_block[tile] = block as i32;
        self.block_to_tile[block] = tile as i32;
        trace!("allocated block {} for tile {}", block, tile);
        Ok(block as i32)
    }

    pub fn release(&mut self, tile: usize) {
        let block = self.tile_to_block[tile];
        if block >= 0 {
            self.block_to_tile[block as usize] = -1;
            self.tile_to_block[tile] = -1;
            trace!("released block {} held by tile {}", block, tile);
        }
    }

    /// Swap the logical owners of two block slots, used by the
    /// defragmenter (C9) to keep the index mutually consistent while it
    /// physically moves bytes around.
    pub fn reassign(&mut self, tile: usize, block: i32) {
        self.tile_to_block[tile] = block;
        if block >= 0 {
            self.block_to_tile[block as usize] = tile as i32;
        }
    }

    pub fn clear_block(&mut self, block: usize) {
        self.block_to_tile[block] = -1;
    }

    pub fn last_used_block(&self) -> i32 {
        self.block_to_tile.iter().rposition(|&t| t != -1).map_or(-1, |k| k as i32)
    }

    /// Invariant I1: every non-free entry in each index points back to a
    /// matching entry in the other.
    #[cfg(debug_assertions)]
    pub fn check_bijection(&self) {
        for (tile, &block) in self.tile_to_block.iter().enumerate() {
            if block >= 0 {
                debug_assert_eq!(self.block_to_tile[block as usize], tile as i32);
            }
        }
        for (block, &tile) in self.block_to_tile.iter().enumerate() {
            if tile >= 0 {
                debug_assert_eq!(self.tile_to_block[tile as usize], block as i32);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocate_picks_the_smallest_free_block() {
        let mut allocator = BlockAllocator::new(4);
        assert_eq!(allocator.allocate(2).unwrap(), 0);
        assert_eq!(allocator.allocate(0).unwrap(), 1);
        allocator.release(2);
        assert_eq!(allocator.allocate(3).unwrap(), 0);
    }

    #[test]
    fn allocate_is_idempotent_for_an_already_allocated_tile() {
        let mut allocator = BlockAllocator::new(4);
        let first = allocator.allocate(1).unwrap();
        let second = allocator.allocate(1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bijection_holds_after_mixed_operations() {
        let mut allocator = BlockAllocator::new(4);
        allocator.allocate(0).unwrap();
        allocator.allocate(1).unwrap();
        allocator.release(0);
        allocator.allocate(2).unwrap();
        allocator.check_bijection();
    }

    #[test]
    fn last_used_block_tracks_the_highest_allocated_index() {
        let mut allocator = BlockAllocator::new(4);
        assert_eq!(allocator.last_used_block(), -1);
        allocator.allocate(0).unwrap();
        allocator.allocate(1).unwrap();
        assert_eq!(allocator.last_used_block(), 1);
        allocator.release(1);
        assert_eq!(allocator.last_used_block(), 0);
    }

    #[test]
    fn rebuild_reconstructs_both_indices_from_block_nums() {
        let block_nums = vec![-1, 0, -1, 1];
        let allocator = BlockAllocator::rebuild(&block_nums);
        assert_eq!(allocator.tile_of(0), 1);
        assert_eq!(allocator.tile_of(1), 3);
        assert_eq!(allocator.block_of(1), 0);
        assert_eq!(allocator.block_of(3), 1);
    }
}
