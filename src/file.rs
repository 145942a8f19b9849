//! Lifecycle (C10): open/create/flush/close, wiring every other component
//! together and enforcing read-only mode.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::blocks::BlockAllocator;
use crate::defrag;
use crate::error::{Error, ErrorKind, Result};
use crate::header::{self, ImageParams, HEADER_BYTES, LIBRARY_VERSION};
use crate::io::PositionedFile;
use crate::metadata::MetaStore;
use crate::raster;
use crate::tiles::TileTable;

/// Arguments to [`SifFile::create`]. There is no external config file,
/// this struct plays that role.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub data_unit_size: u32,
    pub user_data_type: i32,
    pub consolidate: bool,
    pub defragment: bool,
    pub tile_width: u32,
    pub tile_height: u32,
    pub intrinsic_write: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        CreateOptions {
            width: 0, height: 0, bands: 1,
            data_unit_size: 1, user_data_type: 0,
            consolidate: false, defragment: false,
            tile_width: 64, tile_height: 64,
            intrinsic_write: false,
        }
    }
}

/// A live handle onto a `.sif` file. Every field needed by the raster
/// mapper, uniformity engine and defragmenter lives here so those modules
/// can operate on `&mut SifFile` directly instead of threading half a
/// dozen parameters through every call.
pub struct SifFile {
    pub(crate) io: PositionedFile,
    pub(crate) params: ImageParams,
    pub(crate) tiles: TileTable,
    pub(crate) blocks: BlockAllocator,
    pub(crate) dirty: Vec<bool>,
    pub(crate) meta: MetaStore,
    pub(crate) use_file_version: i32,
    pub(crate) path: PathBuf,
    pub(crate) last_error: Option<Error>,
}

impl std::fmt::Debug for SifFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SifFile")
            .field("path", &self.path)
            .field("width", &self.params.width)
            .field("height", &self.params.height)
            .field("bands", &self.params.bands)
            .field("n_tiles", &self.tiles.len())
            .finish()
    }
}

impl SifFile {
    pub fn create(path: impl AsRef<Path>, options: CreateOptions) -> Result<Self> {
        let path = path.as_ref();

        let params = ImageParams {
            width: options.width,
            height: options.height,
            bands: options.bands,
            tile_width: options.tile_width,
            tile_height: options.tile_height,
            data_unit_size: options.data_unit_size,
            user_data_type: options.user_data_type,
            consolidate: options.consolidate,
            defragment: options.defragment,
            intrinsic_write: options.intrinsic_write,
            version: LIBRARY_VERSION,
            affine_geo_transform: [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        params.validate_dimensions()?;

        let io = PositionedFile::create(path)?;
        let tiles = TileTable::new_uniform(&params);
        let blocks = BlockAllocator::new(params.n_tiles() as usize);
        let dirty = vec![false; params.n_tiles() as usize];

        let mut file = SifFile {
            io,
            params,
            tiles,
            blocks,
            dirty,
            meta: MetaStore::new(),
            use_file_version: LIBRARY_VERSION,
            path: path.to_path_buf(),
            last_error: None,
        };

        file.write_header()?;
        file.tiles.write_all(&mut file.io, &file.params)?;
        info!("created {:?}: {}x{}x{} tiles={}", file.path, file.params.width, file.params.height, file.params.bands, file.tiles.len());
        Ok(file)
    }

    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut io = PositionedFile::open(path, read_only)?;

        let mut header_bytes = vec![0u8; HEADER_BYTES];
        io.read_at(0, &mut header_bytes)?;
        let decoded = header::decode(&header_bytes)?;
        let params = decoded.params;

        let tiles = TileTable::read_all(&mut io, &params)?;
        let block_nums: Vec<i32> = tiles.iter().map(|t| t.block_num).collect();
        let blocks = BlockAllocator::rebuild(&block_nums);

        let meta_offset = params.base_location() + (blocks.last_used_block() + 1) as u64 * params.tile_bytes() as u64;
        let meta = MetaStore::read_all(&mut io, meta_offset, decoded.n_keys)?;

        let dirty = vec![false; params.n_tiles() as usize];
        let use_file_version = params.version;

        debug!("opened {:?} (read_only={}) version={}", path, read_only, params.version);

        Ok(SifFile {
            io, params, tiles, blocks, dirty, meta,
            use_file_version, path: path.to_path_buf(), last_error: None,
        })
    }

    pub fn create_copy(&mut self, target: impl AsRef<Path>) -> Result<Self> {
        self.flush()?;

        let len = self.io.len()?;
        let mut buffer = vec![0u8; len as usize];
        self.io.read_at(0, &mut buffer)?;

        let mut target_io = PositionedFile::create(target.as_ref())?;
        target_io.write_at(0, &buffer)?;
        target_io.flush()?;
        drop(target_io);

        SifFile::open(target, false)
    }

    fn meta_offset(&self) -> u64 {
        self.params.base_location() + (self.blocks.last_used_block() + 1) as u64 * self.params.tile_bytes() as u64
    }

    fn write_header(&mut self) -> Result<()> {
        let bytes = header::encode(&self.params, self.meta.len() as i32, self.use_file_version)?;
        self.io.write_at(0, &bytes)
    }

    /// Rewrite header, tile headers and meta-data; consolidate and/or
    /// defragment if those flags are set; flush the underlying file.
    /// No-op if the handle is read-only.
    pub fn flush(&mut self) -> Result<()> {
        if self.io.is_read_only() {
            return Ok(());
        }

        if self.params.consolidate {
            self.consolidate()?;
        }
        if self.params.defragment {
            self.defragment()?;
        }

        self.write_header()?;
        self.tiles.write_all(&mut self.io, &self.params)?;

        let offset = self.meta_offset();
        let end = self.meta.write_all(&mut self.io, offset)?;
        self.io.truncate(end)?;

        self.io.flush()
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    pub fn consolidate(&mut self) -> Result<()> {
        crate::uniform::consolidate(self)
    }

    pub fn defragment(&mut self) -> Result<()> {
        defrag::defragment(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn params(&self) -> &ImageParams {
        &self.params
    }

    pub fn is_read_only(&self) -> bool {
        self.io.is_read_only()
    }

    pub fn get_version(&self) -> i32 {
        self.params.version
    }

    /// Select the wire version for subsequent writes. Defaults to the
    /// library version on create and to the file's own version on open.
    pub fn use_file_format_version(&mut self, version: i32) -> Result<()> {
        if version < 1 {
            return Err(Error::new(ErrorKind::CannotWriteVersion, "use_file_format_version"));
        }
        self.use_file_version = version;
        Ok(())
    }

    pub fn is_consolidate(&self) -> bool { self.params.consolidate }
    pub fn is_defragment(&self) -> bool { self.params.defragment }
    pub fn is_intrinsic_write(&self) -> bool { self.params.intrinsic_write }

    pub fn set_consolidate(&mut self, value: bool) { self.params.consolidate = value; }
    pub fn set_defragment(&mut self, value: bool) { self.params.defragment = value; }
    pub fn set_intrinsic_write(&mut self, value: bool) { self.params.intrinsic_write = value; }

    pub fn get_user_data_type(&self) -> i32 { self.params.user_data_type }
    pub fn set_user_data_type(&mut self, value: i32) { self.params.user_data_type = value; }

    pub fn get_affine_geo_transform(&self) -> [f64; 6] { self.params.affine_geo_transform }
    pub fn set_affine_geo_transform(&mut self, transform: [f64; 6]) { self.params.affine_geo_transform = transform; }

    pub fn get_projection(&self) -> String { self.meta.get_projection() }
    pub fn set_projection(&mut self, wkt: &str) -> Result<()> {
        self.guard_mutation("set_projection")?;
        self.meta.set_projection(wkt);
        Ok(())
    }

    pub fn get_agreement(&self) -> String { self.meta.get_agreement() }
    pub fn set_agreement(&mut self, agreement: &str) -> Result<()> {
        self.guard_mutation("set_agreement")?;
        self.meta.set_agreement(agreement);
        Ok(())
    }

    pub fn get_meta_data(&self, key: &[u8]) -> Result<&[u8]> { self.meta.get(key) }
    pub fn get_meta_data_binary(&self, key: &[u8]) -> Result<&[u8]> { self.meta.get(key) }

    pub fn set_meta_data(&mut self, key: &[u8], value: &str) -> Result<()> {
        self.guard_mutation("set_meta_data")?;
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.meta.set(key, bytes);
        Ok(())
    }

    pub fn set_meta_data_binary(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.guard_mutation("set_meta_data_binary")?;
        self.meta.set(key, value.to_vec());
        Ok(())
    }

    pub fn remove_meta_data_item(&mut self, key: &[u8]) -> Result<()> {
        self.guard_mutation("remove_meta_data_item")?;
        self.meta.remove(key)
    }

    pub fn get_meta_data_num_items(&self) -> usize { self.meta.len() }
    pub fn get_meta_data_keys(&self) -> Vec<&[u8]> { self.meta.keys() }

    /// Shared by every mutator: read-only files short-circuit with
    /// `InvalidFileMode` and no side effect.
    pub(crate) fn guard_mutation(&self, at: &'static str) -> Result<()> {
        if self.io.is_read_only() {
            return Err(Error::new(ErrorKind::InvalidFileMode, at));
        }
        Ok(())
    }

    /// Latch onto the sticky first-error slot, for callers using the
    /// legacy void-returning call shape. Returns the error unchanged so
    /// this can wrap a `Result`-returning call:
    /// `file.latch(file.set_raster(...))`.
    pub fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if self.last_error.is_none() {
                self.last_error = Some(Error::new(error.kind, error.at));
            }
        }
        result
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // Raster I/O (C7) delegates to `crate::raster`.
    pub fn get_raster(&mut self, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Vec<u8>> {
        raster::get_raster(self, x, y, w, h, band)
    }

    pub fn set_raster(&mut self, data: &[u8], x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<()> {
        raster::set_raster(self, data, x, y, w, h, band)
    }

    pub fn get_tile_slice(&mut self, tx: u32, ty: u32, band: u32) -> Result<Vec<u8>> {
        raster::get_tile_slice(self, tx, ty, band)
    }

    pub fn set_tile_slice(&mut self, buffer: &[u8], tx: u32, ty: u32, band: u32) -> Result<()> {
        raster::set_tile_slice(self, buffer, tx, ty, band)
    }

    pub fn fill_tile_slice(&mut self, tx: u32, ty: u32, band: u32, value: &[u8]) -> Result<()> {
        raster::fill_tile_slice(self, tx, ty, band, value)
    }

    pub fn fill_tiles(&mut self, band: u32, value: &[u8]) -> Result<()> {
        raster::fill_tiles(self, band, value)
    }

    pub fn is_shallow_uniform(&self, x: u32, y: u32, w: u32, h: u32, band: u32) -> Result<Option<Vec<u8>>> {
        raster::is_shallow_uniform(self, x, y, w, h, band)
    }

    pub fn is_slice_shallow_uniform(&self, tx: u32, ty: u32, band: u32) -> Result<Option<Vec<u8>>> {
        raster::is_slice_shallow_uniform(self, tx, ty, band)
    }

    /// In-memory bijection snapshot, exposed for tests that check
    /// invariant I1/P1 from outside the crate.
    pub fn block_of_tile(&self, tile: usize) -> i32 {
        self.blocks.block_of(tile)
    }

    pub fn tile_of_block(&self, block: usize) -> i32 {
        self.blocks.tile_of(block)
    }
}
