#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,
)]

#![deny(
    unused_variables,
    unused_assignments,
    dead_code,
    unused_must_use,
    trivial_numeric_casts,
    redundant_semicolon
)]

#![forbid(unsafe_code)]

//! Sparse Image Format: a tiled, multi-band raster container that
//! collapses uniform tiles (and uniform bands within a tile) down to a
//! single stored pixel instead of a full block.
//!
//! A file is a fixed header (see [`header`]), a fixed-size tile-header
//! table ([`tiles`]), a region of fixed-size blocks holding the pixels of
//! every non-uniform tile ([`blocks`]), and a trailing key/value
//! meta-data store ([`metadata`]). [`file::SifFile`] is the lifecycle
//! handle tying all of it together; [`raster`] maps rectangular regions
//! onto tiles; [`uniform`] and [`defrag`] implement the two maintenance
//! passes run from [`file::SifFile::flush`]. [`simple`] is an optional
//! typed facade on top of the untyped core.

pub mod io;
pub mod math;
pub mod error;
pub mod header;
pub mod tiles;
pub mod blocks;
pub mod uniform;
pub mod metadata;
pub mod raster;
pub mod defrag;
pub mod file;
pub mod simple;

/// Re-exports covering the common case: open or create a file and push
/// bytes through its raster API.
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::file::{CreateOptions, SifFile};
    pub use crate::io::Endian;
    pub use crate::simple::{self, BaseType};
}
