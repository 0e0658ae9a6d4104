//! Tile addressing and tile-local geometry.
//!
//! Tile-local geometry lives in tile units (`0..EXTENT`, origin top-left, +Y down).

mod geometry;
mod id;

pub use geometry::{
    GeometryCollection, GeometryCoordinate, GeometryCoordinates, classify_rings, signed_area,
};
pub use id::{CanonicalTileId, EXTENT, OverscaledTileId, TILE_SIZE, UnwrappedTileId};
