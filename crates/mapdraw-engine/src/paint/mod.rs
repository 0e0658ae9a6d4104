//! Color model shared by drawables, tweakers and uniform blocks.
//!
//! Colors are stored premultiplied in `[0, 1]`. Vertex color attributes go through the
//! partially scaled array form (`Color::to_array`) and are normalized again on the way
//! into the attribute buffer.

pub mod color;

pub use color::Color;
