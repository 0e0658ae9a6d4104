//! Layer tweakers for the built-in layer types.

mod line_layer_tweaker;

pub use line_layer_tweaker::{LineLayerTweaker, LinePaintProperties, LineType};
