//! Application-driven layers built on the drawable pipeline.

mod custom_drawable_layer;
mod drawable_tweakers;

pub use custom_drawable_layer::{
    CustomDrawableLayer, CustomDrawableLayerHost, FillOptions, Interface, LineOptions, SymbolOptions,
};
pub use drawable_tweakers::{FillDrawableTweaker, LineDrawableTweaker, SymbolDrawableTweaker, SymbolPlacement};
