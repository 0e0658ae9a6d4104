//! Camera state and the projection matrices derived from it each frame.

mod transform_state;

pub use transform_state::{DEFAULT_FOV, TransformParameters, TransformState};
