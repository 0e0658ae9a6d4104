use std::collections::BTreeSet;
use std::sync::Arc;

use crate::gfx::{
    AttributeDataType, AttributeValue, ShaderGroup, ShaderProgram, ShaderProgramInfo, ShaderRegistry,
};

use super::common::UniformBlockName;
use super::custom_symbol::{CUSTOM_SYMBOL_ICON_SHADER, CustomSymbolIconDrawableUbo, CustomSymbolIconParametersUbo};
use super::fill::{FILL_SHADER, FillDrawableUbo, FillEvaluatedPropsUbo, FillInterpolateUbo};
use super::line::{
    LINE_IMAGE_TEXTURE, LINE_SHADER, LineDynamicUbo, LineGradientUbo, LineInterpolationUbo, LinePatternUbo,
    LinePropertiesUbo, LineSdfUbo, LineUbo,
};

/// Names of every program [`program_info`] knows.
pub const BUILTIN_SHADERS: [&str; 3] = [LINE_SHADER, FILL_SHADER, CUSTOM_SYMBOL_ICON_SHADER];

/// Paint properties that fall back to a vertex attribute when not evaluated as a uniform.
const LINE_PROPERTIES: [(&str, AttributeValue); 6] = [
    ("a_color", AttributeValue::Float4([0.0, 0.0, 0.0, 1.0])),
    ("a_blur", AttributeValue::Float(0.0)),
    ("a_opacity", AttributeValue::Float(1.0)),
    ("a_gapwidth", AttributeValue::Float(0.0)),
    ("a_offset", AttributeValue::Float(0.0)),
    ("a_width", AttributeValue::Float(1.0)),
];

const FILL_PROPERTIES: [(&str, AttributeValue); 2] = [
    ("a_color", AttributeValue::Float4([0.0, 0.0, 0.0, 1.0])),
    ("a_opacity", AttributeValue::Float(1.0)),
];

struct Layout {
    info: ShaderProgramInfo,
    next_attribute: i32,
    next_binding: u32,
}

impl Layout {
    fn new(name: &str) -> Self {
        Self { info: ShaderProgramInfo::new(name), next_attribute: 0, next_binding: 0 }
    }

    fn attribute(mut self, name: &str, data_type: AttributeDataType, default: Option<AttributeValue>) -> Self {
        if let Some(attr) = self.info.vertex_attributes.add(name, self.next_attribute, data_type, 1) {
            if let Some(value) = default {
                attr.set(0, value);
            }
        }
        self.next_attribute += 1;
        self
    }

    fn properties(mut self, props: &[(&str, AttributeValue)], as_uniforms: &BTreeSet<String>) -> Self {
        for (name, value) in props {
            if !as_uniforms.contains(*name) {
                self = self.attribute(name, value.data_type(), Some(*value));
            }
        }
        self
    }

    fn block<T: UniformBlockName>(mut self) -> Self {
        self.info = self.info.with_uniform_block(T::NAME, self.next_binding, size_of::<T>());
        self.next_binding += 1;
        self
    }
}

/// Attribute, uniform block and sampler layout of a built-in program.
///
/// Data-driven properties listed in `properties_as_uniforms` are read from uniform blocks;
/// the others become vertex attributes after the geometry attributes.
pub fn program_info(name: &str, properties_as_uniforms: &BTreeSet<String>) -> Option<ShaderProgramInfo> {
    let layout = match name {
        LINE_SHADER => Layout::new(name)
            .attribute("a_pos_normal", AttributeDataType::Short2, None)
            .attribute("a_data", AttributeDataType::UByte4, None)
            .properties(&LINE_PROPERTIES, properties_as_uniforms)
            .block::<LineUbo>()
            .block::<LineDynamicUbo>()
            .block::<LinePropertiesUbo>()
            .block::<LineInterpolationUbo>()
            .block::<LinePatternUbo>()
            .block::<LineSdfUbo>()
            .block::<LineGradientUbo>(),
        FILL_SHADER => Layout::new(name)
            .attribute("a_pos", AttributeDataType::Short2, None)
            .properties(&FILL_PROPERTIES, properties_as_uniforms)
            .block::<FillDrawableUbo>()
            .block::<FillEvaluatedPropsUbo>()
            .block::<FillInterpolateUbo>(),
        CUSTOM_SYMBOL_ICON_SHADER => Layout::new(name)
            .attribute("a_pos", AttributeDataType::Float2, None)
            .attribute("a_tex", AttributeDataType::Float2, None)
            .block::<CustomSymbolIconDrawableUbo>()
            .block::<CustomSymbolIconParametersUbo>(),
        _ => return None,
    };
    let info = layout.info;
    Some(match name {
        LINE_SHADER => info.with_sampler("u_image", LINE_IMAGE_TEXTURE),
        CUSTOM_SYMBOL_ICON_SHADER => info.with_sampler("u_texture", 0),
        _ => info,
    })
}

/// Registers a shader group for every built-in program, compiling variants through `compile`.
///
/// `compile` returns `None` when the backend cannot build a variant; the group then yields
/// no program for that property set.
pub fn register_builtin_shaders<F>(registry: &mut ShaderRegistry, compile: F)
where
    F: Fn(ShaderProgramInfo) -> Option<Arc<dyn ShaderProgram>> + Clone + Send + Sync + 'static,
{
    for name in BUILTIN_SHADERS {
        let compile = compile.clone();
        let factory = move |name: &str, properties: &BTreeSet<String>| {
            program_info(name, properties).and_then(&compile)
        };
        let group = ShaderGroup::new(name, Box::new(factory));
        registry.register_shader_group(group, false);
    }
}
