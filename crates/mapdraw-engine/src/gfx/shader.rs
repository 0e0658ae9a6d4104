use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use super::vertex_attribute::VertexAttributeArray;

/// A uniform block slot declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    pub binding: u32,
    pub size: usize,
}

/// Backend shader program.
///
/// Exposes what drawables need to build bindings: the default vertex attributes (with
/// their binding locations and default values), the uniform blocks, and sampler locations.
pub trait ShaderProgram: Any + Send + Sync {
    fn name(&self) -> &str;

    fn vertex_attributes(&self) -> &VertexAttributeArray;

    fn uniform_blocks(&self) -> &[UniformBlock];

    fn sampler_location(&self, name: &str) -> Option<i32>;

    fn as_any(&self) -> &dyn Any;

    fn uniform_block(&self, name: &str) -> Option<&UniformBlock> {
        self.uniform_blocks().iter().find(|b| b.name == name)
    }
}

/// Backend-neutral shader description. Backends wrap it in their program type.
#[derive(Debug, Clone, Default)]
pub struct ShaderProgramInfo {
    pub name: String,
    pub vertex_attributes: VertexAttributeArray,
    pub uniform_blocks: Vec<UniformBlock>,
    pub samplers: Vec<(String, i32)>,
}

impl ShaderProgramInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_uniform_block(mut self, name: &str, binding: u32, size: usize) -> Self {
        self.uniform_blocks.push(UniformBlock { name: name.to_owned(), binding, size });
        self
    }

    pub fn with_sampler(mut self, name: &str, location: i32) -> Self {
        self.samplers.push((name.to_owned(), location));
        self
    }

    pub fn sampler_location(&self, name: &str) -> Option<i32> {
        self.samplers.iter().find(|(n, _)| n == name).map(|(_, loc)| *loc)
    }
}

/// Builds a program variant for a set of properties evaluated as uniforms.
pub type ShaderFactory =
    Box<dyn Fn(&str, &BTreeSet<String>) -> Option<Arc<dyn ShaderProgram>> + Send + Sync>;

/// All compiled variants of one named shader.
pub struct ShaderGroup {
    name: String,
    factory: ShaderFactory,
    variants: Mutex<BTreeMap<BTreeSet<String>, Arc<dyn ShaderProgram>>>,
}

impl ShaderGroup {
    pub fn new(name: impl Into<String>, factory: ShaderFactory) -> Self {
        Self { name: name.into(), factory, variants: Mutex::new(BTreeMap::new()) }
    }

    /// A group that always yields the same program.
    pub fn single(program: Arc<dyn ShaderProgram>) -> Self {
        let name = program.name().to_owned();
        Self::new(name, Box::new(move |_, _| Some(program.clone())))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached variant for `properties_as_uniforms`, creating it on first use.
    pub fn get_or_create_shader(
        &self,
        properties_as_uniforms: &BTreeSet<String>,
    ) -> Option<Arc<dyn ShaderProgram>> {
        let Ok(mut variants) = self.variants.lock() else {
            log::error!("ShaderGroup {}: variant cache poisoned", self.name);
            return None;
        };
        if let Some(program) = variants.get(properties_as_uniforms) {
            return Some(program.clone());
        }
        let program = (self.factory)(&self.name, properties_as_uniforms)?;
        log::debug!(
            "ShaderGroup {}: created variant for {:?}",
            self.name,
            properties_as_uniforms
        );
        variants.insert(properties_as_uniforms.clone(), program.clone());
        Some(program)
    }

    pub fn variant_count(&self) -> usize {
        self.variants.lock().map(|v| v.len()).unwrap_or(0)
    }
}

/// Shader groups by name.
#[derive(Default)]
pub struct ShaderRegistry {
    groups: HashMap<String, Arc<ShaderGroup>>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `group`. An existing group with the same name is kept unless `replace`.
    pub fn register_shader_group(&mut self, group: ShaderGroup, replace: bool) -> bool {
        if !replace && self.groups.contains_key(group.name()) {
            return false;
        }
        self.groups.insert(group.name().to_owned(), Arc::new(group));
        true
    }

    pub fn get_shader_group(&self, name: &str) -> Option<Arc<ShaderGroup>> {
        self.groups.get(name).cloned()
    }

    /// Shortcut for the variant with no properties as uniforms.
    pub fn get_shader(&self, name: &str) -> Option<Arc<dyn ShaderProgram>> {
        self.groups.get(name)?.get_or_create_shader(&BTreeSet::new())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
