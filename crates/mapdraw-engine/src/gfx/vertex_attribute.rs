use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::AttributeDataType;

/// One element of a vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    UByte4([u8; 4]),
    UShort4([u16; 4]),
    Short2([i16; 2]),
    Short4([i16; 4]),
    Matrix4([f32; 16]),
}

impl AttributeValue {
    pub fn data_type(&self) -> AttributeDataType {
        match self {
            AttributeValue::Int(_) => AttributeDataType::Int,
            AttributeValue::Int2(_) => AttributeDataType::Int2,
            AttributeValue::Int3(_) => AttributeDataType::Int3,
            AttributeValue::Int4(_) => AttributeDataType::Int4,
            AttributeValue::Float(_) => AttributeDataType::Float,
            AttributeValue::Float2(_) => AttributeDataType::Float2,
            AttributeValue::Float3(_) => AttributeDataType::Float3,
            AttributeValue::Float4(_) => AttributeDataType::Float4,
            AttributeValue::UByte4(_) => AttributeDataType::UByte4,
            AttributeValue::UShort4(_) => AttributeDataType::UShort4,
            AttributeValue::Short2(_) => AttributeDataType::Short2,
            AttributeValue::Short4(_) => AttributeDataType::Short4,
            AttributeValue::Matrix4(_) => AttributeDataType::Matrix4,
        }
    }

    /// Appends the value's native-endian bytes to `out`.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            AttributeValue::Int(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            AttributeValue::Int2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Int3(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Int4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Float(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            AttributeValue::Float2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Float3(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Float4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::UByte4(v) => out.extend_from_slice(v),
            AttributeValue::UShort4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Short2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Short4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            AttributeValue::Matrix4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
        }
    }
}

/// Interleaved vertex data shared between several attributes.
///
/// The attribute reads `data_type.byte_size()` bytes at
/// `(vertex_offset + i) * stride + offset` for vertex `i`.
#[derive(Debug, Clone)]
pub struct SharedRawData {
    pub data: Arc<[u8]>,
    pub offset: usize,
    pub vertex_offset: usize,
    pub stride: usize,
    pub data_type: AttributeDataType,
}

impl SharedRawData {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            return 0;
        }
        (self.data.len() / self.stride).saturating_sub(self.vertex_offset)
    }

    fn element(&self, i: usize) -> Option<&[u8]> {
        let start = (self.vertex_offset + i) * self.stride + self.offset;
        self.data.get(start..start + self.data_type.byte_size())
    }
}

/// A named vertex attribute: either a list of per-vertex values or a view into shared
/// raw vertex data.
#[derive(Debug, Clone)]
pub struct VertexAttribute {
    index: i32,
    data_type: AttributeDataType,
    items: Vec<AttributeValue>,
    shared: Option<SharedRawData>,
    dirty: bool,
}

impl VertexAttribute {
    pub fn new(index: i32, data_type: AttributeDataType, count: usize) -> Self {
        Self {
            index,
            data_type,
            items: Vec::with_capacity(count),
            shared: None,
            dirty: true,
        }
    }

    /// Shader binding location.
    #[inline]
    pub fn index(&self) -> i32 {
        self.index
    }

    #[inline]
    pub fn set_index(&mut self, index: i32) {
        self.index = index;
    }

    #[inline]
    pub fn data_type(&self) -> AttributeDataType {
        self.data_type
    }

    pub fn count(&self) -> usize {
        match &self.shared {
            Some(raw) => raw.vertex_count(),
            None => self.items.len(),
        }
    }

    #[inline]
    pub fn items(&self) -> &[AttributeValue] {
        &self.items
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&AttributeValue> {
        self.items.get(i)
    }

    /// Sets element `i`, growing the list (repeating `value`) if needed.
    pub fn set(&mut self, i: usize, value: AttributeValue) {
        if value.data_type() != self.data_type {
            log::warn!(
                "VertexAttribute: {:?} value written to {:?} attribute; ignored",
                value.data_type(),
                self.data_type
            );
            return;
        }
        if i >= self.items.len() {
            self.items.resize(i + 1, value);
        }
        self.items[i] = value;
        self.shared = None;
        self.dirty = true;
    }

    /// Replaces all items with `count` copies of `value`.
    pub fn fill(&mut self, value: AttributeValue, count: usize) {
        self.items.clear();
        self.items.resize(count, value);
        self.data_type = value.data_type();
        self.shared = None;
        self.dirty = true;
    }

    pub fn set_shared_raw_data(&mut self, raw: SharedRawData) {
        self.data_type = raw.data_type;
        self.items.clear();
        self.shared = Some(raw);
        self.dirty = true;
    }

    #[inline]
    pub fn shared_raw_data(&self) -> Option<&SharedRawData> {
        self.shared.as_ref()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.shared = None;
        self.dirty = true;
    }

    /// Writes this attribute's bytes for `vertex_count` vertices.
    ///
    /// A single item is broadcast to every vertex; missing items are zero-filled.
    fn write_region(&self, vertex_count: usize, out: &mut Vec<u8>) {
        let size = self.data_type.byte_size();
        let start = out.len();
        if let Some(raw) = &self.shared {
            for i in 0..vertex_count {
                match raw.element(i) {
                    Some(bytes) => out.extend_from_slice(bytes),
                    None => out.resize(out.len() + size, 0),
                }
            }
        } else if self.items.len() == 1 {
            for _ in 0..vertex_count {
                self.items[0].write_bytes(out);
            }
        } else {
            for item in self.items.iter().take(vertex_count) {
                item.write_bytes(out);
            }
        }
        out.resize(start + vertex_count * size, 0);
    }
}

/// Location of one attribute inside a packed vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    pub name: String,
    pub index: i32,
    pub data_type: AttributeDataType,
    /// Byte offset of the attribute's region in the buffer.
    pub byte_offset: usize,
    pub stride: usize,
}

/// Named vertex attribute collection.
#[derive(Debug, Clone, Default)]
pub struct VertexAttributeArray {
    attrs: BTreeMap<String, VertexAttribute>,
}

impl VertexAttributeArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new attribute. Returns `None` if `name` already exists.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        index: i32,
        data_type: AttributeDataType,
        count: usize,
    ) -> Option<&mut VertexAttribute> {
        use std::collections::btree_map::Entry;
        match self.attrs.entry(name.into()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => Some(v.insert(VertexAttribute::new(index, data_type, count))),
        }
    }

    pub fn get_or_add(
        &mut self,
        name: &str,
        index: i32,
        data_type: AttributeDataType,
    ) -> &mut VertexAttribute {
        self.attrs
            .entry(name.to_owned())
            .or_insert_with(|| VertexAttribute::new(index, data_type, 0))
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&VertexAttribute> {
        self.attrs.get(name)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut VertexAttribute> {
        self.attrs.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<VertexAttribute> {
        self.attrs.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_dirty(&self) -> bool {
        self.attrs.values().any(VertexAttribute::is_dirty)
    }

    pub fn clear_dirty(&mut self) {
        for attr in self.attrs.values_mut() {
            attr.set_dirty(false);
        }
    }

    /// Largest element count over all attributes.
    pub fn max_count(&self) -> usize {
        self.attrs.values().map(VertexAttribute::count).max().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.attrs.clear();
    }
}

/// Packs the attributes a shader declares (`defaults`) into one non-interleaved buffer.
///
/// Each default attribute is resolved against `overrides` by name; the override's values
/// win and the default's binding location is kept. Every region starts 4-byte aligned.
pub fn pack_vertex_attributes(
    vertex_count: usize,
    defaults: &VertexAttributeArray,
    overrides: &VertexAttributeArray,
) -> (Vec<AttributeBinding>, Vec<u8>) {
    let mut bindings = Vec::with_capacity(defaults.len());
    let mut bytes = Vec::new();

    for (name, default) in defaults.iter() {
        let source = overrides.get(name).unwrap_or(default);
        let byte_offset = bytes.len();
        source.write_region(vertex_count, &mut bytes);
        bindings.push(AttributeBinding {
            name: name.to_owned(),
            index: default.index(),
            data_type: source.data_type(),
            byte_offset,
            stride: source.data_type().byte_size(),
        });
    }

    (bindings, bytes)
}
