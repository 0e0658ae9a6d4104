use std::collections::BTreeMap;

use bytemuck::Pod;

/// CPU copy of one uniform block, plus a flag telling the upload pass to push it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBuffer {
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBuffer {
    pub fn new(data: &[u8]) -> Self {
        Self { data: data.to_vec(), dirty: true }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Overwrites the contents in place. Returns `true` if any byte changed.
    pub fn update(&mut self, data: &[u8]) -> bool {
        if self.data.as_slice() == data {
            return false;
        }
        if self.data.len() == data.len() {
            self.data.copy_from_slice(data);
        } else {
            self.data.clear();
            self.data.extend_from_slice(data);
        }
        self.dirty = true;
        true
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

/// Named uniform blocks owned by a drawable or a layer group.
///
/// Writes reuse the existing allocation; identical writes leave the dirty flag alone so
/// unchanged blocks are not re-uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformBufferArray {
    buffers: BTreeMap<String, UniformBuffer>,
}

impl UniformBufferArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_or_update<T: Pod>(&mut self, name: &str, value: &T) {
        self.create_or_update_bytes(name, bytemuck::bytes_of(value));
    }

    pub fn create_or_update_bytes(&mut self, name: &str, data: &[u8]) {
        match self.buffers.get_mut(name) {
            Some(existing) => {
                existing.update(data);
            }
            None => {
                self.buffers.insert(name.to_owned(), UniformBuffer::new(data));
            }
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&UniformBuffer> {
        self.buffers.get(name)
    }

    /// Reads a block back as `T`. `None` if missing or the size differs.
    pub fn read<T: Pod>(&self, name: &str) -> Option<T> {
        let buf = self.buffers.get(name)?;
        bytemuck::try_pod_read_unaligned(buf.data()).ok()
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformBuffer> {
        self.buffers.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformBuffer)> {
        self.buffers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_dirty(&self) -> bool {
        self.buffers.values().any(UniformBuffer::is_dirty)
    }

    pub fn clear_dirty(&mut self) {
        for buf in self.buffers.values_mut() {
            buf.set_dirty(false);
        }
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_write_keeps_buffer_clean() {
        let mut a = UniformBufferArray::new();
        a.create_or_update("ubo", &[1.0f32, 2.0, 3.0, 4.0]);
        a.clear_dirty();
        a.create_or_update("ubo", &[1.0f32, 2.0, 3.0, 4.0]);
        assert!(!a.is_dirty());
        a.create_or_update("ubo", &[1.0f32, 2.0, 3.0, 5.0]);
        assert!(a.is_dirty());
    }

    #[test]
    fn read_round_trips_pod_values() {
        let mut a = UniformBufferArray::new();
        a.create_or_update("ubo", &[7u32, 8]);
        assert_eq!(a.read::<[u32; 2]>("ubo"), Some([7, 8]));
        assert_eq!(a.read::<[u32; 3]>("ubo"), None);
        assert_eq!(a.read::<u32>("missing"), None);
    }
}
