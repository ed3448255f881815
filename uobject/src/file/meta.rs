use super::AttrMap;
use crate::section::Section;

#[derive(Debug, Default)]
pub struct ContainerMetadata {
    /// The index of the attribute key is its interned identifier throughout this file.
    pub(crate) attr_keys: Vec<String>,

    /// The root attributes that apply to this entire container.
    pub(crate) attrs: AttrMap,

    /// One section per persisted storage method, in write order.
    pub(crate) sections: Vec<Section>,
}

impl ContainerMetadata {
    #[inline(always)]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[inline(always)]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    #[inline(always)]
    pub fn attr_key(&self, key: &str) -> Option<usize> {
        self.attr_keys.iter().position(|r| r == key)
    }

    #[inline(always)]
    pub fn attr_key_or_create(&mut self, key: &str) -> usize {
        match self.attr_keys.iter().position(|r| r == key) {
            Some(v) => v,
            None => {
                let len = self.attr_keys.len();
                self.attr_keys.push(key.to_string());
                len
            }
        }
    }

    /// A root attribute of the container.
    #[inline(always)]
    pub fn file_attr(&self, key: &str) -> Option<&[u8]> {
        let key = self.attr_key(key)?;
        self.attrs.get(&key).map(|v| v.as_slice())
    }
}
