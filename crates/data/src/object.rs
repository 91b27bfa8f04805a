//! Object model: a named code block with optional named subobjects and raw
//! data members, mirrored on input and output of the translator.

use crate::ast::Block;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub name: String,
    pub code: Block,
    pub subobjects: Vec<ObjectMember>,
    /// Maps a member name to its index in `subobjects`. Preserved verbatim
    /// by every transformation.
    pub sub_index_by_name: BTreeMap<String, usize>,
}

impl Object {
    pub fn new(name: impl Into<String>, code: Block) -> Self {
        Self { name: name.into(), code, subobjects: Vec::new(), sub_index_by_name: BTreeMap::new() }
    }

    pub fn push_member(&mut self, member: ObjectMember) {
        let name = match &member {
            ObjectMember::Object(object) => object.name.clone(),
            ObjectMember::Data(data) => data.name.clone(),
        };
        self.sub_index_by_name.insert(name, self.subobjects.len());
        self.subobjects.push(member);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectMember {
    Object(Object),
    Data(Data),
}

/// An opaque byte blob attached to an object; passes through translation
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: String,
    pub contents: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_index_tracks_push_order() {
        let mut object = Object::new("root", Block::default());
        object.push_member(ObjectMember::Data(Data { name: "blob".into(), contents: vec![1, 2] }));
        object.push_member(ObjectMember::Object(Object::new("child", Block::default())));

        assert_eq!(object.sub_index_by_name["blob"], 0);
        assert_eq!(object.sub_index_by_name["child"], 1);
    }
}
