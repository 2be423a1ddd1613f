//! Vertex attribute types and the classification of attributes into static and morph target attributes.
//!
//! Source meshes store morph target attributes in the same interleaved vertex buffer as the static attributes.
//! Morph target attributes are identified by name.
//! A name like `attr_tpos3` describes the `attr_pos` attribute for morph target slot 3.
use std::collections::BTreeSet;

use crate::formats::mesh::VertexBufferEntry;
use crate::ConvertError;

/// The data type for each component of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    UnsignedInt8 = 1,
    Int8 = 2,
    UnsignedInt16 = 3,
    Int16 = 4,
    UnsignedInt32 = 5,
    Int32 = 6,
    UnsignedInt64 = 7,
    Int64 = 8,
    Float16 = 9,
    Float32 = 10,
    Float64 = 11,
}

impl ComponentType {
    /// The size in bytes of a single component.
    pub fn byte_size(self) -> u32 {
        match self {
            ComponentType::UnsignedInt8 | ComponentType::Int8 => 1,
            ComponentType::UnsignedInt16 | ComponentType::Int16 | ComponentType::Float16 => 2,
            ComponentType::UnsignedInt32 | ComponentType::Int32 | ComponentType::Float32 => 4,
            ComponentType::UnsignedInt64 | ComponentType::Int64 | ComponentType::Float64 => 8,
        }
    }
}

impl TryFrom<u32> for ComponentType {
    type Error = ConvertError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::UnsignedInt8),
            2 => Ok(Self::Int8),
            3 => Ok(Self::UnsignedInt16),
            4 => Ok(Self::Int16),
            5 => Ok(Self::UnsignedInt32),
            6 => Ok(Self::Int32),
            7 => Ok(Self::UnsignedInt64),
            8 => Ok(Self::Int64),
            9 => Ok(Self::Float16),
            10 => Ok(Self::Float32),
            11 => Ok(Self::Float64),
            _ => Err(ConvertError::InvalidComponentType(value)),
        }
    }
}

/// A vertex attribute in the interleaved source vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name including the null terminator if present.
    pub name: Vec<u8>,
    pub component_type: ComponentType,
    pub component_count: u32,
    /// The byte offset of the attribute from the start of each vertex.
    pub offset: u32,
}

impl Attribute {
    /// Validates the component type of `entry`.
    pub fn from_entry(entry: &VertexBufferEntry, name: Vec<u8>) -> Result<Self, ConvertError> {
        Ok(Self {
            name,
            component_type: ComponentType::try_from(entry.component_type)?,
            component_count: entry.component_count,
            offset: entry.offset,
        })
    }

    /// The size in bytes of the attribute for a single vertex.
    pub fn byte_size(&self) -> u32 {
        self.component_type.byte_size() * self.component_count
    }
}

/// The result of inspecting an attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeClass {
    /// An attribute that is the same for all morph targets.
    Static { name: Vec<u8> },
    /// The data for the attribute `logical_name` in morph target `slot`.
    MorphTarget { logical_name: Vec<u8>, slot: u8 },
}

const MORPH_TARGET_PREFIX: &[u8] = b"attr_t";

/// Determines if `name` is a morph target attribute.
///
/// Morph target attribute names start with `attr_t` and end with the target slot digit.
/// The logical name removes the `t` and the digit, so `attr_tpos3` becomes `attr_pos` with slot 3.
/// A trailing null terminator is ignored for matching and kept on the logical name.
/// Names like `attr_textan` that start with `attr_t` but have no slot digit are static.
pub fn classify_attribute(name: &[u8]) -> AttributeClass {
    let (text, terminator) = match name.split_last() {
        Some((&0, text)) => (text, &name[name.len() - 1..]),
        _ => (name, &[][..]),
    };

    match text.split_last() {
        Some((digit, rest))
            if digit.is_ascii_digit()
                && rest.starts_with(MORPH_TARGET_PREFIX)
                && rest.len() > MORPH_TARGET_PREFIX.len() =>
        {
            // Remove the "t" from "attr_t" and the slot digit.
            let mut logical_name = b"attr_".to_vec();
            logical_name.extend_from_slice(&rest[MORPH_TARGET_PREFIX.len()..]);
            logical_name.extend_from_slice(terminator);

            AttributeClass::MorphTarget {
                logical_name,
                slot: digit - b'0',
            }
        }
        _ => AttributeClass::Static {
            name: name.to_vec(),
        },
    }
}

/// The logical attributes that support morph targets in the order they are stored in the morph target buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MorphAttributeKind {
    Position,
    Normal,
    TexCoord0,
    Tangent,
    Binormal,
    Color,
    TexCoord1,
}

impl MorphAttributeKind {
    /// The logical attribute name without a null terminator.
    pub fn name(self) -> &'static str {
        match self {
            MorphAttributeKind::Position => "attr_pos",
            MorphAttributeKind::Normal => "attr_norm",
            MorphAttributeKind::TexCoord0 => "attr_uv0",
            MorphAttributeKind::Tangent => "attr_textan",
            MorphAttributeKind::Binormal => "attr_binormal",
            MorphAttributeKind::Color => "attr_color",
            MorphAttributeKind::TexCoord1 => "attr_uv1",
        }
    }

    /// Finds the kind for the logical name of a morph target attribute.
    /// A trailing null terminator is ignored.
    pub fn from_name(name: &[u8]) -> Result<Self, ConvertError> {
        let text = name.strip_suffix(&[0]).unwrap_or(name);
        match text {
            b"attr_pos" => Ok(Self::Position),
            b"attr_norm" => Ok(Self::Normal),
            b"attr_uv0" => Ok(Self::TexCoord0),
            b"attr_textan" => Ok(Self::Tangent),
            b"attr_binormal" => Ok(Self::Binormal),
            b"attr_color" => Ok(Self::Color),
            b"attr_uv1" => Ok(Self::TexCoord1),
            _ => Err(ConvertError::UnknownMorphAttribute {
                name: String::from_utf8_lossy(text).into_owned(),
            }),
        }
    }
}

/// A morph target attribute for a single target slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphAttribute {
    /// The attribute with its logical name such as `attr_pos`.
    pub attribute: Attribute,
    pub kind: MorphAttributeKind,
    pub slot: u8,
}

/// The attributes of a source mesh split into static and morph target attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAttributes {
    /// Static attributes in the order of the source vertex buffer entries.
    pub static_attributes: Vec<Attribute>,
    /// Morph target attributes in the order of the source vertex buffer entries.
    pub morph_attributes: Vec<MorphAttribute>,
}

impl ClassifiedAttributes {
    /// Classifies each attribute by name and validates its component type.
    ///
    /// Morph target attributes with logical names not in [MorphAttributeKind] are an error.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = (&'a VertexBufferEntry, &'a [u8])>,
    {
        let mut static_attributes = Vec::new();
        let mut morph_attributes = Vec::new();

        for (entry, name) in entries {
            match classify_attribute(name) {
                AttributeClass::Static { name } => {
                    static_attributes.push(Attribute::from_entry(entry, name)?);
                }
                AttributeClass::MorphTarget { logical_name, slot } => {
                    let kind = MorphAttributeKind::from_name(&logical_name)?;
                    morph_attributes.push(MorphAttribute {
                        attribute: Attribute::from_entry(entry, logical_name)?,
                        kind,
                        slot,
                    });
                }
            }
        }

        Ok(Self {
            static_attributes,
            morph_attributes,
        })
    }

    /// The size in bytes of each vertex in the repacked static vertex buffer.
    pub fn static_stride(&self) -> u32 {
        self.static_attributes.iter().map(Attribute::byte_size).sum()
    }

    /// The number of distinct logical attributes with morph targets.
    /// This is the number of morph target attributes for slot 0.
    pub fn target_entries_count(&self) -> usize {
        self.morph_attributes.iter().filter(|a| a.slot == 0).count()
    }

    /// The number of morph targets.
    ///
    /// Every slot must have exactly one attribute of each kind present in slot 0.
    pub fn target_count(&self) -> Result<usize, ConvertError> {
        if self.morph_attributes.is_empty() {
            return Err(ConvertError::NoMorphTargets);
        }

        let base_kinds = self.slot_kinds(0);
        if base_kinds.is_empty() {
            return Err(ConvertError::MissingBaseTarget);
        }

        let slots: BTreeSet<_> = self.morph_attributes.iter().map(|a| a.slot).collect();
        for &slot in &slots {
            let kinds = self.slot_kinds(slot);
            if kinds != base_kinds || kinds.windows(2).any(|w| w[0] == w[1]) {
                return Err(ConvertError::InconsistentMorphTarget { slot });
            }
        }

        Ok(slots.len())
    }

    /// The sorted kinds of the morph target attributes for `slot` including duplicates.
    fn slot_kinds(&self, slot: u8) -> Vec<MorphAttributeKind> {
        let mut kinds: Vec<_> = self
            .morph_attributes
            .iter()
            .filter(|a| a.slot == slot)
            .map(|a| a.kind)
            .collect();
        kinds.sort();
        kinds
    }
}
