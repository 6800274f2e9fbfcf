//! Schema → storage attribute descriptors.
//!
//! The descriptor tree is what the value codec and the store understand. It is
//! produced once per schema, when a model is configured, and never mutated.
//!
//! Mapping rules:
//! - optional / refined wrappers are unwrapped; they do not change storage shape
//! - array → list of the element descriptor
//! - object → map of per-field descriptors
//! - record → opaque map (dynamic keys are not described)
//! - string / number / integer / boolean / enum → scalar of the same type
//! - date → ISO-8601 string scalar
//! - union / tuple → unsupported

use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};
use super::types::{Schema, SchemaNode};

/// Scalar attribute types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<String>),
    /// Stored as its RFC 3339 text
    Date,
}

/// Coarse attribute kind, as the store sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar,
    List,
    Map,
}

/// Storage shape of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDescriptor {
    Scalar(ScalarType),
    List(Box<AttributeDescriptor>),
    Map(BTreeMap<String, AttributeDescriptor>),
    /// Map with caller-defined keys; values are stored untyped.
    OpaqueMap,
}

impl AttributeDescriptor {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeDescriptor::Scalar(_) => AttributeKind::Scalar,
            AttributeDescriptor::List(_) => AttributeKind::List,
            AttributeDescriptor::Map(_) | AttributeDescriptor::OpaqueMap => AttributeKind::Map,
        }
    }

    pub fn scalar_type(&self) -> Option<&ScalarType> {
        match self {
            AttributeDescriptor::Scalar(t) => Some(t),
            _ => None,
        }
    }

    pub fn item_descriptor(&self) -> Option<&AttributeDescriptor> {
        match self {
            AttributeDescriptor::List(item) => Some(item),
            _ => None,
        }
    }

    pub fn property_descriptors(&self) -> Option<&BTreeMap<String, AttributeDescriptor>> {
        match self {
            AttributeDescriptor::Map(props) => Some(props),
            _ => None,
        }
    }

    /// Descriptor of a top-level property, if this is a described map.
    pub fn property(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.property_descriptors().and_then(|p| p.get(name))
    }
}

/// Converts schema nodes into attribute descriptors.
pub struct SchemaTypeMapper;

impl SchemaTypeMapper {
    /// Maps a whole entity schema to a map descriptor.
    pub fn map_schema(schema: &Schema) -> SchemaResult<AttributeDescriptor> {
        let mut props = BTreeMap::new();
        for (name, node) in &schema.fields {
            props.insert(name.clone(), Self::map_at(node, name)?);
        }
        Ok(AttributeDescriptor::Map(props))
    }

    /// Maps a single schema node.
    pub fn map(node: &SchemaNode) -> SchemaResult<AttributeDescriptor> {
        Self::map_at(node, "$root")
    }

    fn map_at(node: &SchemaNode, path: &str) -> SchemaResult<AttributeDescriptor> {
        let descriptor = match node {
            SchemaNode::Optional { inner } | SchemaNode::Refined { inner, .. } => {
                return Self::map_at(inner, path);
            }
            SchemaNode::String => AttributeDescriptor::Scalar(ScalarType::String),
            SchemaNode::Number => AttributeDescriptor::Scalar(ScalarType::Number),
            SchemaNode::Integer => AttributeDescriptor::Scalar(ScalarType::Integer),
            SchemaNode::Boolean => AttributeDescriptor::Scalar(ScalarType::Boolean),
            SchemaNode::Date => AttributeDescriptor::Scalar(ScalarType::Date),
            SchemaNode::Enum { values } => {
                AttributeDescriptor::Scalar(ScalarType::Enum(values.clone()))
            }
            SchemaNode::Array { items } => {
                let item = Self::map_at(items, &format!("{}[]", path))?;
                AttributeDescriptor::List(Box::new(item))
            }
            SchemaNode::Object { fields } => {
                let mut props = BTreeMap::new();
                for (name, field) in fields {
                    props.insert(name.clone(), Self::map_at(field, &format!("{}.{}", path, name))?);
                }
                AttributeDescriptor::Map(props)
            }
            // Dynamic keys: the value schema is still checked by the validator,
            // but the store only learns "some map".
            SchemaNode::Record { .. } => AttributeDescriptor::OpaqueMap,
            SchemaNode::Union { .. } | SchemaNode::Tuple { .. } => {
                return Err(SchemaError::unsupported(path, node.type_name()));
            }
        };
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Refinement;

    #[test]
    fn test_wrappers_unwrapped() {
        let node = SchemaNode::optional(SchemaNode::refined(
            SchemaNode::String,
            Refinement::NonEmpty,
        ));
        assert_eq!(
            SchemaTypeMapper::map(&node).unwrap(),
            AttributeDescriptor::Scalar(ScalarType::String)
        );
    }

    #[test]
    fn test_array_of_objects() {
        let node = SchemaNode::array(SchemaNode::object([
            ("label", SchemaNode::String),
            ("weight", SchemaNode::Number),
        ]));

        let desc = SchemaTypeMapper::map(&node).unwrap();
        assert_eq!(desc.kind(), AttributeKind::List);

        let item = desc.item_descriptor().unwrap();
        assert_eq!(item.kind(), AttributeKind::Map);
        assert_eq!(
            item.property("weight"),
            Some(&AttributeDescriptor::Scalar(ScalarType::Number))
        );
    }

    #[test]
    fn test_record_is_opaque() {
        let desc = SchemaTypeMapper::map(&SchemaNode::record(SchemaNode::Integer)).unwrap();
        assert_eq!(desc, AttributeDescriptor::OpaqueMap);
        assert_eq!(desc.kind(), AttributeKind::Map);
        assert!(desc.property_descriptors().is_none());
    }

    #[test]
    fn test_date_and_enum_scalars() {
        assert_eq!(
            SchemaTypeMapper::map(&SchemaNode::Date).unwrap().scalar_type(),
            Some(&ScalarType::Date)
        );
        let desc = SchemaTypeMapper::map(&SchemaNode::enumeration(["draft", "live"])).unwrap();
        assert_eq!(
            desc.scalar_type(),
            Some(&ScalarType::Enum(vec!["draft".into(), "live".into()]))
        );
    }

    #[test]
    fn test_union_rejected_with_path() {
        let schema = Schema::entity().with_field(
            "prize",
            SchemaNode::object([(
                "value",
                SchemaNode::Union {
                    variants: vec![SchemaNode::String, SchemaNode::Number],
                },
            )]),
        );

        let err = SchemaTypeMapper::map_schema(&schema).unwrap_err();
        assert_eq!(err.code(), "ST_SCHEMA_UNSUPPORTED");
        assert!(err.to_string().contains("prize.value"));
    }

    #[test]
    fn test_schema_maps_every_field() {
        let schema = Schema::entity().with_field("count", SchemaNode::Integer);
        let desc = SchemaTypeMapper::map_schema(&schema).unwrap();
        let props = desc.property_descriptors().unwrap();
        assert_eq!(props.len(), 4);
        assert_eq!(
            props.get("dateCreated"),
            Some(&AttributeDescriptor::Scalar(ScalarType::Date))
        );
    }
}
