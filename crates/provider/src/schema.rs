//! Attribute trees describing the configuration and state of a data source

use convert_case::{Case, Casing};
use serde::Serialize;

use crate::validation::Validator;

/// Whether an attribute is supplied by the user or by the provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Must be set in the configuration
    Required,
    /// May be set in the configuration
    Optional,
    /// Set by the provider, never by the user
    Computed,
}

/// Value type of an attribute
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "attributes")]
pub enum AttributeType {
    /// A string
    String,
    /// A boolean
    Bool,
    /// A signed 64 bit integer
    Int64,
    /// A list of strings
    StringList,
    /// A map of strings
    StringMap,
    /// A map of string lists
    StringListMap,
    /// A single nested object
    Object(Vec<Attribute>),
    /// A list of nested objects
    ObjectList(Vec<Attribute>),
}

/// A named node of the attribute tree
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attribute {
    /// snake_case name used in configuration and state
    pub name: &'static str,
    /// camelCase name of the field in the Kubernetes document, `None` for state only attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    /// Human readable description
    pub description: &'static str,
    /// Who supplies the value
    pub presence: Presence,
    /// Type of the value
    #[serde(flatten)]
    pub kind: AttributeType,
    /// Checks applied to a configured value
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    /// Creates an optional attribute whose Kubernetes field is the camelCase form of `name`
    pub fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            json_name: Some(name.from_case(Case::Snake).to_case(Case::Camel)),
            description: "",
            presence: Presence::Optional,
            kind,
            validators: Vec::new(),
        }
    }

    /// Optional string attribute
    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttributeType::String)
    }

    /// Optional boolean attribute
    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    /// Optional integer attribute
    pub fn int64(name: &'static str) -> Self {
        Self::new(name, AttributeType::Int64)
    }

    /// Optional list of strings
    pub fn string_list(name: &'static str) -> Self {
        Self::new(name, AttributeType::StringList)
    }

    /// Optional map of strings
    pub fn string_map(name: &'static str) -> Self {
        Self::new(name, AttributeType::StringMap)
    }

    /// Optional map of string lists
    pub fn string_list_map(name: &'static str) -> Self {
        Self::new(name, AttributeType::StringListMap)
    }

    /// Optional nested object
    pub fn object(name: &'static str, attributes: Vec<Attribute>) -> Self {
        Self::new(name, AttributeType::Object(attributes))
    }

    /// Optional list of nested objects
    pub fn object_list(name: &'static str, attributes: Vec<Attribute>) -> Self {
        Self::new(name, AttributeType::ObjectList(attributes))
    }

    /// Overrides the Kubernetes field name
    pub fn json(mut self, json_name: &str) -> Self {
        self.json_name = Some(json_name.to_owned());
        self
    }

    /// Marks the attribute as present in state only, it never reaches the Kubernetes document
    pub fn state_only(mut self) -> Self {
        self.json_name = None;
        self
    }

    /// Sets the description
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Marks the attribute as required
    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    /// Marks the attribute as computed
    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    /// Adds a validator
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Turns the attribute and all of its descendants into computed attributes without validators.
    ///
    /// Used for subtrees whose values are authored by the server.
    pub fn into_computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self.validators.clear();
        self.kind = match self.kind {
            AttributeType::Object(children) => {
                AttributeType::Object(children.into_iter().map(Self::into_computed).collect())
            }
            AttributeType::ObjectList(children) => {
                AttributeType::ObjectList(children.into_iter().map(Self::into_computed).collect())
            }
            other => other,
        };
        self
    }

    /// Nested attributes of an object or object list
    pub fn children(&self) -> &[Attribute] {
        match &self.kind {
            AttributeType::Object(children) | AttributeType::ObjectList(children) => children,
            _ => &[],
        }
    }

    /// Looks up a direct child by name
    pub fn child(&self, name: &str) -> Option<&Attribute> {
        self.children().iter().find(|a| a.name == name)
    }
}

/// The root of an attribute tree
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schema {
    /// Human readable description of the data source
    pub description: &'static str,
    /// Top level attributes
    pub attributes: Vec<Attribute>,
}

impl Schema {
    /// Looks up a top level attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up an attribute by a dotted path of names, e.g. `spec.tls_config.ca`
    pub fn lookup(&self, path: &str) -> Option<&Attribute> {
        let mut names = path.split('.');
        let first = self.attribute(names.next()?)?;
        names.try_fold(first, |attribute, name| attribute.child(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_names_default_to_camel_case() {
        assert_eq!(
            Attribute::string("label_name_length_limit").json_name.as_deref(),
            Some("labelNameLengthLimit")
        );
        assert_eq!(Attribute::string("url").json_name.as_deref(), Some("url"));
        assert_eq!(Attribute::string("oauth2").json_name.as_deref(), Some("oauth2"));
        assert_eq!(
            Attribute::string("enable_http2").json("enableHTTP2").json_name.as_deref(),
            Some("enableHTTP2")
        );
        assert_eq!(Attribute::string("id").state_only().json_name, None);
    }

    #[test]
    fn into_computed_is_recursive() {
        let attribute = Attribute::object(
            "tls_config",
            vec![Attribute::object(
                "ca",
                vec![Attribute::string("key").required().validate(Validator::LengthAtLeast(1))],
            )],
        )
        .into_computed();

        let key = attribute
            .child("ca")
            .and_then(|ca| ca.child("key"))
            .expect("nested attribute exists");
        assert_eq!(key.presence, Presence::Computed);
        assert!(key.validators.is_empty());
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let schema = Schema {
            description: "",
            attributes: vec![Attribute::object(
                "spec",
                vec![Attribute::object_list("dns_sd_configs", vec![Attribute::string("type")])],
            )],
        };
        assert!(schema.lookup("spec.dns_sd_configs.type").is_some());
        assert!(schema.lookup("spec.missing").is_none());
        assert!(schema.lookup("").is_none());
    }
}
