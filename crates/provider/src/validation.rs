// Kubernetes name rules are adapted from apimachinery/pkg/util/validation/validation.go

//! Value validators and configuration checks against an attribute tree

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    diagnostics::{AttributePath, Diagnostic, Diagnostics},
    schema::{Attribute, AttributeType, Presence, Schema},
};

const DURATION_FMT: &str = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$";
const HTTP_URL_FMT: &str = r"^http(s)?://.+$";
const PROMETHEUS_LABEL_NAME_FMT: &str = r"^[a-zA-Z_][a-zA-Z0-9_]*$";
const DNS_LABEL_FMT: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
const DNS_SUBDOMAIN_FMT: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";
const QUALIFIED_NAME_FMT: &str = r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$";
const LABEL_VALUE_FMT: &str = r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$";

/// Maximum length of an RFC 1123 subdomain, and so of most object names
pub const DNS_SUBDOMAIN_MAX_LENGTH: usize = 253;
/// Maximum length of an RFC 1123 label, and so of a namespace
pub const DNS_LABEL_MAX_LENGTH: usize = 63;
const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
const LABEL_VALUE_MAX_LENGTH: usize = 63;

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("failed to compile validation regex")
}

/// A regular expression together with the message shown when a value does not match it
pub struct Pattern {
    source: &'static str,
    message: &'static str,
    regex: LazyLock<Regex>,
}

impl Pattern {
    /// Whether `value` matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The regular expression in text form
    pub fn source(&self) -> &'static str {
        self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Prometheus duration, e.g. `30s` or `1h30m`
pub static DURATION: Pattern = Pattern {
    source: DURATION_FMT,
    message: "must be a duration like 30s, 5m or 1h30m",
    regex: LazyLock::new(|| compile(DURATION_FMT)),
};

/// Absolute HTTP or HTTPS URL
pub static HTTP_URL: Pattern = Pattern {
    source: HTTP_URL_FMT,
    message: "must be an http:// or https:// URL",
    regex: LazyLock::new(|| compile(HTTP_URL_FMT)),
};

/// Prometheus label name
pub static PROMETHEUS_LABEL_NAME: Pattern = Pattern {
    source: PROMETHEUS_LABEL_NAME_FMT,
    message: "must be a valid Prometheus label name",
    regex: LazyLock::new(|| compile(PROMETHEUS_LABEL_NAME_FMT)),
};

/// Kubernetes object name (RFC 1123 subdomain)
pub static KUBERNETES_NAME: Pattern = Pattern {
    source: DNS_SUBDOMAIN_FMT,
    message: "must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character",
    regex: LazyLock::new(|| compile(DNS_SUBDOMAIN_FMT)),
};

/// Kubernetes namespace (RFC 1123 label)
pub static KUBERNETES_NAMESPACE: Pattern = Pattern {
    source: DNS_LABEL_FMT,
    message: "must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character",
    regex: LazyLock::new(|| compile(DNS_LABEL_FMT)),
};

static QUALIFIED_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| compile(QUALIFIED_NAME_FMT));
static LABEL_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| compile(LABEL_VALUE_FMT));

/// A check applied to a configured attribute value of the right type
#[derive(Clone, Debug, PartialEq)]
pub enum Validator {
    /// String has at least this many characters
    LengthAtLeast(usize),
    /// String has at most this many characters
    LengthAtMost(usize),
    /// String is one of the given values
    OneOf(&'static [&'static str]),
    /// String matches the pattern
    Matches(&'static Pattern),
    /// List has at least this many elements
    SizeAtLeast(usize),
    /// Every string of a list matches the pattern
    EachMatches(&'static Pattern),
    /// Map keys are qualified names and values are valid label values
    Labels,
    /// Map keys are qualified names
    Annotations,
}

impl Validator {
    /// Checks `value`, pushing a diagnostic for every violation
    pub fn check(&self, path: &AttributePath, value: &Value, diagnostics: &mut Diagnostics) {
        match (self, value) {
            (Self::LengthAtLeast(min), Value::String(s)) => {
                let length = s.chars().count();
                if length < *min {
                    diagnostics.push(invalid(
                        path,
                        format!("Attribute {path} string length must be at least {min}, got: {length}"),
                    ));
                }
            }
            (Self::LengthAtMost(max), Value::String(s)) => {
                let length = s.chars().count();
                if length > *max {
                    diagnostics.push(invalid(
                        path,
                        format!("Attribute {path} string length must be at most {max}, got: {length}"),
                    ));
                }
            }
            (Self::OneOf(allowed), Value::String(s)) => {
                if !allowed.contains(&s.as_str()) {
                    diagnostics.push(invalid(
                        path,
                        format!("Attribute {path} value must be one of: {allowed:?}, got: {s:?}"),
                    ));
                }
            }
            (Self::Matches(pattern), Value::String(s)) => {
                if !pattern.is_match(s) {
                    diagnostics.push(invalid(
                        path,
                        format!("Attribute {path} {}, got: {s:?}", pattern.message),
                    ));
                }
            }
            (Self::SizeAtLeast(min), Value::Array(items)) => {
                if items.len() < *min {
                    diagnostics.push(invalid(
                        path,
                        format!(
                            "Attribute {path} list must contain at least {min} elements, got: {}",
                            items.len()
                        ),
                    ));
                }
            }
            (Self::EachMatches(pattern), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::String(s) = item
                        && !pattern.is_match(s)
                    {
                        let path = path.index(i);
                        diagnostics.push(invalid(
                            &path,
                            format!("Attribute {path} {}, got: {s:?}", pattern.message),
                        ));
                    }
                }
            }
            (Self::Labels, Value::Object(entries)) => {
                for (key, value) in entries {
                    let path = path.key(key);
                    if let Err(reason) = is_qualified_name(key) {
                        diagnostics.push(invalid(&path, format!("Invalid label key {key:?}: {reason}")));
                    }
                    if let Value::String(value) = value
                        && let Err(reason) = is_label_value(value)
                    {
                        diagnostics.push(invalid(&path, format!("Invalid label value {value:?}: {reason}")));
                    }
                }
            }
            (Self::Annotations, Value::Object(entries)) => {
                for key in entries.keys() {
                    if let Err(reason) = is_qualified_name(key) {
                        diagnostics.push(invalid(
                            &path.key(key),
                            format!("Invalid annotation key {key:?}: {reason}"),
                        ));
                    }
                }
            }
            // type mismatches are reported by the tree walk
            _ => {}
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthAtLeast(min) => write!(f, "length >= {min}"),
            Self::LengthAtMost(max) => write!(f, "length <= {max}"),
            Self::OneOf(allowed) => write!(f, "one of {allowed:?}"),
            Self::Matches(pattern) => write!(f, "matches {}", pattern.source),
            Self::SizeAtLeast(min) => write!(f, "size >= {min}"),
            Self::EachMatches(pattern) => write!(f, "each matches {}", pattern.source),
            Self::Labels => f.write_str("valid labels"),
            Self::Annotations => f.write_str("valid annotations"),
        }
    }
}

impl Serialize for Validator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn invalid(path: &AttributePath, detail: String) -> Diagnostic {
    Diagnostic::attribute_error(path, "Invalid Attribute Value", detail)
}

/// Checks that `key` is a qualified name (`[prefix/]name`) as used for label and annotation keys
pub fn is_qualified_name(key: &str) -> Result<(), String> {
    let (prefix, name) = match key.split('/').collect::<Vec<_>>()[..] {
        [name] => (None, name),
        [prefix, name] => (Some(prefix), name),
        _ => return Err("a qualified name must contain at most one '/'".into()),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err("prefix part must be non-empty".into());
        }
        if prefix.len() > DNS_SUBDOMAIN_MAX_LENGTH {
            return Err(format!(
                "prefix part must be no more than {DNS_SUBDOMAIN_MAX_LENGTH} characters"
            ));
        }
        if !KUBERNETES_NAME.is_match(prefix) {
            return Err(format!("prefix part {}", KUBERNETES_NAME.message));
        }
    }

    if name.is_empty() {
        return Err("name part must be non-empty".into());
    }
    if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        return Err(format!(
            "name part must be no more than {QUALIFIED_NAME_MAX_LENGTH} characters"
        ));
    }
    if !QUALIFIED_NAME_REGEX.is_match(name) {
        return Err("name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character".into());
    }
    Ok(())
}

/// Checks that `value` is a valid label value
pub fn is_label_value(value: &str) -> Result<(), String> {
    if value.len() > LABEL_VALUE_MAX_LENGTH {
        return Err(format!(
            "must be no more than {LABEL_VALUE_MAX_LENGTH} characters"
        ));
    }
    if !LABEL_VALUE_REGEX.is_match(value) {
        return Err("must be empty or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character".into());
    }
    Ok(())
}

/// Validates a configuration against `schema`.
///
/// Reports unknown attributes, missing required attributes, values for computed attributes,
/// type mismatches and failed validators. Every problem becomes one diagnostic.
pub fn validate_config(schema: &Schema, config: &Value) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    match config {
        Value::Object(object) => {
            validate_object(&schema.attributes, object, &AttributePath::root(), &mut diagnostics);
        }
        _ => diagnostics.push(Diagnostic::error(
            "Invalid Configuration",
            "the configuration must be an object",
        )),
    }
    diagnostics
}

fn validate_object(
    attributes: &[Attribute],
    object: &Map<String, Value>,
    path: &AttributePath,
    diagnostics: &mut Diagnostics,
) {
    for key in object.keys() {
        if !attributes.iter().any(|a| a.name == key) {
            diagnostics.push(Diagnostic::attribute_error(
                &path.attribute(key),
                "Unsupported argument",
                format!("An argument named {key:?} is not expected here."),
            ));
        }
    }

    for attribute in attributes {
        let path = path.attribute(attribute.name);
        let value = object.get(attribute.name).unwrap_or(&Value::Null);
        validate_attribute(attribute, value, &path, diagnostics);
    }
}

fn validate_attribute(
    attribute: &Attribute,
    value: &Value,
    path: &AttributePath,
    diagnostics: &mut Diagnostics,
) {
    match (attribute.presence, value) {
        (Presence::Required, Value::Null) => {
            diagnostics.push(Diagnostic::attribute_error(
                path,
                "Missing required argument",
                format!("The argument {:?} is required, but no definition was found.", attribute.name),
            ));
            return;
        }
        (_, Value::Null) => return,
        (Presence::Computed, _) => {
            diagnostics.push(Diagnostic::attribute_error(
                path,
                "Invalid Configuration for Read-Only Attribute",
                format!("Cannot set value for attribute {path}, it is computed by the provider."),
            ));
            return;
        }
        _ => {}
    }

    let type_ok = match (&attribute.kind, value) {
        (AttributeType::String, Value::String(_)) | (AttributeType::Bool, Value::Bool(_)) => true,
        (AttributeType::Int64, Value::Number(n)) => n.is_i64(),
        (AttributeType::StringList, Value::Array(items)) => items.iter().all(Value::is_string),
        (AttributeType::StringMap, Value::Object(entries)) => entries.values().all(Value::is_string),
        (AttributeType::StringListMap, Value::Object(entries)) => entries.values().all(|v| {
            v.as_array()
                .is_some_and(|items| items.iter().all(Value::is_string))
        }),
        (AttributeType::Object(children), Value::Object(object)) => {
            validate_object(children, object, path, diagnostics);
            true
        }
        (AttributeType::ObjectList(children), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let path = path.index(i);
                match item {
                    Value::Object(object) => validate_object(children, object, &path, diagnostics),
                    _ => diagnostics.push(type_mismatch(&path, "object")),
                }
            }
            true
        }
        _ => false,
    };

    if !type_ok {
        diagnostics.push(type_mismatch(path, expected_type(&attribute.kind)));
        return;
    }

    for validator in &attribute.validators {
        validator.check(path, value, diagnostics);
    }
}

fn expected_type(kind: &AttributeType) -> &'static str {
    match kind {
        AttributeType::String => "string",
        AttributeType::Bool => "bool",
        AttributeType::Int64 => "int64",
        AttributeType::StringList => "list of string",
        AttributeType::StringMap => "map of string",
        AttributeType::StringListMap => "map of list of string",
        AttributeType::Object(_) => "object",
        AttributeType::ObjectList(_) => "list of object",
    }
}

fn type_mismatch(path: &AttributePath, expected: &str) -> Diagnostic {
    Diagnostic::attribute_error(
        path,
        "Incorrect attribute value type",
        format!("Inappropriate value for attribute {path}: {expected} required."),
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    // every unit is optional, so the empty string is a duration too
    #[case("")]
    #[case("0")]
    #[case("30s")]
    #[case("1h30m")]
    #[case("500ms")]
    #[case("1y2w3d4h5m6s7ms")]
    fn duration_pass(#[case] value: &str) {
        assert!(DURATION.is_match(value));
    }

    #[rstest]
    #[case("30")]
    #[case("1.5h")]
    #[case("30 s")]
    #[case("m5")]
    #[case("5m1h")]
    fn duration_fail(#[case] value: &str) {
        assert!(!DURATION.is_match(value));
    }

    #[rstest]
    #[case("http://sd.example.org/targets")]
    #[case("https://sd")]
    fn http_url_pass(#[case] value: &str) {
        assert!(HTTP_URL.is_match(value));
    }

    #[rstest]
    #[case("ftp://sd.example.org")]
    #[case("https://")]
    #[case("sd.example.org")]
    fn http_url_fail(#[case] value: &str) {
        assert!(!HTTP_URL.is_match(value));
    }

    #[rstest]
    #[case("app")]
    #[case("app.kubernetes.io/name")]
    #[case("example.com/My_Key.v2")]
    fn qualified_name_pass(#[case] key: &str) {
        assert!(is_qualified_name(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("/name")]
    #[case("a/b/c")]
    #[case("-app")]
    #[case("app-")]
    #[case("Example.com/name")]
    #[case("a".repeat(64))]
    fn qualified_name_fail(#[case] key: String) {
        assert!(is_qualified_name(&key).is_err());
    }

    #[rstest]
    #[case("")]
    #[case("v1")]
    #[case("my_value.2")]
    fn label_value_pass(#[case] value: &str) {
        assert!(is_label_value(value).is_ok());
    }

    #[rstest]
    #[case("-v1")]
    #[case("has space")]
    #[case("a".repeat(64))]
    fn label_value_fail(#[case] value: String) {
        assert!(is_label_value(&value).is_err());
    }

    fn schema() -> Schema {
        Schema {
            description: "test",
            attributes: vec![
                Attribute::string("id").computed(),
                Attribute::string("name")
                    .required()
                    .validate(Validator::LengthAtLeast(1)),
                Attribute::string_map("labels").validate(Validator::Labels),
                Attribute::object_list(
                    "records",
                    vec![
                        Attribute::string("type").validate(Validator::OneOf(&["SRV", "A"])),
                        Attribute::int64("port"),
                        Attribute::string_list("names")
                            .required()
                            .validate(Validator::SizeAtLeast(1)),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let config = json!({
            "name": "web",
            "labels": {"app.kubernetes.io/name": "web"},
            "records": [{"type": "SRV", "port": null, "names": ["a.example.org"]}],
        });
        assert!(validate_config(&schema(), &config).is_empty());
    }

    #[test]
    fn reports_every_problem_with_its_path() {
        let config = json!({
            "id": "web/default",
            "name": "",
            "extra": true,
            "labels": {"-bad": "ok"},
            "records": [{"type": "TXT", "port": "80", "names": []}, {}],
        });
        let diagnostics = validate_config(&schema(), &config);
        let paths = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>();

        assert_eq!(
            paths,
            vec![
                "extra",
                "id",
                "name",
                r#"labels["-bad"]"#,
                "records[0].type",
                "records[0].port",
                "records[0].names",
                "records[1].names",
            ]
        );
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn non_object_config_is_rejected() {
        let diagnostics = validate_config(&schema(), &json!([]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().map(|d| d.attribute.is_none()), Some(true));
    }
}
