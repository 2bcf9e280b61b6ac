//! Domain values handled by the matchers
//!
//! Values are opaque handles to caller data. Plain data (scalars and mappings)
//! travels as JSON; caller domain objects implement [`Object`]. Attribute
//! resolution picks its strategy from the variant: mappings are indexed by key,
//! objects answer through their named accessors.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Plain scalar or mapping data
pub type Data = serde_json::Value;

/// A caller domain object exposing named attributes
pub trait Object: Send + Sync + fmt::Debug {
    /// Type name, used to derive default association names
    fn type_name(&self) -> &str;

    /// Read a named attribute, `None` if the object has no such accessor
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Describe a declared association
    ///
    /// Objects without reflection support keep the default, which tells the
    /// relation matchers to fall back to the `<association>_id` convention.
    fn reflect_on_association(&self, _name: &str) -> Reflection {
        Reflection::Conventional
    }
}

/// Answer of an object to an association lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reflection {
    /// The object does not reflect on its associations
    Conventional,
    /// The object reflects, but no association of that name is declared
    Missing,
    /// The association is declared
    Declared(Association),
}

/// Kind of a declared association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    /// Direct foreign key held by the reflecting object
    BelongsTo { foreign_key: String },
    /// Indirect association through another one
    Through { through: String },
    /// Any other association macro (has_many, has_one, ...)
    Other { kind: String },
}

impl Association {
    /// Shorthand for a direct foreign-key association
    pub fn belongs_to(foreign_key: impl Into<String>) -> Self {
        Self::BelongsTo {
            foreign_key: foreign_key.into(),
        }
    }
}

/// An opaque value pushed on the context stack
#[derive(Debug, Clone)]
pub enum Value {
    /// Scalars and mappings
    Data(Data),
    /// Caller domain object
    Object(Arc<dyn Object>),
}

impl Value {
    /// The null value
    pub fn null() -> Self {
        Self::Data(Data::Null)
    }

    /// Wrap a domain object
    pub fn object(object: impl Object + 'static) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Borrow the plain data, if this is not a domain object
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            Self::Data(data) => Some(data),
            Self::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Data(Data::Null))
    }

    /// Null and `false` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Data(Data::Null) | Self::Data(Data::Bool(false)))
    }

    /// Type name used for default association names
    pub fn type_name(&self) -> &str {
        match self {
            Self::Object(object) => object.type_name(),
            Self::Data(data) => data_kind(data),
        }
    }

    /// Resolve an attribute or key on this value
    ///
    /// Missing keys of a mapping resolve to null. An object without the named
    /// accessor, or a scalar, cannot be resolved at all: that is a policy bug.
    pub fn resolve(&self, key: &str) -> Result<Value> {
        match self {
            Self::Data(Data::Object(map)) => Ok(map
                .get(key)
                .cloned()
                .map(Value::Data)
                .unwrap_or_else(Value::null)),
            Self::Object(object) => object.attribute(key).ok_or_else(|| {
                Error::setup(format!(
                    "'{}' has no attribute '{}'",
                    object.type_name(),
                    key
                ))
            }),
            Self::Data(other) => Err(Error::setup(format!(
                "cannot resolve '{}' on a {} value",
                key,
                data_kind(other)
            ))),
        }
    }

    /// Association reflection, conventional for plain data
    pub fn reflect_on_association(&self, name: &str) -> Reflection {
        match self {
            Self::Object(object) => object.reflect_on_association(name),
            Self::Data(_) => Reflection::Conventional,
        }
    }

    /// Integer conversion used by id-typed parameters
    ///
    /// Strings convert from their leading digits (none gives 0), floats are
    /// truncated. Anything else has no integer form.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::Data(Data::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Self::Data(Data::String(s)) => Some(leading_integer(s)),
            _ => None,
        }
    }

    /// Ordering between numbers or between strings, `None` otherwise
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self.as_data()?, other.as_data()?) {
            (Data::Number(a), Data::Number(b)) => compare_numbers(a, b),
            (Data::String(a), Data::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(Data::Number(a)), Self::Data(Data::Number(b))) => {
                compare_numbers(a, b) == Some(Ordering::Equal)
            }
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        self.compare(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(data) => write!(f, "{}", data),
            Self::Object(object) => write!(f, "#<{}>", object.type_name()),
        }
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Self::Data(data)
    }
}

impl From<Arc<dyn Object>> for Value {
    fn from(object: Arc<dyn Object>) -> Self {
        Self::Object(object)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::object(record)
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Data(Data::from(v))
                }
            }
        )*
    };
}

value_from_scalar!(i32, i64, u32, u64, f64, bool, &str, String);

/// Lowercase a type name and join its words with dashes ("Admin::User" → "admin-user")
pub fn parameterize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

fn data_kind(data: &Data) -> &'static str {
    match data {
        Data::Null => "null",
        Data::Bool(_) => "bool",
        Data::Number(_) => "number",
        Data::String(_) => "string",
        Data::Array(_) => "array",
        Data::Object(_) => "map",
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn leading_integer(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// A ready-made domain object: a type name, attributes and optional associations
///
/// Records without an `associations` table do not reflect, so relation
/// matchers use the `<association>_id` attribute convention on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub attributes: serde_json::Map<String, Data>,

    /// Written as single-key maps, `{ belongs_to: { foreign_key: app_id } }`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_yaml::with::singleton_map_recursive"
    )]
    pub associations: Option<HashMap<String, Association>>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set an attribute
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Data>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Declare an association, enabling reflection on this record
    pub fn with_association(mut self, name: impl Into<String>, association: Association) -> Self {
        self.associations
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), association);
        self
    }
}

impl Object for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned().map(Value::Data)
    }

    fn reflect_on_association(&self, name: &str) -> Reflection {
        match &self.associations {
            None => Reflection::Conventional,
            Some(table) => match table.get(name) {
                Some(association) => Reflection::Declared(association.clone()),
                None => Reflection::Missing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_resolution_defaults_to_null() {
        let value = Value::from(json!({"owner_id": 7}));
        assert_eq!(value.resolve("owner_id").unwrap(), Value::from(7));
        assert!(value.resolve("missing").unwrap().is_null());
    }

    #[test]
    fn test_object_resolution_requires_accessor() {
        let value = Value::object(Record::new("User").with("id", 7));
        assert_eq!(value.resolve("id").unwrap(), Value::from(7));

        let err = value.resolve("nickname").unwrap_err();
        assert!(err.is_setup());
    }

    #[test]
    fn test_scalar_resolution_is_a_setup_error() {
        let err = Value::from(10).resolve("id").unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::null().is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::object(Record::new("User")).is_truthy());
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(Value::from("10").to_integer(), Some(10));
        assert_eq!(Value::from("  -42abc").to_integer(), Some(-42));
        assert_eq!(Value::from("abc").to_integer(), Some(0));
        assert_eq!(Value::from(7.9).to_integer(), Some(7));
        assert_eq!(Value::from(true).to_integer(), None);
        assert_eq!(Value::null().to_integer(), None);
    }

    #[test]
    fn test_equality_is_type_sensitive_but_numeric() {
        assert_ne!(Value::from("10"), Value::from(10));
        assert_eq!(Value::from(10), Value::from(10.0));

        let user = Value::object(Record::new("User"));
        assert_eq!(user, user.clone());
        assert_ne!(user, Value::object(Record::new("User")));
    }

    #[test]
    fn test_ordering() {
        assert!(Value::from(20) > Value::from(10));
        assert!(Value::from(1.5) < Value::from(2));
        assert!(Value::from("b") > Value::from("a"));
        assert_eq!(Value::from("10").compare(&Value::from(10)), None);
        assert!(!(Value::from("10") > Value::from(1)));
        assert!(!(Value::from("10") < Value::from(1)));
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        let user = Value::object(Record::new("User"));
        assert_eq!(user.partial_cmp(&user.clone()), Some(Ordering::Equal));
        assert_eq!(user.partial_cmp(&Value::object(Record::new("User"))), None);
        assert_eq!(Value::from(true).partial_cmp(&Value::from(true)), Some(Ordering::Equal));
        assert_eq!(Value::from(10).partial_cmp(&Value::from(10.0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_parameterize() {
        assert_eq!(parameterize("App"), "app");
        assert_eq!(parameterize("Admin::User"), "admin-user");
        assert_eq!(parameterize("line_item"), "line_item");
    }

    #[test]
    fn test_record_reflection() {
        let plain = Record::new("User");
        assert_eq!(plain.reflect_on_association("app"), Reflection::Conventional);

        let reflecting = Record::new("User").with_association("app", Association::belongs_to("app_id"));
        assert_eq!(
            reflecting.reflect_on_association("app"),
            Reflection::Declared(Association::belongs_to("app_id"))
        );
        assert_eq!(reflecting.reflect_on_association("team"), Reflection::Missing);
    }

    #[test]
    fn test_record_deserialization() {
        let yaml = r#"
type: User
attributes:
  id: 7
  is_admin: true
associations:
  app:
    belongs_to:
      foreign_key: app_id
"#;
        let record: Record = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.type_name, "User");
        assert_eq!(record.associations.as_ref().map(HashMap::len), Some(1));
        assert_eq!(record.attribute("is_admin"), Some(Value::from(true)));
        assert_eq!(
            record.reflect_on_association("app"),
            Reflection::Declared(Association::belongs_to("app_id"))
        );
    }

    #[test]
    fn test_record_associations_in_flow_style() {
        let yaml = "{ type: App, associations: { owner: { through: { through: team } }, members: { other: { kind: has_many } } } }";
        let record: Record = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            record.reflect_on_association("owner"),
            Reflection::Declared(Association::Through {
                through: "team".into()
            })
        );
        assert_eq!(
            record.reflect_on_association("members"),
            Reflection::Declared(Association::Other {
                kind: "has_many".into()
            })
        );

        let written = serde_yaml::to_string(&record).unwrap();
        assert_eq!(serde_yaml::from_str::<Record>(&written).unwrap(), record);
    }
}
