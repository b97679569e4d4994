use serde_json::Value;

/// Which key a reference object is addressed by on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKey {
    /// `{"id": "10001"}` - resolved through a lookup table
    Id,
    /// `{"name": "jdoe"}` - used verbatim
    Name,
    /// `{"key": "INFOSYS-12"}` - an issue key, used verbatim
    Key,
}

impl RefKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Key => "key",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "key" => Some(Self::Key),
            _ => None,
        }
    }
}

/// A reference to a server object, e.g. `{"id": "10001"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub key: RefKey,
    pub value: Option<String>,
}

impl Reference {
    pub fn unset(key: RefKey) -> Self {
        Self { key, value: None }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self {
            key: RefKey::Id,
            value: Some(value.into()),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.value.is_none()
    }

    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            self.key.as_str().to_string(),
            self.value.clone().map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(map)
    }

    /// Parse a one-entry object such as `{"id": "10001"}` or `{"id": 10001}`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let (k, v) = map.iter().next()?;
        let key = RefKey::parse(k)?;
        let value = match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => return None,
        };
        Some(Self { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_json_is_single_entry_object() {
        assert_eq!(Reference::id("10001").to_json(), json!({"id": "10001"}));
        assert_eq!(Reference::unset(RefKey::Name).to_json(), json!({"name": null}));
    }

    #[test]
    fn test_reference_from_json_accepts_numeric_ids() {
        assert_eq!(Reference::from_json(&json!({"id": 6})), Some(Reference::id("6")));
        assert_eq!(Reference::from_json(&json!({"key": "INFOSYS-1"})), Some(Reference { key: RefKey::Key, value: Some("INFOSYS-1".into()) }));
        assert_eq!(Reference::from_json(&json!({"id": "1", "name": "x"})), None);
        assert_eq!(Reference::from_json(&json!({"color": "red"})), None);
        assert_eq!(Reference::from_json(&json!("10001")), None);
    }
}
