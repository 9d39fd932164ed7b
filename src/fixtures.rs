//! Deterministic resource payloads. Every builder is pure: the same inputs
//! always produce the same record, so scenarios can reason about ids.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub const SAMPLE_PHOTO_URL: &str = "https://images.pexels.com/photos/23542021/pexels-photo-23542021/free-photo-of-brown-pomeranian-dog.jpeg";
pub const SAMPLE_SHIP_DATE: &str = "2024-11-13T12:15:45.209Z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub status: String,
}

impl Pet {
    /// The canonical dog: "Oreo", category `dog`, one photo and one tag.
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            category: Some(Category {
                id: 0,
                name: "dog".to_string(),
            }),
            name: "Oreo".to_string(),
            photo_urls: vec![SAMPLE_PHOTO_URL.to_string()],
            tags: vec![Tag {
                id: 0,
                name: "tag1".to_string(),
            }],
            status: "available".to_string(),
        }
    }

    /// A pet with only the fields the flow scenarios need.
    pub fn minimal(id: i64, name: &str) -> Self {
        Self {
            id,
            category: Some(Category {
                id: 1,
                name: "Dogs".to_string(),
            }),
            name: name.to_string(),
            photo_urls: Vec::new(),
            tags: Vec::new(),
            status: "available".to_string(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub pet_id: i64,
    pub quantity: i64,
    pub ship_date: String,
    pub status: String,
    pub complete: bool,
}

impl Order {
    pub fn sample(id: i64, pet_id: i64) -> Self {
        Self {
            id,
            pet_id,
            quantity: 2,
            ship_date: SAMPLE_SHIP_DATE.to_string(),
            status: "placed".to_string(),
            complete: true,
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub user_status: i32,
}

impl User {
    pub fn sample(id: i64, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            email: "first_last@test.com".to_string(),
            password: "root".to_string(),
            phone: "987654321".to_string(),
            user_status: 0,
        }
    }
}

/// A fixture with one top-level field overwritten or removed after
/// serialization, for payloads the typed records cannot express (a `null`
/// name, an id past `i64::MAX`, a missing quantity).
#[derive(Debug, Clone)]
pub struct Patched<T> {
    record: T,
    field: &'static str,
    replacement: Option<Value>,
}

/// `record` with `field` set to `replacement`.
pub fn with_field<T>(record: T, field: &'static str, replacement: Value) -> Patched<T> {
    Patched {
        record,
        field,
        replacement: Some(replacement),
    }
}

/// `record` with `field` dropped.
pub fn without_field<T>(record: T, field: &'static str) -> Patched<T> {
    Patched {
        record,
        field,
        replacement: None,
    }
}

impl<T: Serialize> Serialize for Patched<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.record).map_err(S::Error::custom)?;
        let Value::Object(map) = &mut value else {
            return Err(S::Error::custom(format!(
                "cannot patch `{}` on a non-object payload",
                self.field
            )));
        };
        match &self.replacement {
            Some(replacement) => {
                map.insert(self.field.to_string(), replacement.clone());
            }
            None => {
                map.remove(self.field);
            }
        }
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value<T: Serialize>(record: &T) -> Value {
        serde_json::to_value(record).expect("fixture serializes")
    }

    #[test]
    fn sample_pet_uses_wire_field_names() {
        let value = to_value(&Pet::sample(12345));

        assert_eq!(value["id"], json!(12345));
        assert_eq!(value["name"], json!("Oreo"));
        assert_eq!(value["photoUrls"][0], json!(SAMPLE_PHOTO_URL));
        assert_eq!(value["category"]["name"], json!("dog"));
    }

    #[test]
    fn builders_are_deterministic() {
        assert_eq!(Pet::sample(1), Pet::sample(1));
        assert_eq!(to_value(&Order::sample(2, 1)), to_value(&Order::sample(2, 1)));
    }

    #[test]
    fn minimal_pet_omits_empty_collections() {
        let value = to_value(&Pet::minimal(54321, "Bolt"));
        assert!(value.get("photoUrls").is_none());
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn field_editing_helpers() {
        let order = to_value(&without_field(Order::sample(2, 1), "quantity"));
        assert!(order.get("quantity").is_none());
        assert_eq!(order["petId"], json!(1));

        let pet = to_value(&with_field(Pet::sample(1), "id", json!(9_223_372_036_854_775_808u64)));
        assert_eq!(pet["id"].as_u64(), Some(9_223_372_036_854_775_808));
        assert_eq!(pet["id"].as_i64(), None);
    }

    #[test]
    fn patching_a_non_object_is_a_serialization_error() {
        let patched = without_field(vec![1, 2, 3], "id");
        let err = serde_json::to_value(&patched).unwrap_err();
        assert!(err.to_string().contains("non-object"));
    }

    #[test]
    fn order_and_user_use_camel_case() {
        let order = to_value(&Order::sample(2, 12345));
        assert_eq!(order["petId"], json!(12345));
        assert_eq!(order["shipDate"], json!(SAMPLE_SHIP_DATE));

        let user = to_value(&User::sample(123, "probe-user"));
        assert_eq!(user["firstName"], json!("First"));
        assert_eq!(user["userStatus"], json!(0));
    }
}
