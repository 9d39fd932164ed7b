//! # In-memory Petstore
//!
//! A local stand-in for the remote resource API, implementing the same
//! [`Remote`] contract as the live HTTP transport. State lives behind one
//! mutex that is never held across an await, so concurrent dispatches see a
//! linearizable store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::http::client::Remote;
use crate::http::method::HttpMethod;
use crate::http::request::{FORM_CONTENT_TYPE, RequestBody, RequestSpec};
use crate::http::response::{Failure, RawResponse};

/// Orders above this quantity are rejected as invalid.
pub const MAX_ORDER_QUANTITY: i64 = 1_000;

#[derive(Debug, Default)]
struct StoreState {
    pets: BTreeMap<i64, Value>,
    orders: BTreeMap<i64, Value>,
    users: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct InMemoryPetstore {
    state: Mutex<StoreState>,
    latency: Duration,
    sessions: AtomicU64,
}

impl InMemoryPetstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` before touching state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn pet(&self, id: i64) -> Option<Value> {
        self.state().pets.get(&id).cloned()
    }

    pub fn pet_count(&self) -> usize {
        self.state().pets.len()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    pub fn user(&self, username: &str) -> Option<Value> {
        self.state().users.get(username).cloned()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, spec: &RequestSpec) -> RawResponse {
        use HttpMethod::{Delete, Get, Post, Put};

        let segments: Vec<&str> = spec
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match (spec.method(), segments.as_slice()) {
            (Post | Put, ["pet"]) => self.upsert_pet(spec),
            (_, ["pet"]) => method_not_allowed(),
            (Get, ["pet", "findByStatus"]) => self.find_pets_by_status(spec),
            (_, ["pet", "findByStatus"]) => method_not_allowed(),
            (Get, ["pet", id]) => self.get_pet(id),
            (Post, ["pet", id]) => self.update_pet_with_form(id, spec),
            (Delete, ["pet", id]) => self.delete_pet(id),
            (_, ["pet", _]) => method_not_allowed(),

            (Post, ["store", "order"]) => self.place_order(spec),
            (_, ["store", "order"]) => method_not_allowed(),
            (Get, ["store", "order", id]) => self.get_order(id),
            (Delete, ["store", "order", id]) => self.delete_order(id),
            (_, ["store", "order", _]) => method_not_allowed(),
            (Get, ["store", "inventory"]) => self.inventory(),

            (Post, ["user"]) => self.create_user(spec),
            (Get, ["user", "login"]) => self.login(spec),
            (Get, ["user", "logout"]) => api_message(200, "ok"),
            (Get, ["user", username]) => self.get_user(username),
            (Put, ["user", username]) => self.update_user(username, spec),
            (Delete, ["user", username]) => self.delete_user(username),
            (_, ["user", _]) => method_not_allowed(),

            _ => api_error(404, "unknown route"),
        }
    }

    fn upsert_pet(&self, spec: &RequestSpec) -> RawResponse {
        let mut pet = match json_object(spec) {
            Ok(pet) => pet,
            Err(response) => return response,
        };
        let id = match record_id(&pet) {
            Ok(id) => id,
            Err(response) => return response,
        };
        if !pet.get("name").is_some_and(Value::is_string) {
            return invalid_input();
        }

        pet.insert("id".to_string(), json!(id));
        let pet = Value::Object(pet);
        self.state().pets.insert(id, pet.clone());
        RawResponse::json(200, &pet)
    }

    fn find_pets_by_status(&self, spec: &RequestSpec) -> RawResponse {
        let wanted: BTreeSet<&str> = spec
            .query()
            .get("status")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|status| !status.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let matches: Vec<Value> = self
            .state()
            .pets
            .values()
            .filter(|pet| {
                pet.get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|status| wanted.contains(status))
            })
            .cloned()
            .collect();
        RawResponse::json(200, &Value::Array(matches))
    }

    fn get_pet(&self, raw_id: &str) -> RawResponse {
        let Ok(id) = raw_id.parse::<i64>() else {
            return api_error(404, "Pet not found");
        };
        match self.state().pets.get(&id) {
            Some(pet) => RawResponse::json(200, pet),
            None => api_error(404, "Pet not found"),
        }
    }

    fn update_pet_with_form(&self, raw_id: &str, spec: &RequestSpec) -> RawResponse {
        let is_form = spec
            .effective_content_type()
            .is_some_and(|value| value.eq_ignore_ascii_case(FORM_CONTENT_TYPE));
        let Some(RequestBody::Form(fields)) = spec.body().filter(|_| is_form) else {
            return unsupported_media_type();
        };
        let Ok(id) = raw_id.parse::<i64>() else {
            return api_error(404, "Pet not found");
        };

        let mut state = self.state();
        let Some(Value::Object(pet)) = state.pets.get_mut(&id) else {
            return api_error(404, "Pet not found");
        };
        for (key, value) in fields {
            if key == "name" || key == "status" {
                pet.insert(key.clone(), json!(value));
            }
        }
        api_message(200, id)
    }

    fn delete_pet(&self, raw_id: &str) -> RawResponse {
        let removed = raw_id
            .parse::<i64>()
            .ok()
            .and_then(|id| self.state().pets.remove(&id).map(|_| id));
        match removed {
            Some(id) => api_message(200, id),
            None => RawResponse::empty(404),
        }
    }

    fn place_order(&self, spec: &RequestSpec) -> RawResponse {
        let mut order = match json_object(spec) {
            Ok(order) => order,
            Err(response) => return response,
        };
        let Ok(id) = record_id(&order) else {
            return api_error(400, "Invalid Order");
        };
        let quantity = order.get("quantity").and_then(Value::as_i64);
        if !quantity.is_some_and(|quantity| (1..=MAX_ORDER_QUANTITY).contains(&quantity)) {
            return api_error(400, "Invalid Order");
        }

        order.insert("id".to_string(), json!(id));
        let order = Value::Object(order);
        self.state().orders.insert(id, order.clone());
        RawResponse::json(200, &order)
    }

    fn get_order(&self, raw_id: &str) -> RawResponse {
        let order = raw_id
            .parse::<i64>()
            .ok()
            .and_then(|id| self.state().orders.get(&id).cloned());
        match order {
            Some(order) => RawResponse::json(200, &order),
            None => api_error(404, "Order not found"),
        }
    }

    fn delete_order(&self, raw_id: &str) -> RawResponse {
        let removed = raw_id
            .parse::<i64>()
            .ok()
            .and_then(|id| self.state().orders.remove(&id).map(|_| id));
        match removed {
            Some(id) => api_message(200, id),
            None => api_error(404, "Order Not Found"),
        }
    }

    fn inventory(&self) -> RawResponse {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for pet in self.state().pets.values() {
            if let Some(status) = pet.get("status").and_then(Value::as_str) {
                *counts.entry(status.to_string()).or_insert(0) += 1;
            }
        }
        RawResponse::json(200, &json!(counts))
    }

    fn create_user(&self, spec: &RequestSpec) -> RawResponse {
        let user = match json_object(spec) {
            Ok(user) => user,
            Err(response) => return response,
        };
        let Some(username) = user
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            return invalid_input();
        };
        let id = user.get("id").and_then(Value::as_i64).unwrap_or_default();

        self.state().users.insert(username, Value::Object(user));
        api_message(200, id)
    }

    fn login(&self, spec: &RequestSpec) -> RawResponse {
        let (Some(username), Some(password)) =
            (spec.query().get("username"), spec.query().get("password"))
        else {
            return api_error(400, "Invalid username/password supplied");
        };

        let authenticated = self
            .state()
            .users
            .get(username)
            .and_then(|user| user.get("password"))
            .and_then(Value::as_str)
            .is_some_and(|stored| stored == password.as_str());
        if !authenticated {
            return api_error(400, "Invalid username/password supplied");
        }

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        api_message(200, format!("logged in user session:{session}"))
    }

    fn get_user(&self, username: &str) -> RawResponse {
        match self.state().users.get(username) {
            Some(user) => RawResponse::json(200, user),
            None => api_error(404, "User not found"),
        }
    }

    fn update_user(&self, username: &str, spec: &RequestSpec) -> RawResponse {
        let mut user = match json_object(spec) {
            Ok(user) => user,
            Err(response) => return response,
        };
        let id = user.get("id").and_then(Value::as_i64).unwrap_or_default();
        let new_name = user
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(username)
            .to_string();
        user.insert("username".to_string(), Value::String(new_name.clone()));

        let mut state = self.state();
        state.users.remove(username);
        state.users.insert(new_name, Value::Object(user));
        api_message(200, id)
    }

    fn delete_user(&self, username: &str) -> RawResponse {
        match self.state().users.remove(username) {
            Some(_) => api_message(200, username),
            None => RawResponse::empty(404),
        }
    }
}

#[async_trait]
impl Remote for InMemoryPetstore {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, Failure> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.route(spec))
    }

    fn describe(&self) -> String {
        "in-memory petstore".to_string()
    }
}

/// The JSON object carried by `spec`, or the error response the API gives
/// for a missing, mistyped, or unparseable payload.
fn json_object(spec: &RequestSpec) -> Result<Map<String, Value>, RawResponse> {
    let declares_json = spec
        .effective_content_type()
        .is_some_and(|value| value.to_ascii_lowercase().contains("json"));
    if !declares_json {
        return Err(unsupported_media_type());
    }

    let payload = match spec.body() {
        Some(RequestBody::Json(value)) => value.clone(),
        Some(RequestBody::Raw(raw)) => {
            serde_json::from_str(raw).map_err(|_| api_error(400, "bad input"))?
        }
        Some(RequestBody::Form(_)) => return Err(api_error(400, "bad input")),
        None => return Err(invalid_input()),
    };

    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(api_error(400, "bad input")),
    }
}

/// Ids must be present and fit in an i64.
fn record_id(record: &Map<String, Value>) -> Result<i64, RawResponse> {
    match record.get("id") {
        None | Some(Value::Null) => Err(invalid_input()),
        Some(value) => match value.as_i64() {
            Some(id) => Ok(id),
            None if value.is_number() => Err(api_error(500, "something bad happened")),
            None => Err(api_error(400, "bad input")),
        },
    }
}

fn api_message(code: u16, message: impl ToString) -> RawResponse {
    RawResponse::json(
        code,
        &json!({"code": code, "type": "unknown", "message": message.to_string()}),
    )
}

fn api_error(code: u16, message: &str) -> RawResponse {
    RawResponse::json(
        code,
        &json!({"code": 1, "type": "error", "message": message}),
    )
}

fn invalid_input() -> RawResponse {
    api_error(405, "Invalid input")
}

fn method_not_allowed() -> RawResponse {
    RawResponse::empty(405)
}

fn unsupported_media_type() -> RawResponse {
    RawResponse::empty(415)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Order, Pet, User, with_field, without_field};

    async fn send(store: &InMemoryPetstore, spec: RequestSpec) -> RawResponse {
        store.send(&spec).await.expect("fake never fails transport")
    }

    fn body(response: &RawResponse) -> Value {
        serde_json::from_slice(&response.body).expect("json body")
    }

    #[tokio::test]
    async fn pet_lifecycle() {
        let store = InMemoryPetstore::new();

        let created = send(
            &store,
            RequestSpec::post("/pet").json(&Pet::sample(7)).build().unwrap(),
        )
        .await;
        assert_eq!(created.status, 200);
        assert_eq!(body(&created)["name"], json!("Oreo"));

        let fetched = send(&store, RequestSpec::get("/pet/7").build().unwrap()).await;
        assert_eq!(fetched.status, 200);

        let deleted = send(&store, RequestSpec::delete("/pet/7").build().unwrap()).await;
        assert_eq!(deleted.status, 200);
        assert_eq!(body(&deleted)["message"], json!("7"));

        let missing = send(&store, RequestSpec::get("/pet/7").build().unwrap()).await;
        assert_eq!(missing.status, 404);
        let again = send(&store, RequestSpec::delete("/pet/7").build().unwrap()).await;
        assert_eq!(again.status, 404);
    }

    #[tokio::test]
    async fn pet_payload_validation() {
        let store = InMemoryPetstore::new();

        let raw = RequestSpec::post("/pet").raw("{name: 'Buddy'}").build().unwrap();
        assert_eq!(send(&store, raw).await.status, 415);

        let bad_json = RequestSpec::post("/pet")
            .raw("{name: 'Buddy'}")
            .header("Content-Type", "application/json")
            .build()
            .unwrap();
        assert_eq!(send(&store, bad_json).await.status, 400);

        let no_id = without_field(Pet::sample(1), "id");
        let spec = RequestSpec::post("/pet").json(&no_id).build().unwrap();
        assert_eq!(send(&store, spec).await.status, 405);

        let no_name = without_field(Pet::sample(1), "name");
        let spec = RequestSpec::post("/pet").json(&no_name).build().unwrap();
        assert_eq!(send(&store, spec).await.status, 405);

        let huge = with_field(Pet::sample(1), "id", json!(9_223_372_036_854_775_808u64));
        let spec = RequestSpec::post("/pet").json(&huge).build().unwrap();
        assert_eq!(send(&store, spec).await.status, 500);

        assert_eq!(store.pet_count(), 0);
    }

    #[tokio::test]
    async fn routing_edge_cases() {
        let store = InMemoryPetstore::new();

        assert_eq!(
            send(&store, RequestSpec::put("/pet/findByStatus").build().unwrap())
                .await
                .status,
            405
        );
        assert_eq!(
            send(&store, RequestSpec::get("/pet-10").build().unwrap()).await.status,
            404
        );
        assert_eq!(
            send(&store, RequestSpec::get("/pet/abc").build().unwrap()).await.status,
            404
        );
    }

    #[tokio::test]
    async fn find_by_status_filters() {
        let store = InMemoryPetstore::new();
        for (id, status) in [(1, "available"), (2, "sold"), (3, "sold")] {
            let pet = Pet::sample(id).with_status(status);
            send(&store, RequestSpec::post("/pet").json(&pet).build().unwrap()).await;
        }

        let sold = send(
            &store,
            RequestSpec::get("/pet/findByStatus")
                .query("status", "sold")
                .build()
                .unwrap(),
        )
        .await;
        assert_eq!(body(&sold).as_array().map(Vec::len), Some(2));

        let none = send(&store, RequestSpec::get("/pet/findByStatus").build().unwrap()).await;
        assert_eq!(none.status, 200);
        assert_eq!(body(&none), json!([]));
    }

    #[tokio::test]
    async fn form_update_requires_form_encoding() {
        let store = InMemoryPetstore::new();
        send(&store, RequestSpec::post("/pet").json(&Pet::sample(5)).build().unwrap()).await;

        let json_update = RequestSpec::post("/pet/5")
            .json_value(json!({"name": "X"}))
            .build()
            .unwrap();
        assert_eq!(send(&store, json_update).await.status, 415);

        let form_update = RequestSpec::post("/pet/5")
            .form([("name", "NewName"), ("status", "sold")])
            .build()
            .unwrap();
        assert_eq!(send(&store, form_update).await.status, 200);
        assert_eq!(store.pet(5).unwrap()["status"], json!("sold"));
    }

    #[tokio::test]
    async fn order_quantity_bounds() {
        let store = InMemoryPetstore::new();
        for quantity in [0, -20, MAX_ORDER_QUANTITY + 1] {
            let order = Order::sample(2, 1).with_quantity(quantity);
            let spec = RequestSpec::post("/store/order").json(&order).build().unwrap();
            assert_eq!(send(&store, spec).await.status, 400, "quantity {quantity}");
        }

        let spec = RequestSpec::post("/store/order")
            .json(&Order::sample(2, 1))
            .build()
            .unwrap();
        assert_eq!(send(&store, spec).await.status, 200);
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn inventory_counts_statuses() {
        let store = InMemoryPetstore::new();
        for id in 1..=3 {
            let pet = Pet::sample(id).with_status("probe");
            send(&store, RequestSpec::post("/pet").json(&pet).build().unwrap()).await;
        }

        let inventory = send(&store, RequestSpec::get("/store/inventory").build().unwrap()).await;
        assert_eq!(body(&inventory)["probe"], json!(3));
    }

    #[tokio::test]
    async fn user_login_checks_password() {
        let store = InMemoryPetstore::new();
        let user = User::sample(123, "probe");
        let created = send(&store, RequestSpec::post("/user").json(&user).build().unwrap()).await;
        assert_eq!(body(&created)["message"], json!("123"));

        let good = RequestSpec::get("/user/login")
            .query("username", "probe")
            .query("password", "root")
            .build()
            .unwrap();
        assert_eq!(send(&store, good).await.status, 200);

        let bad = RequestSpec::get("/user/login")
            .query("username", "probe")
            .query("password", "wrong")
            .build()
            .unwrap();
        assert_eq!(send(&store, bad).await.status, 400);
    }
}
