//! Pet resource scenarios.

use serde_json::{Value, json};

use crate::fixtures::{Pet, with_field, without_field};
use crate::testing::assertion::Expectation;
use crate::testing::verdict::ScenarioVerdict;

use super::{Family, Scenario, ScenarioContext, scenario};

const PET_PATH: &str = "/pet/{{petId}}";

const CREATE_ID: i64 = 10_001;
const GET_ID: i64 = 10_002;
const UPDATE_ID: i64 = 10_003;
const DELETE_ID: i64 = 10_004;
const SPECIAL_CHARS_ID: i64 = 10_005;
const NAMELESS_ID: i64 = 10_006;
const MISSING_ID: i64 = 99_999_999;
const CRUD_ID: i64 = 12_345;
const FLOW_ID: i64 = 54_321;
const FORM_ID: i64 = 678;
const PENDING_ID: i64 = 71;
const SOLD_ID: i64 = 72;
const AVAILABLE_ID: i64 = 73;
const CONCURRENT_ID: i64 = 1_234_567;

const CONCURRENT_CREATES: usize = 20;
const HIGH_VOLUME_READS: usize = 100;
const HIGH_VOLUME_WORKERS: usize = 10;

const SPECIAL_NAMES: [&str; 5] = [
    "!@#$%^",
    "Oreo\n",
    "Luna\t",
    "<script>alert('test')</script>",
    "🤓",
];

pub fn scenarios() -> Vec<Scenario> {
    vec![
        scenario!(Family::Pet, "create_pet", create_pet),
        scenario!(Family::Pet, "get_pet_by_id", get_pet_by_id),
        scenario!(Family::Pet, "update_pet", update_pet),
        scenario!(Family::Pet, "delete_pet", delete_pet),
        scenario!(Family::Pet, "pet_crud", pet_crud),
        scenario!(Family::Pet, "find_pets_by_status", find_pets_by_status),
        scenario!(Family::Pet, "special_character_names", special_character_names),
        scenario!(Family::Pet, "update_pet_with_form", update_pet_with_form),
        scenario!(Family::Pet, "pet_flow", pet_flow),
        scenario!(Family::Pet, "invalid_pet_name", invalid_pet_name),
        scenario!(Family::Pet, "large_pet_id", large_pet_id),
        scenario!(Family::Pet, "incorrect_json", incorrect_json),
        scenario!(Family::Pet, "nonexistent_pet", nonexistent_pet),
        scenario!(Family::Pet, "negative_pet_id", negative_pet_id),
        scenario!(Family::Pet, "zero_pet_id", zero_pet_id),
        scenario!(Family::Pet, "missing_pet_id", missing_pet_id),
        scenario!(Family::Pet, "invalid_http_method", invalid_http_method),
        scenario!(Family::Pet, "concurrent_pet_creation", concurrent_pet_creation),
        scenario!(Family::Pet, "high_volume_pet_reads", high_volume_pet_reads),
    ]
}

async fn create_pet(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("create_pet");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", CREATE_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::sample(CREATE_ID)),
        &[
            Expectation::status(200),
            Expectation::field_eq("id", CREATE_ID),
            Expectation::field_eq("name", "Oreo"),
            Expectation::field_eq("category.name", "dog"),
        ],
    )
    .await;
    run.finish().await
}

async fn get_pet_by_id(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("get_pet_by_id");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", GET_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::sample(GET_ID)),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read",
        ctx.get(PET_PATH).var("petId", GET_ID),
        &[
            Expectation::status(200),
            Expectation::field_eq("id", GET_ID),
            Expectation::field_eq("status", "available"),
        ],
    )
    .await;
    run.finish().await
}

async fn update_pet(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("update_pet");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", UPDATE_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::sample(UPDATE_ID)),
        &[Expectation::status(200)],
    )
    .await;
    run.step(
        "update",
        ctx.put("/pet")
            .json(&Pet::sample(UPDATE_ID).named("Bolt").with_status("sold")),
        &[
            Expectation::status(200),
            Expectation::field_eq("name", "Bolt"),
            Expectation::field_eq("status", "sold"),
        ],
    )
    .await;
    run.finish().await
}

async fn delete_pet(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("delete_pet");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", DELETE_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::sample(DELETE_ID)),
        &[Expectation::status(200)],
    )
    .await;
    run.step(
        "delete",
        ctx.delete(PET_PATH).var("petId", DELETE_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(PET_PATH).var("petId", DELETE_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

/// Create, rename, delete, then confirm the pet is gone.
async fn pet_crud(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("pet_crud");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", CRUD_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::sample(CRUD_ID)),
        &[Expectation::status(200), Expectation::field_eq("name", "Oreo")],
    )
    .await;
    run.step(
        "update",
        ctx.put("/pet").json(&Pet::sample(CRUD_ID).named("Bolt")),
        &[Expectation::status(200), Expectation::field_eq("name", "Bolt")],
    )
    .await;
    run.step(
        "delete",
        ctx.delete(PET_PATH).var("petId", CRUD_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(PET_PATH).var("petId", CRUD_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn find_pets_by_status(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("find_pets_by_status");
    let seeded = [
        (AVAILABLE_ID, "available"),
        (PENDING_ID, "pending"),
        (SOLD_ID, "sold"),
    ];

    for (id, status) in seeded {
        run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", id));
        run.step(
            "create",
            ctx.post("/pet")
                .json(&Pet::minimal(id, "Finder").with_status(status)),
            &[Expectation::status(200)],
        )
        .await;
    }

    for (_, status) in seeded {
        run.confirm(
            &format!("find {status}"),
            ctx.get("/pet/findByStatus").query("status", status),
            &[
                Expectation::status(200),
                Expectation::each_field_eq("status", status),
            ],
        )
        .await;
    }

    // Unknown and empty filters are accepted and simply match nothing.
    for status in ["", "none"] {
        run.step(
            &format!("find {status:?}"),
            ctx.get("/pet/findByStatus").query("status", status),
            &[Expectation::status(200)],
        )
        .await;
    }
    run.step(
        "find without status",
        ctx.get("/pet/findByStatus"),
        &[Expectation::status(200)],
    )
    .await;
    run.finish().await
}

async fn special_character_names(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("special_character_names");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", SPECIAL_CHARS_ID));

    for name in SPECIAL_NAMES {
        run.step(
            &format!("create {name}"),
            ctx.post("/pet").json(&Pet::sample(SPECIAL_CHARS_ID).named(name)),
            &[Expectation::status_in([200, 201])],
        )
        .await;
    }
    run.finish().await
}

async fn update_pet_with_form(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("update_pet_with_form");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", FORM_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::minimal(FORM_ID, "Formless")),
        &[Expectation::status(200)],
    )
    .await;
    run.step(
        "form update",
        ctx.post(PET_PATH)
            .var("petId", FORM_ID)
            .form([("name", "NewName"), ("status", "sold")]),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read",
        ctx.get(PET_PATH).var("petId", FORM_ID),
        &[
            Expectation::status(200),
            Expectation::field_eq("name", "NewName"),
            Expectation::field_eq("status", "sold"),
        ],
    )
    .await;
    run.finish().await
}

/// Full lifecycle with a confirming read after every write.
async fn pet_flow(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("pet_flow");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", FLOW_ID));

    run.step(
        "create",
        ctx.post("/pet").json(&Pet::minimal(FLOW_ID, "Bolt")),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read created",
        ctx.get(PET_PATH).var("petId", FLOW_ID),
        &[Expectation::status(200), Expectation::field_eq("name", "Bolt")],
    )
    .await;
    run.step(
        "update",
        ctx.post("/pet")
            .json(&Pet::minimal(FLOW_ID, "Bolt2").with_status("sold")),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read updated",
        ctx.get(PET_PATH).var("petId", FLOW_ID),
        &[
            Expectation::status(200),
            Expectation::field_eq("name", "Bolt2"),
            Expectation::field_eq("status", "sold"),
        ],
    )
    .await;
    run.step(
        "delete",
        ctx.delete(PET_PATH).var("petId", FLOW_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(PET_PATH).var("petId", FLOW_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn invalid_pet_name(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("invalid_pet_name");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", NAMELESS_ID));

    let payload = with_field(Pet::sample(NAMELESS_ID), "name", Value::Null);
    run.step(
        "create nameless",
        ctx.post("/pet").json(&payload),
        &[Expectation::status_not(200)],
    )
    .await;
    run.finish().await
}

/// An id one past `i64::MAX` overflows the server-side model.
async fn large_pet_id(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("large_pet_id");

    let payload = with_field(Pet::sample(0), "id", json!(9_223_372_036_854_775_808_u64));
    run.step(
        "create",
        ctx.post("/pet").json(&payload),
        &[Expectation::status(500)],
    )
    .await;
    run.finish().await
}

async fn incorrect_json(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("incorrect_json");

    run.step(
        "create",
        ctx.post("/pet").raw("{name: 'Buddy'}"),
        &[Expectation::status(415)],
    )
    .await;
    run.finish().await
}

async fn nonexistent_pet(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("nonexistent_pet");

    run.send("ensure absent", ctx.delete(PET_PATH).var("petId", MISSING_ID))
        .await;
    run.step(
        "read",
        ctx.get(PET_PATH).var("petId", MISSING_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.step(
        "delete",
        ctx.delete(PET_PATH).var("petId", MISSING_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn negative_pet_id(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("negative_pet_id");

    run.step(
        "read",
        ctx.get(PET_PATH).var("petId", -10),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn zero_pet_id(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("zero_pet_id");

    run.send("ensure absent", ctx.delete(PET_PATH).var("petId", 0))
        .await;
    run.step(
        "read",
        ctx.get(PET_PATH).var("petId", 0),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn missing_pet_id(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("missing_pet_id");

    let payload = without_field(Pet::sample(0), "id");
    run.step(
        "create",
        ctx.post("/pet").json(&payload),
        &[Expectation::status_not(200)],
    )
    .await;
    run.finish().await
}

async fn invalid_http_method(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("invalid_http_method");

    run.step(
        "put findByStatus",
        ctx.put("/pet/findByStatus")
            .query("status", "available")
            .json(&json!({})),
        &[Expectation::status(405)],
    )
    .await;
    run.finish().await
}

/// Twenty identical creates in parallel must all succeed, and the pet must
/// be readable afterwards.
async fn concurrent_pet_creation(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("concurrent_pet_creation");
    run.defer_cleanup("delete", ctx.delete(PET_PATH).var("petId", CONCURRENT_ID));

    run.burst(
        "create",
        ctx.post("/pet")
            .json(&Pet::minimal(CONCURRENT_ID, "TestPet")),
        CONCURRENT_CREATES,
        CONCURRENT_CREATES,
        &Expectation::status(200),
    )
    .await;
    run.confirm(
        "read",
        ctx.get(PET_PATH).var("petId", CONCURRENT_ID),
        &[
            Expectation::status(200),
            Expectation::field_eq("name", "TestPet"),
        ],
    )
    .await;
    run.finish().await
}

async fn high_volume_pet_reads(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("high_volume_pet_reads");
    let workers = HIGH_VOLUME_WORKERS.min(ctx.config().max_workers);

    run.burst(
        "find available",
        ctx.get("/pet/findByStatus").query("status", "available"),
        HIGH_VOLUME_READS,
        workers,
        &Expectation::status(200),
    )
    .await;
    run.finish().await
}
