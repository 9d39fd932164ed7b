//! Store (order and inventory) scenarios.

use crate::fixtures::{Order, Pet, without_field};
use crate::testing::assertion::Expectation;
use crate::testing::verdict::ScenarioVerdict;

use super::{Family, Scenario, ScenarioContext, ScenarioRun, scenario};

const ORDER_PATH: &str = "/store/order/{{orderId}}";
const PET_PATH: &str = "/pet/{{petId}}";

const ORDER_PET_ID: i64 = 20_001;
const INVENTORY_PET_ID: i64 = 20_002;
const PLACE_ORDER_ID: i64 = 201;
const DELETE_ORDER_ID: i64 = 202;
const MISSING_QUANTITY_ID: i64 = 203;
const NEGATIVE_QUANTITY_ID: i64 = 204;
const LARGE_QUANTITY_ID: i64 = 205;
const DELETE_TWICE_ID: i64 = 206;
const CONCURRENT_ORDER_ID: i64 = 207;
const HIGH_VOLUME_ORDER_ID: i64 = 208;
const MISSING_ORDER_ID: i64 = 99_999_996;

const INVENTORY_STATUS: &str = "probe-inventory";
const CONCURRENT_ORDERS: usize = 20;
const HIGH_VOLUME_READS: usize = 100;
const HIGH_VOLUME_WORKERS: usize = 10;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        scenario!(Family::Store, "place_and_get_order", place_and_get_order),
        scenario!(Family::Store, "inventory", inventory),
        scenario!(Family::Store, "delete_order", delete_order),
        scenario!(Family::Store, "nonexistent_order", nonexistent_order),
        scenario!(Family::Store, "missing_quantity", missing_quantity),
        scenario!(Family::Store, "negative_quantity", negative_quantity),
        scenario!(Family::Store, "large_quantity", large_quantity),
        scenario!(Family::Store, "delete_order_twice", delete_order_twice),
        scenario!(Family::Store, "concurrent_orders", concurrent_orders),
        scenario!(Family::Store, "high_volume_order_reads", high_volume_order_reads),
    ]
}

/// Place `order` and register its deletion.
async fn place(run: &mut ScenarioRun, order: &Order) {
    let ctx = run.ctx().clone();
    run.defer_cleanup("delete order", ctx.delete(ORDER_PATH).var("orderId", order.id));
    run.step(
        "place",
        ctx.post("/store/order").json(order),
        &[
            Expectation::status(200),
            Expectation::field_eq("id", order.id),
            Expectation::field_eq("quantity", order.quantity),
        ],
    )
    .await;
}

async fn place_and_get_order(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("place_and_get_order");
    run.defer_cleanup("delete pet", ctx.delete(PET_PATH).var("petId", ORDER_PET_ID));

    run.step(
        "create pet",
        ctx.post("/pet").json(&Pet::sample(ORDER_PET_ID)),
        &[Expectation::status(200)],
    )
    .await;
    place(&mut run, &Order::sample(PLACE_ORDER_ID, ORDER_PET_ID)).await;
    run.confirm(
        "read",
        ctx.get(ORDER_PATH).var("orderId", PLACE_ORDER_ID),
        &[
            Expectation::status(200),
            Expectation::field_eq("petId", ORDER_PET_ID),
            Expectation::field_eq("status", "placed"),
        ],
    )
    .await;
    run.finish().await
}

/// A pet with a status nobody else uses must show up as an inventory key.
async fn inventory(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("inventory");
    run.defer_cleanup("delete pet", ctx.delete(PET_PATH).var("petId", INVENTORY_PET_ID));

    run.step(
        "create pet",
        ctx.post("/pet")
            .json(&Pet::sample(INVENTORY_PET_ID).with_status(INVENTORY_STATUS)),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "inventory",
        ctx.get("/store/inventory"),
        &[
            Expectation::status(200),
            Expectation::field_present(INVENTORY_STATUS),
        ],
    )
    .await;
    run.finish().await
}

async fn delete_order(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("delete_order");

    place(&mut run, &Order::sample(DELETE_ORDER_ID, ORDER_PET_ID)).await;
    run.step(
        "delete",
        ctx.delete(ORDER_PATH).var("orderId", DELETE_ORDER_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(ORDER_PATH).var("orderId", DELETE_ORDER_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn nonexistent_order(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("nonexistent_order");

    run.send(
        "ensure absent",
        ctx.delete(ORDER_PATH).var("orderId", MISSING_ORDER_ID),
    )
    .await;
    run.step(
        "read",
        ctx.get(ORDER_PATH).var("orderId", MISSING_ORDER_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn missing_quantity(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("missing_quantity");
    run.defer_cleanup(
        "delete order",
        ctx.delete(ORDER_PATH).var("orderId", MISSING_QUANTITY_ID),
    );

    let payload = without_field(Order::sample(MISSING_QUANTITY_ID, ORDER_PET_ID), "quantity");
    run.step(
        "place",
        ctx.post("/store/order").json(&payload),
        &[Expectation::status_not(200)],
    )
    .await;
    run.finish().await
}

async fn negative_quantity(ctx: ScenarioContext) -> ScenarioVerdict {
    rejected_quantity(ctx, "negative_quantity", NEGATIVE_QUANTITY_ID, -20).await
}

async fn large_quantity(ctx: ScenarioContext) -> ScenarioVerdict {
    rejected_quantity(ctx, "large_quantity", LARGE_QUANTITY_ID, 1_000_000).await
}

async fn rejected_quantity(
    ctx: ScenarioContext,
    name: &str,
    order_id: i64,
    quantity: i64,
) -> ScenarioVerdict {
    let mut run = ctx.begin(name);
    run.defer_cleanup("delete order", ctx.delete(ORDER_PATH).var("orderId", order_id));

    run.step(
        "place",
        ctx.post("/store/order")
            .json(&Order::sample(order_id, ORDER_PET_ID).with_quantity(quantity)),
        &[Expectation::status_not(200)],
    )
    .await;
    run.finish().await
}

async fn delete_order_twice(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("delete_order_twice");

    place(&mut run, &Order::sample(DELETE_TWICE_ID, ORDER_PET_ID)).await;
    run.step(
        "first delete",
        ctx.delete(ORDER_PATH).var("orderId", DELETE_TWICE_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(ORDER_PATH).var("orderId", DELETE_TWICE_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.step(
        "second delete",
        ctx.delete(ORDER_PATH).var("orderId", DELETE_TWICE_ID),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}

async fn concurrent_orders(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("concurrent_orders");
    let order = Order::sample(CONCURRENT_ORDER_ID, ORDER_PET_ID);
    run.defer_cleanup(
        "delete order",
        ctx.delete(ORDER_PATH).var("orderId", CONCURRENT_ORDER_ID),
    );

    run.burst(
        "place",
        ctx.post("/store/order").json(&order),
        CONCURRENT_ORDERS,
        CONCURRENT_ORDERS,
        &Expectation::status(200),
    )
    .await;
    run.confirm(
        "read",
        ctx.get(ORDER_PATH).var("orderId", CONCURRENT_ORDER_ID),
        &[Expectation::status(200), Expectation::field_eq("id", CONCURRENT_ORDER_ID)],
    )
    .await;
    run.finish().await
}

async fn high_volume_order_reads(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("high_volume_order_reads");
    let workers = HIGH_VOLUME_WORKERS.min(ctx.config().max_workers);

    place(&mut run, &Order::sample(HIGH_VOLUME_ORDER_ID, ORDER_PET_ID)).await;
    run.confirm(
        "read placed",
        ctx.get(ORDER_PATH).var("orderId", HIGH_VOLUME_ORDER_ID),
        &[Expectation::status(200)],
    )
    .await;
    run.burst(
        "read",
        ctx.get(ORDER_PATH).var("orderId", HIGH_VOLUME_ORDER_ID),
        HIGH_VOLUME_READS,
        workers,
        &Expectation::status(200),
    )
    .await;
    run.finish().await
}
