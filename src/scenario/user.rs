//! User account scenarios.

use crate::fixtures::User;
use crate::testing::assertion::Expectation;
use crate::testing::verdict::ScenarioVerdict;

use super::{Family, Scenario, ScenarioContext, ScenarioRun, scenario};

const USER_PATH: &str = "/user/{{username}}";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        scenario!(Family::User, "create_user", create_user),
        scenario!(Family::User, "login", login),
        scenario!(Family::User, "logout", logout),
        scenario!(Family::User, "update_user", update_user),
        scenario!(Family::User, "get_user", get_user),
        scenario!(Family::User, "delete_user", delete_user),
    ]
}

/// Create `user` and register its deletion. The API echoes the new id as
/// the response message.
async fn register(run: &mut ScenarioRun, user: &User) {
    let ctx = run.ctx().clone();
    run.defer_cleanup("delete user", ctx.delete(USER_PATH).var("username", &user.username));
    run.step(
        "create",
        ctx.post("/user").json(user),
        &[
            Expectation::status(200),
            Expectation::field_eq("message", user.id.to_string()),
        ],
    )
    .await;
}

async fn create_user(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("create_user");
    register(&mut run, &User::sample(30_001, "probe-user-create")).await;
    run.finish().await
}

async fn login(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("login");
    let user = User::sample(30_002, "probe-user-login");

    register(&mut run, &user).await;
    run.confirm(
        "login",
        ctx.get("/user/login")
            .query("username", &user.username)
            .query("password", &user.password),
        &[Expectation::status(200), Expectation::field_present("message")],
    )
    .await;
    run.finish().await
}

async fn logout(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("logout");
    run.step("logout", ctx.get("/user/logout"), &[Expectation::status(200)])
        .await;
    run.finish().await
}

async fn update_user(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("update_user");
    let user = User::sample(30_003, "probe-user-update");
    let updated = User {
        first_name: "Updated".to_string(),
        ..user.clone()
    };

    register(&mut run, &user).await;
    run.step(
        "update",
        ctx.put(USER_PATH)
            .var("username", &user.username)
            .json(&updated),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read updated",
        ctx.get(USER_PATH).var("username", &user.username),
        &[
            Expectation::status(200),
            Expectation::field_eq("firstName", "Updated"),
        ],
    )
    .await;
    run.finish().await
}

async fn get_user(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("get_user");
    let user = User::sample(30_004, "probe-user-get");

    register(&mut run, &user).await;
    run.confirm(
        "read",
        ctx.get(USER_PATH).var("username", &user.username),
        &[
            Expectation::status(200),
            Expectation::field_eq("username", user.username.as_str()),
            Expectation::field_eq("email", user.email.as_str()),
        ],
    )
    .await;
    run.finish().await
}

async fn delete_user(ctx: ScenarioContext) -> ScenarioVerdict {
    let mut run = ctx.begin("delete_user");
    let user = User::sample(30_005, "probe-user-delete");

    register(&mut run, &user).await;
    run.step(
        "delete",
        ctx.delete(USER_PATH).var("username", &user.username),
        &[Expectation::status(200)],
    )
    .await;
    run.confirm(
        "read deleted",
        ctx.get(USER_PATH).var("username", &user.username),
        &[Expectation::status(404)],
    )
    .await;
    run.finish().await
}
