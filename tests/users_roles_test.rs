mod common;

use assert_matches::assert_matches;
use silo_api::{
    entities::business_user::{UserRole, UserStatus},
    errors::ServiceError,
    services::users::{CreateUserCommand, UpdateUserCommand},
};
use test_case::test_case;

use common::{setup, DEFAULT_PASSWORD};

fn new_user(username: &str, role: UserRole) -> CreateUserCommand {
    CreateUserCommand {
        username: username.to_string(),
        role,
        display_name: None,
        email: None,
        phone: None,
    }
}

#[tokio::test]
async fn manager_cannot_delete_the_owner() {
    let app = setup("users_owner_delete").await;
    let manager_ctx = app.ctx();

    let err = app
        .services
        .users
        .delete(&manager_ctx, app.owner.id)
        .await
        .expect_err("deleting the owner must be forbidden");
    assert_matches!(err, ServiceError::Forbidden(_));

    // Even the owner cannot delete their own row
    let err = app
        .services
        .users
        .delete(&app.owner_ctx(), app.owner.id)
        .await
        .expect_err("the owner row is protected from everyone");
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn owner_role_and_status_are_immutable() {
    let app = setup("users_owner_immutable").await;

    let err = app
        .services
        .users
        .update(
            &app.owner_ctx(),
            app.owner.id,
            UpdateUserCommand {
                status: Some(UserStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .expect_err("owner status must be immutable");
    assert_matches!(err, ServiceError::Forbidden(_));

    // Contact fields remain editable by the owner themselves
    let updated = app
        .services
        .users
        .update(
            &app.owner_ctx(),
            app.owner.id,
            UpdateUserCommand {
                display_name: Some("Olive O.".into()),
                ..Default::default()
            },
        )
        .await
        .expect("self-edit of contact fields should work");
    assert_eq!(updated.display_name.as_deref(), Some("Olive O."));
}

#[tokio::test]
async fn seat_cap_is_enforced_server_side() {
    let app = setup("users_seat_cap").await;
    let ctx = app.owner_ctx();

    // Business seeded with max_users = 4 and two existing users
    app.services
        .users
        .create(&ctx, new_user("epos1", UserRole::Pos))
        .await
        .expect("third seat fits");
    app.services
        .users
        .create(&ctx, new_user("epos2", UserRole::Employee))
        .await
        .expect("fourth seat fits");

    let err = app
        .services
        .users
        .create(&ctx, new_user("epos3", UserRole::Employee))
        .await
        .expect_err("fifth seat must be rejected");
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn created_users_get_the_default_password_once() {
    let app = setup("users_default_password").await;
    let ctx = app.owner_ctx();

    let created = app
        .services
        .users
        .create(&ctx, new_user("casey", UserRole::Employee))
        .await
        .expect("creation should succeed");
    assert_eq!(created.initial_password, DEFAULT_PASSWORD);

    // The hash on the row actually verifies against that password
    assert!(silo_api::auth::AuthService::verify_password(
        &created.initial_password,
        &created.user.password_hash
    )
    .unwrap());

    let reset = app
        .services
        .users
        .reset_password(&ctx, created.user.id)
        .await
        .expect("reset should succeed");
    assert_eq!(reset.new_password, DEFAULT_PASSWORD);
}

#[test_case(UserRole::Employee ; "employees cannot manage users")]
#[test_case(UserRole::Pos ; "pos accounts cannot manage users")]
#[tokio::test]
async fn non_managing_roles_cannot_create_users(role: UserRole) {
    let app = setup(&format!("users_role_{:?}", role)).await;
    let mut ctx = app.ctx();
    ctx.role = role;

    let err = app
        .services
        .users
        .create(&ctx, new_user("nope", UserRole::Employee))
        .await
        .expect_err("non-managing roles must be rejected");
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn second_owner_cannot_be_created() {
    let app = setup("users_single_owner").await;

    let err = app
        .services
        .users
        .create(&app.owner_ctx(), new_user("other-owner", UserRole::Owner))
        .await
        .expect_err("a business has exactly one owner");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn owner_password_reset_is_self_only() {
    let app = setup("users_owner_reset").await;

    let err = app
        .services
        .users
        .reset_password(&app.ctx(), app.owner.id)
        .await
        .expect_err("manager must not reset the owner's password");
    assert_matches!(err, ServiceError::Forbidden(_));

    app.services
        .users
        .reset_password(&app.owner_ctx(), app.owner.id)
        .await
        .expect("owner may reset their own password");
}
