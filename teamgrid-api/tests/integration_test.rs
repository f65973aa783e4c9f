/// Integration tests for the TeamGrid API
///
/// These tests verify the guard chain and the invitation lifecycle
/// end-to-end against a real PostgreSQL:
/// - Authentication and token handling
/// - Tenant context resolution from the X-Org-Id header
/// - Cross-organization isolation
/// - Role policy enforcement
/// - Invitation send/accept/reject, including the expired and
///   already-processed paths
///
/// They require DATABASE_URL and JWT_SECRET to be set and are ignored by
/// default; run with `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{json_request, TestContext};
use serde_json::json;
use teamgrid_shared::models::org_membership::{MembershipStatus, OrgMembership, OrgRole};

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("register-{}@example.com", uuid::Uuid::new_v4());

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/auth/register",
            None,
            None,
            Some(json!({
                "email": email,
                "password": common::TEST_PASSWORD,
                "name": "Registration Test"
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"]
        .as_str()
        .unwrap()
        .starts_with("tgs_"));

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/auth/login",
            None,
            None,
            Some(json!({
                "email": email,
                "password": common::TEST_PASSWORD
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .send(json_request("GET", "/v1/orgs", None, None, None))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_org_scoped_routes_require_header() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    // Missing header fails before any data access, even for the owner.
    let (status, _) = ctx
        .send(json_request("GET", "/v1/org", Some(&token), None, None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // With the header the same request succeeds.
    let (status, body) = ctx
        .send(json_request("GET", "/v1/org", Some(&token), Some(org.id), None))
        .await;
    assert_eq!(status, StatusCode::OK, "get org failed: {}", body);
    assert_eq!(body["role"], "owner");
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_non_member_org_header_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, _) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (_, outsider_token) = ctx.create_user("outsider").await.unwrap();

    let (status, _) = ctx
        .send(json_request(
            "GET",
            "/v1/org",
            Some(&outsider_token),
            Some(org.id),
            None,
        ))
        .await;

    // Indistinguishable from a nonexistent organization.
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(json_request(
            "GET",
            "/v1/org",
            Some(&outsider_token),
            Some(uuid::Uuid::new_v4()),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_member_cannot_create_project() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, _) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (member, member_token) = ctx.create_user("member").await.unwrap();
    ctx.add_member(&org, &member, OrgRole::Member).await.unwrap();

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/projects",
            Some(&member_token),
            Some(org.id),
            Some(json!({ "name": "Forbidden Project" })),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_cross_org_project_access_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();

    let (alice, alice_token) = ctx.create_user("alice").await.unwrap();
    let org_a = ctx.create_org(&alice).await.unwrap();

    let (bob, bob_token) = ctx.create_user("bob").await.unwrap();
    let org_b = ctx.create_org(&bob).await.unwrap();

    // Alice creates a project in org A.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/projects",
            Some(&alice_token),
            Some(org_a.id),
            Some(json!({ "name": "Org A Project" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    let project_id = body["id"].as_str().unwrap().to_string();

    // Bob, resolved into org B, references Alice's project: Forbidden, and
    // never rebound to org A.
    let (status, _) = ctx
        .send(json_request(
            "GET",
            &format!("/v1/projects/{}", project_id),
            Some(&bob_token),
            Some(org_b.id),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_org_admin_override_on_projects() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (admin, admin_token) = ctx.create_user("admin").await.unwrap();
    ctx.add_member(&org, &admin, OrgRole::Admin).await.unwrap();

    // Owner creates a project without adding the admin to it.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/projects",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "name": "Override Project" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    let project_id = body["id"].as_str().unwrap().to_string();

    // The org admin can still act on it, with an effective admin role.
    let (status, body) = ctx
        .send(json_request(
            "GET",
            &format!("/v1/projects/{}", project_id),
            Some(&admin_token),
            Some(org.id),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "override failed: {}", body);
    assert_eq!(body["project_role"], "admin");
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_invite_accept_lifecycle() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (invitee, invitee_token) = ctx.create_user("invitee").await.unwrap();
    let invitee_email = invitee.email.clone().unwrap();

    // Owner invites the existing account's email.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee_email, "role": "member" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
    assert_eq!(body["outcome"], "invited");
    let invite_token = body["invite_token"].as_str().unwrap().to_string();

    // A second invitation to the same email conflicts.
    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee.email.clone().unwrap() })),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The invitee cannot resolve a tenant context before accepting.
    let (status, _) = ctx
        .send(json_request(
            "GET",
            "/v1/org",
            Some(&invitee_token),
            Some(org.id),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Accept.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&invitee_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "accept failed: {}", body);
    assert_eq!(body["status"], "active");

    // Now the tenant context resolves.
    let (status, body) = ctx
        .send(json_request(
            "GET",
            "/v1/org",
            Some(&invitee_token),
            Some(org.id),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "member");

    // The token is single-use: consumption nulled it, so a replay cannot
    // find it anymore.
    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&invitee_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let row = OrgMembership::find_by_org_and_email(&ctx.db, org.id, &invitee_email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, MembershipStatus::Active);
    assert!(row.invite_token.is_none());
    assert!(row.invite_expires_at.is_none());

    // The accept left a durable notification for the org admins.
    let (status, body) = ctx
        .send(json_request(
            "GET",
            "/v1/notifications",
            Some(&owner_token),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"invite_accepted"), "got kinds {:?}", kinds);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_invite_wrong_email_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": format!("ghost-{}@example.com", uuid::Uuid::new_v4()) })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
    let invite_token = body["invite_token"].as_str().unwrap().to_string();
    let membership_id = body["membership"]["id"].as_str().unwrap().to_string();

    // A different authenticated account cannot consume the token.
    let (_, interloper_token) = ctx.create_user("interloper").await.unwrap();
    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&interloper_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Expiring the token changes nothing: the wrong account stays Forbidden,
    // never learning whether the token was still live.
    sqlx::query("UPDATE org_memberships SET invite_expires_at = $2 WHERE id = $1::uuid")
        .bind(&membership_id)
        .bind(Utc::now() - Duration::hours(1))
        .execute(&ctx.db)
        .await
        .unwrap();

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&interloper_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_expired_invite_is_gone_and_resendable() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (invitee, invitee_token) = ctx.create_user("latecomer").await.unwrap();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee.email.clone().unwrap() })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
    let invite_token = body["invite_token"].as_str().unwrap().to_string();
    let membership_id = body["membership"]["id"].as_str().unwrap().to_string();

    // Backdate the expiry directly.
    sqlx::query("UPDATE org_memberships SET invite_expires_at = $2 WHERE id = $1::uuid")
        .bind(&membership_id)
        .bind(Utc::now() - Duration::hours(1))
        .execute(&ctx.db)
        .await
        .unwrap();

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&invitee_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Resend reissues a fresh token that works.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            &format!("/v1/org/invites/{}/resend", membership_id),
            Some(&owner_token),
            Some(org.id),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "resend failed: {}", body);
    let fresh_token = body["invite_token"].as_str().unwrap().to_string();
    assert_ne!(fresh_token, invite_token);

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/accept",
            Some(&invitee_token),
            None,
            Some(json!({ "token": fresh_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_reject_then_reinvite() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (invitee, invitee_token) = ctx.create_user("decliner").await.unwrap();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee.email.clone().unwrap() })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
    let invite_token = body["invite_token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/invites/reject",
            Some(&invitee_token),
            None,
            Some(json!({ "token": invite_token })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "reject failed: {}", body);
    assert_eq!(body["status"], "rejected");

    // Inviting the same email again reissues on the rejected row.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee.email.clone().unwrap() })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "reinvite failed: {}", body);
    assert_eq!(body["outcome"], "reinvited");

    let row = OrgMembership::find_by_org_and_email(
        &ctx.db,
        org.id,
        invitee.email.as_deref().unwrap(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(row.status, MembershipStatus::Invited);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_concurrent_accepts_have_one_winner() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (invitee, invitee_token) = ctx.create_user("racer").await.unwrap();
    let invitee_email = invitee.email.clone().unwrap();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": invitee_email })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
    let invite_token = body["invite_token"].as_str().unwrap().to_string();

    // Two accepts of the same token in flight at once: the conditional
    // UPDATE lets exactly one through.
    let first = ctx.send(json_request(
        "POST",
        "/v1/invites/accept",
        Some(&invitee_token),
        None,
        Some(json!({ "token": invite_token })),
    ));
    let second = ctx.send(json_request(
        "POST",
        "/v1/invites/accept",
        Some(&invitee_token),
        None,
        Some(json!({ "token": invite_token })),
    ));
    let ((status_a, _), (status_b, _)) = tokio::join!(first, second);

    let statuses = [status_a, status_b];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "expected exactly one winner, got {:?}",
        statuses
    );
    assert!(
        statuses.iter().any(|s| s.is_client_error()),
        "loser should fail as a client error, got {:?}",
        statuses
    );

    // Regardless of which request won, the row ends up active once.
    let row = OrgMembership::find_by_org_and_email(&ctx.db, org.id, invitee.email.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, MembershipStatus::Active);
    assert_eq!(row.user_id, Some(invitee.id));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_inviting_active_member_updates_in_place() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, owner_token) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (member, _) = ctx.create_user("promotee").await.unwrap();
    ctx.add_member(&org, &member, OrgRole::Member).await.unwrap();

    // Inviting an email that is already an active member applies the role in
    // place; no token is issued.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/org/invites",
            Some(&owner_token),
            Some(org.id),
            Some(json!({ "email": member.email.clone().unwrap(), "role": "admin" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "in-place update failed: {}", body);
    assert_eq!(body["outcome"], "existing_member_updated");
    assert!(body["invite_token"].is_null());
    assert_eq!(body["membership"]["role"], "admin");
    assert_eq!(body["membership"]["status"], "active");
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_membership_rows_are_unique_per_org_and_user() {
    let ctx = TestContext::new().await.unwrap();
    let (owner, _) = ctx.create_user("owner").await.unwrap();
    let org = ctx.create_org(&owner).await.unwrap();

    let (member, _) = ctx.create_user("duplicated").await.unwrap();
    ctx.add_member(&org, &member, OrgRole::Member).await.unwrap();

    // A second row for the same (org, user) pair violates the unique index.
    let duplicate = ctx.add_member(&org, &member, OrgRole::Admin).await;
    assert!(duplicate.is_err());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_password_change_revokes_old_tokens() {
    let ctx = TestContext::new().await.unwrap();
    let (user, old_token) = ctx.create_user("rotator").await.unwrap();
    let _ = user;

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/v1/auth/password",
            Some(&old_token),
            None,
            Some(json!({
                "current_password": common::TEST_PASSWORD,
                "new_password": "Another-Passw0rd!"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "password change failed: {}", body);
    let new_token = body["access_token"].as_str().unwrap().to_string();

    // The old access token is orphaned by the version bump.
    let (status, _) = ctx
        .send(json_request("GET", "/v1/orgs", Some(&old_token), None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The freshly issued one works.
    let (status, _) = ctx
        .send(json_request("GET", "/v1/orgs", Some(&new_token), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
}
