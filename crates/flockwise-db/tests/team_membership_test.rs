//! Integration tests for Team, User and Membership repositories using
//! in-memory SurrealDB.

use flockwise_core::error::FarmError;
use flockwise_core::models::membership::{CreateMembership, TeamRole};
use flockwise_core::models::team::{CreateTeam, SubscriptionTier, UpdateTeam};
use flockwise_core::models::user::CreateUser;
use flockwise_core::repository::{
    MembershipRepository, Pagination, TeamRepository, UserRepository,
};
use flockwise_db::repository::{
    SurrealMembershipRepository, SurrealTeamRepository, SurrealUserRepository,
};
use flockwise_db::verify_password;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    flockwise_db::run_migrations(&db).await.unwrap();
    db
}

fn new_team(slug: &str) -> CreateTeam {
    CreateTeam {
        name: format!("Team {slug}"),
        slug: slug.into(),
        subscription_tier: None,
    }
}

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        name: "Farmer".into(),
        email: email.into(),
        password: "CorrectHorse42!".into(),
        is_super_admin: false,
    }
}

// -----------------------------------------------------------------------
// Teams
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_team() {
    let db = setup().await;
    let repo = SurrealTeamRepository::new(db);

    let team = repo.create(new_team("green-valley")).await.unwrap();
    assert_eq!(team.slug, "green-valley");
    assert_eq!(team.subscription_tier, SubscriptionTier::Free);

    let fetched = repo.get_by_id(team.id).await.unwrap();
    assert_eq!(fetched.id, team.id);

    let by_slug = repo.get_by_slug("green-valley").await.unwrap();
    assert_eq!(by_slug.id, team.id);
}

#[tokio::test]
async fn duplicate_team_slug_rejected() {
    let db = setup().await;
    let repo = SurrealTeamRepository::new(db);

    repo.create(new_team("dup")).await.unwrap();
    let result = repo.create(new_team("dup")).await;

    assert!(result.is_err(), "duplicate slug should be rejected");
}

#[tokio::test]
async fn update_team_tier() {
    let db = setup().await;
    let repo = SurrealTeamRepository::new(db);
    let team = repo.create(new_team("upgrade")).await.unwrap();

    let updated = repo
        .update(
            team.id,
            UpdateTeam {
                subscription_tier: Some(SubscriptionTier::Pro),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.subscription_tier, SubscriptionTier::Pro);
    assert_eq!(updated.slug, "upgrade");
}

#[tokio::test]
async fn list_teams_with_pagination() {
    let db = setup().await;
    let repo = SurrealTeamRepository::new(db);
    for i in 0..3 {
        repo.create(new_team(&format!("farm-{i}"))).await.unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn user_password_is_hashed() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(new_user("ana@example.com")).await.unwrap();

    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(verify_password("CorrectHorse42!", &user.password_hash, None).unwrap());
    assert!(!verify_password("wrong", &user.password_hash, None).unwrap());
    assert_eq!(user.current_team_id, None);
}

#[tokio::test]
async fn set_and_clear_current_team() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let teams = SurrealTeamRepository::new(db);

    let user = users.create(new_user("ben@example.com")).await.unwrap();
    let team = teams.create(new_team("ben-farm")).await.unwrap();

    let switched = users.set_current_team(user.id, Some(team.id)).await.unwrap();
    assert_eq!(switched.current_team_id, Some(team.id));

    let fetched = users.get_by_email("ben@example.com").await.unwrap();
    assert_eq!(fetched.current_team_id, Some(team.id));

    let cleared = users.set_current_team(user.id, None).await.unwrap();
    assert_eq!(cleared.current_team_id, None);
}

// -----------------------------------------------------------------------
// Memberships
// -----------------------------------------------------------------------

#[tokio::test]
async fn membership_is_unique_per_user_and_team() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let teams = SurrealTeamRepository::new(db.clone());
    let members = SurrealMembershipRepository::new(db);

    let user = users.create(new_user("cleo@example.com")).await.unwrap();
    let team = teams.create(new_team("cleo-farm")).await.unwrap();

    let membership = members
        .add(CreateMembership {
            user_id: user.id,
            team_id: team.id,
            role: TeamRole::Owner,
        })
        .await
        .unwrap();
    assert_eq!(membership.role, TeamRole::Owner);

    let err = members
        .add(CreateMembership {
            user_id: user.id,
            team_id: team.id,
            role: TeamRole::Viewer,
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, FarmError::ConstraintViolation { .. }),
        "expected constraint violation, got {err:?}"
    );
}

#[tokio::test]
async fn user_can_hold_different_roles_in_different_teams() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let teams = SurrealTeamRepository::new(db.clone());
    let members = SurrealMembershipRepository::new(db);

    let user = users.create(new_user("dan@example.com")).await.unwrap();
    let a = teams.create(new_team("a-farm")).await.unwrap();
    let b = teams.create(new_team("b-farm")).await.unwrap();

    for (team_id, role) in [(a.id, TeamRole::Owner), (b.id, TeamRole::Viewer)] {
        members
            .add(CreateMembership {
                user_id: user.id,
                team_id,
                role,
            })
            .await
            .unwrap();
    }

    let all = members.list_for_user(user.id).await.unwrap();
    assert_eq!(all.len(), 2);

    let in_b = members.get(user.id, b.id).await.unwrap().unwrap();
    assert_eq!(in_b.role, TeamRole::Viewer);

    members.remove(user.id, b.id).await.unwrap();
    assert!(members.get(user.id, b.id).await.unwrap().is_none());
    assert_eq!(members.list_for_team(a.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn membership_requires_existing_team() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let members = SurrealMembershipRepository::new(db);

    let user = users.create(new_user("eve@example.com")).await.unwrap();
    let result = members
        .add(CreateMembership {
            user_id: user.id,
            team_id: Uuid::new_v4(),
            role: TeamRole::Worker,
        })
        .await;

    assert!(matches!(result, Err(FarmError::NotFound { .. })));
}
