//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use flockwise_core::error::FarmResult;
use flockwise_core::models::membership::{CreateMembership, Membership, TeamRole};
use flockwise_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, total_of};
use crate::error::DbError;

const ENTITY: &str = "membership";

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    user_id: String,
    team_id: String,
    role: String,
    joined_at: DateTime<Utc>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        let role = TeamRole::parse(&self.role)
            .ok_or_else(|| DbError::decode(ENTITY, format!("unknown role: {}", self.role)))?;
        Ok(Membership {
            user_id: parse_uuid(ENTITY, "user_id", &self.user_id)?,
            team_id: parse_uuid(ENTITY, "team_id", &self.team_id)?,
            role,
            joined_at: self.joined_at,
        })
    }
}

fn into_memberships(rows: Vec<MembershipRow>) -> Result<Vec<Membership>, DbError> {
    rows.into_iter()
        .map(MembershipRow::try_into_membership)
        .collect()
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn add(&self, input: CreateMembership) -> FarmResult<Membership> {
        let user_id_str = input.user_id.to_string();
        let team_id_str = input.team_id.to_string();

        // Both ends must exist before the association is written.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE id = type::record('user', $user_id) GROUP ALL; \
                 SELECT count() AS total FROM team \
                 WHERE id = type::record('team', $team_id) GROUP ALL;",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("team_id", team_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let user_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total_of(&user_count) == 0 {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: user_id_str,
            }
            .into());
        }
        let team_count: Vec<CountRow> = check.take(1).map_err(DbError::from)?;
        if total_of(&team_count) == 0 {
            return Err(DbError::NotFound {
                entity: "team".into(),
                id: team_id_str,
            }
            .into());
        }

        let result = self
            .db
            .query(
                "CREATE membership SET \
                 user_id = $user_id, team_id = $team_id, role = $role",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("team_id", team_id_str))
            .bind(("role", input.role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: user_id_str,
        })?;

        Ok(row.try_into_membership()?)
    }

    async fn remove(&self, user_id: Uuid, team_id: Uuid) -> FarmResult<()> {
        self.db
            .query("DELETE membership WHERE user_id = $user_id AND team_id = $team_id")
            .bind(("user_id", user_id.to_string()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get(&self, user_id: Uuid, team_id: Uuid) -> FarmResult<Option<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership \
                 WHERE user_id = $user_id AND team_id = $team_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(MembershipRow::try_into_membership)
            .transpose()?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> FarmResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership WHERE user_id = $user_id \
                 ORDER BY joined_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_memberships(rows)?)
    }

    async fn list_for_team(&self, team_id: Uuid) -> FarmResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership WHERE team_id = $team_id \
                 ORDER BY joined_at ASC",
            )
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_memberships(rows)?)
    }
}
