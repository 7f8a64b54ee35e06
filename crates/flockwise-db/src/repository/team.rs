//! SurrealDB implementation of [`TeamRepository`].

use chrono::{DateTime, Utc};
use flockwise_core::error::FarmResult;
use flockwise_core::models::team::{CreateTeam, SubscriptionTier, Team, UpdateTeam};
use flockwise_core::repository::{PaginatedResult, Pagination, TeamRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, total_of};
use crate::error::DbError;

const ENTITY: &str = "team";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TeamRow {
    name: String,
    slug: String,
    subscription_tier: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_team(self, id: Uuid) -> Result<Team, DbError> {
        let subscription_tier = SubscriptionTier::parse(&self.subscription_tier).ok_or_else(|| {
            DbError::decode(ENTITY, format!("unknown tier: {}", self.subscription_tier))
        })?;
        Ok(Team {
            id,
            name: self.name,
            slug: self.slug,
            subscription_tier,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TeamRowWithId {
    record_id: String,
    name: String,
    slug: String,
    subscription_tier: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRowWithId {
    fn try_into_team(self) -> Result<Team, DbError> {
        let id = parse_uuid(ENTITY, "id", &self.record_id)?;
        TeamRow {
            name: self.name,
            slug: self.slug,
            subscription_tier: self.subscription_tier,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_team(id)
    }
}

/// SurrealDB implementation of the Team repository.
#[derive(Clone)]
pub struct SurrealTeamRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTeamRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamRepository for SurrealTeamRepository<C> {
    async fn create(&self, input: CreateTeam) -> FarmResult<Team> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let tier = input.subscription_tier.unwrap_or_default();

        let result = self
            .db
            .query(
                "CREATE type::record('team', $id) SET \
                 name = $name, slug = $slug, \
                 subscription_tier = $subscription_tier",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("subscription_tier", tier.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_team(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FarmResult<Team> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('team', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_team(id)?)
    }

    async fn get_by_slug(&self, slug: &str) -> FarmResult<Team> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM team WHERE slug = $slug")
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: format!("slug={slug}"),
        })?;

        Ok(row.try_into_team()?)
    }

    async fn update(&self, id: Uuid, input: UpdateTeam) -> FarmResult<Team> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.slug.is_some() {
            sets.push("slug = $slug");
        }
        if input.subscription_tier.is_some() {
            sets.push("subscription_tier = $subscription_tier");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('team', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(slug) = input.slug {
            builder = builder.bind(("slug", slug));
        }
        if let Some(tier) = input.subscription_tier {
            builder = builder.bind(("subscription_tier", tier.as_str().to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_team(id)?)
    }

    async fn list(&self, pagination: Pagination) -> FarmResult<PaginatedResult<Team>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM team GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_team())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
