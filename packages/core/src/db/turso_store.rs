//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! This module implements the `NodeStore` and `NodeSession` traits on top of an
//! embedded libsql (SQLite) database managed by [`DatabaseService`].
//!
//! # Locking
//!
//! Every session runs on its own connection inside `BEGIN IMMEDIATE`, which takes
//! SQLite's reserved (write) lock up front. SQLite has no row locks; the reserved lock
//! covers the whole database and is held until `COMMIT`/`ROLLBACK`, so
//! `get_for_update()` is a plain read under that lock. Concurrent sessions wait up to
//! the configured busy timeout.
//!
//! # Recursive queries
//!
//! Subtree and ancestor queries are single `WITH RECURSIVE` statements. Sort keys are
//! built with `printf('%07d', ordering)` joined by `/`, byte-identical to
//! [`crate::models::sort_key_segment`], and paths are `/`-joined resource ids.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ziggurat_core::config::TreeConfig;
//! use ziggurat_core::db::{NodeSession, NodeStore, TursoStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = TursoStore::open(TreeConfig::with_database_path("./data/tree.db")).await?;
//!
//!     let mut session = store.begin().await?;
//!     let roots = session.children_of(None).await?;
//!     session.commit().await?;
//!
//!     println!("{} root resources", roots.len());
//!     Ok(())
//! }
//! ```

use crate::config::TreeConfig;
use crate::db::database::DatabaseService;
use crate::db::error::DatabaseError;
use crate::db::node_store::{NodeSession, NodeStore, PositionRange};
use crate::models::{
    parse_tree_path, NewResource, Resource, ResourceId, ResourceKind, TreeRow, SORT_KEY_WIDTH,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::params::IntoParams;
use libsql::{params, Connection, Row};
use std::collections::HashSet;

/// Column list matching [`TursoSession::row_to_resource`], qualified with `r.`
const RESOURCE_COLUMNS: &str = "r.resource_id, r.parent_id, r.ordering, r.resource_name, \
     r.resource_type, r.payload, r.owner_user_id, r.owner_group_id, r.created_at";

/// Number of columns in [`RESOURCE_COLUMNS`]
const RESOURCE_COLUMN_COUNT: i32 = 9;

/// SQL expression formatting `column` as one sort key segment
fn sort_key_sql(column: &str) -> String {
    format!("printf('%0{}d', {})", SORT_KEY_WIDTH, column)
}

/// Traversal depth bound as bound into SQL (`None` = unbounded)
fn depth_bound(max_depth: Option<u32>) -> i64 {
    max_depth.map_or(i64::MAX, i64::from)
}

/// TursoStore implements NodeStore for the libsql backend
#[derive(Debug, Clone)]
pub struct TursoStore {
    db: DatabaseService,
}

impl TursoStore {
    /// Wrap an already initialized database service
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Open (or create) the database described by `config`
    pub async fn open(config: TreeConfig) -> Result<Self, DatabaseError> {
        Ok(Self::new(DatabaseService::new(config).await?))
    }

    /// Underlying database service
    pub fn database(&self) -> &DatabaseService {
        &self.db
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    type Session = TursoSession;

    async fn begin(&self) -> Result<TursoSession> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute("BEGIN IMMEDIATE", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e)))?;
        Ok(TursoSession { conn })
    }
}

/// One transaction on a dedicated libsql connection
///
/// Dropping the session closes the connection, which rolls back an uncommitted
/// transaction.
pub struct TursoSession {
    conn: Connection,
}

impl TursoSession {
    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(DatabaseError::malformed_row(format!("unparseable timestamp '{}'", s)).into())
    }

    /// Convert the leading [`RESOURCE_COLUMNS`] of a row into a `Resource`
    fn row_to_resource(row: &Row) -> Result<Resource> {
        let id: i64 = row.get(0).context("Failed to get resource_id")?;
        let parent_id: Option<i64> = row.get(1).context("Failed to get parent_id")?;
        let ordering: i64 = row.get(2).context("Failed to get ordering")?;
        let resource_name: String = row.get(3).context("Failed to get resource_name")?;
        let resource_type: String = row.get(4).context("Failed to get resource_type")?;
        let payload: String = row.get(5).context("Failed to get payload")?;
        let owner_user_id: Option<i64> = row.get(6).context("Failed to get owner_user_id")?;
        let owner_group_id: Option<i64> = row.get(7).context("Failed to get owner_group_id")?;
        let created_at_str: String = row.get(8).context("Failed to get created_at")?;

        let kind: ResourceKind = serde_json::from_str(&payload).map_err(|e| {
            DatabaseError::malformed_row(format!(
                "payload of resource {} ({}) is not a valid kind: {}",
                id, resource_type, e
            ))
        })?;

        Ok(Resource {
            id,
            parent_id,
            ordering,
            resource_name,
            kind,
            owner_user_id,
            owner_group_id,
            created_at: Self::parse_timestamp(&created_at_str)?,
        })
    }

    /// Convert a recursive query row: resource columns followed by depth, sort key, path
    fn row_to_tree_row(row: &Row) -> Result<TreeRow> {
        let resource = Self::row_to_resource(row)?;
        let depth: i64 = row
            .get(RESOURCE_COLUMN_COUNT)
            .context("Failed to get depth")?;
        let sort_key: String = row
            .get(RESOURCE_COLUMN_COUNT + 1)
            .context("Failed to get sort_key")?;
        let path_str: String = row
            .get(RESOURCE_COLUMN_COUNT + 2)
            .context("Failed to get path")?;

        let depth = u32::try_from(depth)
            .map_err(|_| DatabaseError::malformed_row(format!("negative depth {}", depth)))?;
        let path = parse_tree_path(&path_str).map_err(|e| {
            DatabaseError::malformed_row(format!("invalid tree path '{}': {}", path_str, e))
        })?;

        Ok(TreeRow {
            resource,
            depth,
            sort_key,
            path,
        })
    }

    async fn fetch_resources(&self, sql: &str, params: impl IntoParams) -> Result<Vec<Resource>> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Query failed: {}", e)))?;

        let mut resources = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            resources.push(Self::row_to_resource(&row)?);
        }
        Ok(resources)
    }

    async fn fetch_tree_rows(&self, sql: &str, params: impl IntoParams) -> Result<Vec<TreeRow>> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Recursive query failed: {}", e)))?;

        let mut tree_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            tree_rows.push(Self::row_to_tree_row(&row)?);
        }
        Ok(tree_rows)
    }

    /// Recursive subtree query; `start_filter` selects the depth-1 rows from `resources`
    fn subtree_sql(start_filter: &str) -> String {
        format!(
            "WITH RECURSIVE subtree(resource_id, depth, sort_key, path) AS (
                SELECT resource_id, 1, {start_key}, CAST(resource_id AS TEXT)
                FROM resources
                WHERE {start_filter}
                UNION ALL
                SELECT child.resource_id,
                       st.depth + 1,
                       st.sort_key || '/' || {child_key},
                       st.path || '/' || child.resource_id
                FROM resources child
                JOIN subtree st ON child.parent_id = st.resource_id
                WHERE st.depth < ?2
                  AND instr('/' || st.path || '/', '/' || child.resource_id || '/') = 0
            )
            SELECT {columns}, st.depth, st.sort_key, st.path
            FROM subtree st
            JOIN resources r ON r.resource_id = st.resource_id
            WHERE st.depth <= ?2
            ORDER BY st.sort_key",
            start_key = sort_key_sql("ordering"),
            child_key = sort_key_sql("child.ordering"),
            start_filter = start_filter,
            columns = RESOURCE_COLUMNS,
        )
    }
}

#[async_trait]
impl NodeSession for TursoSession {
    async fn get(&mut self, id: ResourceId) -> Result<Option<Resource>> {
        let sql = format!("SELECT {} FROM resources r WHERE r.resource_id = ?1", RESOURCE_COLUMNS);
        let mut found = self.fetch_resources(&sql, params![id]).await?;
        Ok(found.pop())
    }

    async fn get_for_update(&mut self, id: ResourceId) -> Result<Option<Resource>> {
        // BEGIN IMMEDIATE already holds the database write lock for this session
        tracing::trace!("Locking resource {} for update", id);
        self.get(id).await
    }

    async fn children_count(&mut self, parent_id: Option<ResourceId>) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM resources WHERE parent_id IS ?1",
                params![parent_id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count children: {}", e)))?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0).context("Failed to get child count")?),
            None => Ok(0),
        }
    }

    async fn children_of(&mut self, parent_id: Option<ResourceId>) -> Result<Vec<Resource>> {
        let sql = format!(
            "SELECT {} FROM resources r WHERE r.parent_id IS ?1 ORDER BY r.ordering",
            RESOURCE_COLUMNS
        );
        self.fetch_resources(&sql, params![parent_id]).await
    }

    async fn insert(&mut self, resource: NewResource, ordering: i64) -> Result<Resource> {
        let payload =
            serde_json::to_string(&resource.kind).context("Failed to serialize resource kind")?;
        let resource_type = resource.kind.type_name().to_string();
        let created_at = Utc::now();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO resources (resource_id, parent_id, ordering, resource_name, resource_type,
                                        payload, owner_user_id, owner_group_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 RETURNING resource_id",
                params![
                    resource.id,
                    resource.parent_id,
                    ordering,
                    resource.resource_name.clone(),
                    resource_type,
                    payload,
                    resource.owner_user_id,
                    resource.owner_group_id,
                    created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert resource: {}", e)))?;

        let id: i64 = match rows.next().await? {
            Some(row) => row.get(0).context("Failed to get inserted resource_id")?,
            None => {
                return Err(DatabaseError::sql_execution("INSERT returned no resource_id").into())
            }
        };

        let mut inserted = resource.into_resource(id, ordering);
        inserted.created_at = created_at;
        Ok(inserted)
    }

    async fn shift(
        &mut self,
        parent_id: Option<ResourceId>,
        range: PositionRange,
        delta: i64,
    ) -> Result<u64> {
        let shifted = self
            .conn
            .execute(
                "UPDATE resources SET ordering = ordering + ?1
                 WHERE parent_id IS ?2 AND ordering >= ?3 AND ordering <= ?4",
                params![delta, parent_id, range.from, range.to.unwrap_or(i64::MAX)],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to shift orderings: {}", e)))?;
        Ok(shifted)
    }

    async fn update_position(
        &mut self,
        id: ResourceId,
        parent_id: Option<ResourceId>,
        ordering: i64,
    ) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE resources SET parent_id = ?1, ordering = ?2 WHERE resource_id = ?3",
                params![parent_id, ordering, id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to update position of {}: {}", id, e))
            })?;

        if updated == 0 {
            return Err(DatabaseError::sql_execution(format!("Resource {} not found", id)).into());
        }
        Ok(())
    }

    async fn delete_ids(&mut self, ids: &[ResourceId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        // Integer ids only, so inlining them is injection-safe
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let deleted = self
            .conn
            .execute(
                &format!("DELETE FROM resources WHERE resource_id IN ({})", id_list),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete resources: {}", e)))?;
        Ok(deleted)
    }

    async fn query_descendants(
        &mut self,
        start_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>> {
        let sql = Self::subtree_sql("resource_id = ?1");
        self.fetch_tree_rows(&sql, params![start_id, depth_bound(max_depth)])
            .await
    }

    async fn query_children_level(
        &mut self,
        parent_id: Option<ResourceId>,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>> {
        let sql = Self::subtree_sql("parent_id IS ?1");
        self.fetch_tree_rows(&sql, params![parent_id, depth_bound(max_depth)])
            .await
    }

    async fn query_ancestors(
        &mut self,
        start_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Resource>> {
        let sql = format!(
            "WITH RECURSIVE chain(resource_id, parent_id, depth, visited, looped) AS (
                SELECT resource_id, parent_id, 1, '/' || resource_id || '/', 0
                FROM resources
                WHERE resource_id = ?1
                UNION ALL
                SELECT up.resource_id, up.parent_id, c.depth + 1,
                       c.visited || up.resource_id || '/',
                       instr(c.visited, '/' || up.resource_id || '/') > 0
                FROM resources up
                JOIN chain c ON up.resource_id = c.parent_id
                WHERE c.depth < ?2
                  AND c.looped = 0
            )
            SELECT {}
            FROM chain c
            JOIN resources r ON r.resource_id = c.resource_id
            WHERE c.depth <= ?2
            ORDER BY c.depth",
            RESOURCE_COLUMNS
        );
        let chain = self
            .fetch_resources(&sql, params![start_id, depth_bound(max_depth)])
            .await?;

        // A looping chain ends with the first resource seen twice
        let mut seen = HashSet::with_capacity(chain.len());
        if let Some(repeated) = chain.iter().find(|resource| !seen.insert(resource.id)) {
            bail!("Parent chain of resource {} loops through {}", start_id, repeated.id);
        }
        Ok(chain)
    }

    async fn commit(self) -> Result<()> {
        self.conn
            .execute("COMMIT", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.conn
            .execute("ROLLBACK", ())
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e))
            })?;
        Ok(())
    }
}
