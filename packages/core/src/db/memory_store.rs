//! MemoryStore - In-process NodeStore backend
//!
//! Keeps all resources in a `BTreeMap` behind a `tokio::sync::Mutex`. A session owns
//! the mutex guard for its whole lifetime, so sessions are fully serialized: the
//! exclusive guard is a superset of every row lock `get_for_update()` asks for.
//!
//! Writes go to a working copy that replaces the shared state on `commit()`;
//! `rollback()` or dropping the session simply discards it.

use crate::db::node_store::{NodeSession, NodeStore, PositionRange};
use crate::models::{NewResource, Resource, ResourceId};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    rows: BTreeMap<ResourceId, Resource>,
    last_id: ResourceId,
}

/// Shared in-memory resource table
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemorySession {
            guard,
            working,
            locked: HashSet::new(),
        })
    }
}

/// Exclusive session over a [`MemoryStore`]
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    /// Resources fetched with `get_for_update()` during this session
    locked: HashSet<ResourceId>,
}

impl MemorySession {
    /// Ids locked for update so far
    pub fn locked_ids(&self) -> &HashSet<ResourceId> {
        &self.locked
    }
}

#[async_trait]
impl NodeSession for MemorySession {
    async fn get(&mut self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.working.rows.get(&id).cloned())
    }

    async fn get_for_update(&mut self, id: ResourceId) -> Result<Option<Resource>> {
        let resource = self.working.rows.get(&id).cloned();
        if resource.is_some() {
            self.locked.insert(id);
        }
        Ok(resource)
    }

    async fn children_count(&mut self, parent_id: Option<ResourceId>) -> Result<i64> {
        let count = self
            .working
            .rows
            .values()
            .filter(|r| r.parent_id == parent_id)
            .count();
        Ok(count as i64)
    }

    async fn children_of(&mut self, parent_id: Option<ResourceId>) -> Result<Vec<Resource>> {
        let mut children: Vec<Resource> = self
            .working
            .rows
            .values()
            .filter(|r| r.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|r| r.ordering);
        Ok(children)
    }

    async fn insert(&mut self, resource: NewResource, ordering: i64) -> Result<Resource> {
        let id = resource.id.unwrap_or(self.working.last_id + 1);
        if self.working.rows.contains_key(&id) {
            bail!("Resource {} already exists", id);
        }
        if let Some(parent_id) = resource.parent_id {
            if !self.working.rows.contains_key(&parent_id) {
                bail!("Parent resource {} does not exist", parent_id);
            }
        }

        let row = resource.into_resource(id, ordering);
        self.working.last_id = self.working.last_id.max(id);
        self.working.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn shift(
        &mut self,
        parent_id: Option<ResourceId>,
        range: PositionRange,
        delta: i64,
    ) -> Result<u64> {
        let mut shifted = 0;
        for row in self.working.rows.values_mut() {
            if row.parent_id == parent_id && range.contains(row.ordering) {
                row.ordering += delta;
                shifted += 1;
            }
        }
        Ok(shifted)
    }

    async fn update_position(
        &mut self,
        id: ResourceId,
        parent_id: Option<ResourceId>,
        ordering: i64,
    ) -> Result<()> {
        match self.working.rows.get_mut(&id) {
            Some(row) => {
                row.parent_id = parent_id;
                row.ordering = ordering;
                Ok(())
            }
            None => bail!("Resource {} not found", id),
        }
    }

    async fn delete_ids(&mut self, ids: &[ResourceId]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            if self.working.rows.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn commit(self) -> Result<()> {
        let MemorySession {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
