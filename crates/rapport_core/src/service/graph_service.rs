//! Graph projection and persisted layout.

use crate::model::graph::{GraphEdge, GraphLayout, GraphNode, GraphView, DEFAULT_LAYOUT_KEY};
use crate::repo::circle_repo::{CircleRepository, SqliteCircleRepository};
use crate::repo::layout_repo::{LayoutRepository, SqliteLayoutRepository};
use crate::repo::person_repo::{PersonRepository, SqlitePersonRepository};
use crate::repo::relation_repo::{RelationRepository, SqliteRelationRepository};
use crate::service::{ServiceError, ServiceResult};
use rusqlite::Connection;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub struct GraphService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> GraphService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// All persons as nodes and one edge per related pair.
    ///
    /// The first stored row of a pair decides the edge direction and type.
    pub fn graph_view(&self) -> ServiceResult<GraphView> {
        let persons = SqlitePersonRepository::new(self.conn).list_persons()?;
        let memberships = SqliteCircleRepository::new(self.conn).list_memberships()?;
        let relations = SqliteRelationRepository::new(self.conn).list_relations()?;

        let mut circle_ids: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for membership in memberships {
            circle_ids
                .entry(membership.person_id)
                .or_default()
                .push(membership.circle_id);
        }

        let nodes = persons
            .into_iter()
            .map(|person| GraphNode {
                circle_ids: circle_ids.remove(&person.id).unwrap_or_default(),
                id: person.id,
                name: person.name,
                avatar: person.avatar,
            })
            .collect();

        let mut seen = HashSet::new();
        let edges = relations
            .into_iter()
            .filter(|relation| seen.insert(relation.pair_key()))
            .map(|relation| GraphEdge {
                source: relation.from_person_id,
                target: relation.to_person_id,
                relation_type: relation.relation_type,
            })
            .collect();

        Ok(GraphView { nodes, edges })
    }

    /// Stored layout, or an empty object when nothing was saved yet.
    pub fn load_layout(&self) -> ServiceResult<GraphLayout> {
        Ok(SqliteLayoutRepository::new(self.conn)
            .load_layout(DEFAULT_LAYOUT_KEY)?
            .unwrap_or_else(GraphLayout::empty))
    }

    pub fn save_layout(&self, layout_json: &Value) -> ServiceResult<GraphLayout> {
        let repo = SqliteLayoutRepository::new(self.conn);
        repo.save_layout(DEFAULT_LAYOUT_KEY, layout_json)?;
        repo.load_layout(DEFAULT_LAYOUT_KEY)?
            .ok_or(ServiceError::InconsistentState(
                "saved layout not found in read-back",
            ))
    }
}
