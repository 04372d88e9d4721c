//! Circle use-case service.

use crate::model::circle::{Circle, CircleDraft, CircleId, CircleWithMembers, Membership};
use crate::model::person::PersonId;
use crate::repo::circle_repo::{CircleRepository, SqliteCircleRepository};
use crate::repo::person_repo::{PersonRepository, SqlitePersonRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::Connection;

pub struct CircleService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CircleService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn list_circles(&self) -> ServiceResult<Vec<Circle>> {
        Ok(SqliteCircleRepository::new(self.conn).list_circles()?)
    }

    pub fn create_circle(&self, draft: &CircleDraft) -> ServiceResult<Circle> {
        let repo = SqliteCircleRepository::new(self.conn);
        let id = repo.create_circle(draft)?;
        info!("event=circle_create module=service status=ok circle_id={id}");
        repo.get_circle(id)?
            .ok_or(ServiceError::InconsistentState(
                "created circle not found in read-back",
            ))
    }

    pub fn delete_circle(&self, id: CircleId) -> ServiceResult<()> {
        SqliteCircleRepository::new(self.conn).delete_circle(id)?;
        info!("event=circle_delete module=service status=ok circle_id={id}");
        Ok(())
    }

    /// Every circle with its members, both in storage order.
    pub fn circles_with_members(&self) -> ServiceResult<Vec<CircleWithMembers>> {
        let repo = SqliteCircleRepository::new(self.conn);
        repo.list_circles()?
            .into_iter()
            .map(|circle| {
                Ok(CircleWithMembers {
                    members: repo.list_members(circle.id)?,
                    circle,
                })
            })
            .collect()
    }

    pub fn add_member(&self, circle_id: CircleId, person_id: PersonId) -> ServiceResult<Membership> {
        let repo = SqliteCircleRepository::new(self.conn);
        if repo.get_circle(circle_id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: "circle",
                id: circle_id,
            });
        }
        if SqlitePersonRepository::new(self.conn)
            .get_person(person_id)?
            .is_none()
        {
            return Err(ServiceError::NotFound {
                entity: "person",
                id: person_id,
            });
        }
        let membership = repo.add_member(circle_id, person_id)?;
        info!(
            "event=circle_member_add module=service status=ok circle_id={} person_id={}",
            circle_id, person_id
        );
        Ok(membership)
    }

    pub fn remove_member(&self, circle_id: CircleId, person_id: PersonId) -> ServiceResult<()> {
        SqliteCircleRepository::new(self.conn).remove_member(circle_id, person_id)?;
        Ok(())
    }
}
