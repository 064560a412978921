//! Composite primary keys for many-to-many association rows.
//!
//! A project membership is identified by `(project_id, user_id)` and a task
//! assignment by `(task_id, user_id)`; neither carries a surrogate id.
//!
//! Equality and hashing are structural over both components, in order, so
//! `(1, 2)` and `(2, 1)` are distinct keys. Each shape is its own type, which
//! makes comparing a membership key with an assignment key a type error.
//! Fields are private: a key never changes after construction, so it is safe
//! to use in hashed collections and to share between threads.

use crate::{EntityId, EntityType, ProjectId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

/// Common view over the composite key shapes.
pub trait AssociationKey:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Association entity this key identifies.
    const ENTITY_TYPE: EntityType;

    /// Build a key from its owner-side and member-side ids.
    fn from_parts(owner_id: EntityId, member_id: EntityId) -> Self;

    /// Owner-side reference (project or task).
    fn owner_id(&self) -> EntityId;

    /// Member-side reference (always a user).
    fn member_id(&self) -> EntityId;
}

/// Error when parsing a key from its `owner:member` text form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {entity_type} key '{input}': expected '<id>:<id>'")]
pub struct KeyParseError {
    pub entity_type: EntityType,
    pub input: String,
}

macro_rules! association_key {
    (
        $(#[$meta:meta])*
        $name:ident, $entity:expr, $owner:ident: $owner_ty:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $name {
            $owner: $owner_ty,
            user_id: UserId,
        }

        impl $name {
            pub fn new($owner: $owner_ty, user_id: UserId) -> Self {
                Self { $owner, user_id }
            }

            pub fn $owner(&self) -> $owner_ty {
                self.$owner
            }

            pub fn user_id(&self) -> UserId {
                self.user_id
            }
        }

        impl AssociationKey for $name {
            const ENTITY_TYPE: EntityType = $entity;

            fn from_parts(owner_id: EntityId, member_id: EntityId) -> Self {
                Self::new(owner_id, member_id)
            }

            fn owner_id(&self) -> EntityId {
                self.$owner
            }

            fn member_id(&self) -> EntityId {
                self.user_id
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.$owner, self.user_id)
            }
        }

        impl FromStr for $name {
            type Err = KeyParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_pair(s)
                    .map(|(owner, member)| Self::new(owner, member))
                    .ok_or_else(|| KeyParseError {
                        entity_type: $entity,
                        input: s.to_string(),
                    })
            }
        }
    };
}

association_key!(
    /// Identity of a project membership row.
    ProjectMemberId, EntityType::ProjectMember, project_id: ProjectId
);

association_key!(
    /// Identity of a task assignment row.
    TaskAssigneeId, EntityType::TaskAssignee, task_id: TaskId
);

fn parse_pair(s: &str) -> Option<(EntityId, EntityId)> {
    let (owner, member) = s.split_once(':')?;
    Some((owner.trim().parse().ok()?, member.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::Hasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_new_and_getters() {
        let key = ProjectMemberId::new(5, 9);
        assert_eq!(key.project_id(), 5);
        assert_eq!(key.user_id(), 9);
        assert_eq!(key.owner_id(), 5);
        assert_eq!(key.member_id(), 9);

        let key = TaskAssigneeId::new(12, 3);
        assert_eq!(key.task_id(), 12);
        assert_eq!(key.user_id(), 3);
    }

    #[test]
    fn test_component_order_matters() {
        assert_ne!(ProjectMemberId::new(1, 2), ProjectMemberId::new(2, 1));
        assert_ne!(TaskAssigneeId::new(1, 2), TaskAssigneeId::new(2, 1));
    }

    #[test]
    fn test_independent_keys_deduplicate_in_set() {
        let mut set = HashSet::new();
        set.insert(ProjectMemberId::new(5, 9));
        set.insert(ProjectMemberId::new(5, 9));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_equal_keys_hash_equal() {
        assert_eq!(
            hash_of(&TaskAssigneeId::new(40, 2)),
            hash_of(&TaskAssigneeId::new(40, 2))
        );
    }

    #[test]
    fn test_shared_owner_keys_do_not_collide() {
        // Many rows share one project; the user id must still spread the hash.
        let hashes: HashSet<u64> = (0..64)
            .map(|user_id| hash_of(&ProjectMemberId::new(7, user_id)))
            .collect();
        assert_eq!(hashes.len(), 64);
    }

    #[test]
    fn test_display_and_parse() {
        let key = ProjectMemberId::new(5, 9);
        assert_eq!(key.to_string(), "5:9");
        assert_eq!("5:9".parse::<ProjectMemberId>(), Ok(key));
        assert_eq!(" 12 : 3 ".parse::<TaskAssigneeId>(), Ok(TaskAssigneeId::new(12, 3)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "5", "5:", ":9", "a:b", "5:9:1"] {
            let err = input.parse::<ProjectMemberId>().unwrap_err();
            assert_eq!(err.entity_type, EntityType::ProjectMember);
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_from_parts_matches_new() {
        assert_eq!(
            <TaskAssigneeId as AssociationKey>::from_parts(4, 8),
            TaskAssigneeId::new(4, 8)
        );
        assert_eq!(ProjectMemberId::ENTITY_TYPE, EntityType::ProjectMember);
        assert_eq!(TaskAssigneeId::ENTITY_TYPE, EntityType::TaskAssignee);
    }

    #[test]
    fn test_serde_field_names() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(ProjectMemberId::new(5, 9))?;
        assert_eq!(json, serde_json::json!({"project_id": 5, "user_id": 9}));
        let json = serde_json::to_value(TaskAssigneeId::new(1, 2))?;
        assert_eq!(json, serde_json::json!({"task_id": 1, "user_id": 2}));
        Ok(())
    }
}
