//! Project directory: named workspaces with a member list.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ProjectError;
use crate::store::{Namespace, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub creator: String,
}

impl Project {
    pub fn has_member(&self, user: &str) -> bool {
        self.members.iter().any(|m| m == user)
    }
}

#[derive(Clone)]
pub struct ProjectDirectory {
    store: Arc<dyn RecordStore>,
    namespace: Namespace,
}

impl ProjectDirectory {
    pub fn new(store: Arc<dyn RecordStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    /// Creates a project. The creator always becomes a member; duplicate
    /// members collapse. Existing names are rejected.
    pub fn create(
        &self,
        name: &str,
        creator: &str,
        members: &[String],
    ) -> Result<Project, ProjectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }

        let partition = self.namespace.projects();
        if self.store.hexists(&partition, name)? {
            return Err(ProjectError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let members: BTreeSet<String> = members
            .iter()
            .cloned()
            .chain(std::iter::once(creator.to_string()))
            .collect();
        let project = Project {
            project_name: name.to_string(),
            members: members.into_iter().collect(),
            creator: creator.to_string(),
        };

        let value = serde_json::to_string(&project).map_err(|e| {
            crate::store::StoreError::Corrupt {
                partition: partition.clone(),
                field: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.store.hset(&partition, name, &value)?;

        log::info!(
            "Project '{}' created by {} with {} member(s)",
            name,
            creator,
            project.members.len()
        );
        Ok(project)
    }

    /// Projects listing `user` as a member, ordered by name.
    pub fn projects_for(&self, user: &str) -> Result<Vec<Project>, ProjectError> {
        let partition = self.namespace.projects();
        let projects = self
            .store
            .hgetall(&partition)?
            .into_iter()
            .filter_map(|(field, raw)| match serde_json::from_str::<Project>(&raw) {
                Ok(project) => Some(project),
                Err(e) => {
                    log::warn!("Skipping corrupt project '{}': {}", field, e);
                    None
                }
            })
            .filter(|project| project.has_member(user))
            .collect();
        Ok(projects)
    }
}
