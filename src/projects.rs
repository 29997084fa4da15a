//! Project list operations with write-through and rollback.
//!
//! A [`ProjectList`] is a request-scoped copy of what the store holds. Every
//! mutation is applied to the copy, written through to the store, and undone
//! on the copy if the write fails, so the copy always matches the last
//! successful write.

use crate::error::ProjectError;
use crate::saving::ProjectStore;

/// Most projects the list will hold
pub const MAX_PROJECTS: usize = 3;

/// Longest accepted project name, in characters
pub const MAX_NAME_LEN: usize = 100;

/// A mutation requested by the projects form, with fields as submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectAction {
    Add { name: String },
    Delete { index: String },
    Update { index: String, name: String },
}

pub struct ProjectList<'a, S: ProjectStore + ?Sized> {
    store: &'a S,
    projects: Vec<String>,
}

impl<'a, S: ProjectStore + ?Sized> ProjectList<'a, S> {
    /// Read the current list from `store`
    pub fn load(store: &'a S) -> Self {
        Self {
            store,
            projects: store.read(),
        }
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn into_projects(self) -> Vec<String> {
        self.projects
    }

    /// Apply a form action, parsing its raw index fields
    ///
    /// Returns the confirmation message on success.
    pub fn apply(&mut self, action: &ProjectAction) -> Result<String, ProjectError> {
        match action {
            ProjectAction::Add { name } => self.add(name),
            ProjectAction::Delete { index } => {
                let index = parse_index(index)
                    .ok_or_else(|| invalid("Invalid delete request."))?;
                self.delete(index)
            }
            ProjectAction::Update { index, name } => {
                let index = parse_index(index)
                    .ok_or_else(|| invalid("Invalid update request."))?;
                self.update(index, name)
            }
        }
    }

    /// Append a project
    ///
    /// # Errors
    /// * `Validation` if the trimmed name is empty or too long, or the list is full
    /// * `Persistence` if the store write fails; the list is left unchanged
    pub fn add(&mut self, name: &str) -> Result<String, ProjectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("Project name cannot be empty."));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid("Project name must be 100 characters or less."));
        }
        if self.projects.len() >= MAX_PROJECTS {
            return Err(invalid("Only three projects accepted."));
        }

        self.projects.push(name.to_string());
        if self.store.write(&self.projects).is_err() {
            self.projects.pop();
            return Err(ProjectError::Persistence("Failed to save project.".to_string()));
        }

        log::info!("added project {:?}", name);
        Ok(format!("Project '{}' added successfully!", name))
    }

    /// Remove the project at `index`; later entries shift down by one
    ///
    /// # Errors
    /// * `Validation` if `index` is out of bounds
    /// * `Persistence` if the store write fails; the entry is reinserted
    pub fn delete(&mut self, index: usize) -> Result<String, ProjectError> {
        if index >= self.projects.len() {
            return Err(invalid("Invalid delete request."));
        }

        let deleted = self.projects.remove(index);
        if self.store.write(&self.projects).is_err() {
            self.projects.insert(index, deleted);
            return Err(ProjectError::Persistence(
                "Failed to delete from file.".to_string(),
            ));
        }

        log::info!("deleted project {} ({:?})", index, deleted);
        Ok(format!("Project '{}' deleted.", deleted))
    }

    /// Rename the project at `index`
    ///
    /// # Errors
    /// * `Validation` if the trimmed name is empty or too long, or `index` is out of bounds
    /// * `Persistence` if the store write fails; the old name is restored
    pub fn update(&mut self, index: usize, new_name: &str) -> Result<String, ProjectError> {
        let new_name = new_name.trim();
        if new_name.is_empty()
            || new_name.chars().count() > MAX_NAME_LEN
            || index >= self.projects.len()
        {
            return Err(invalid("Invalid update."));
        }

        let old = std::mem::replace(&mut self.projects[index], new_name.to_string());
        if self.store.write(&self.projects).is_err() {
            self.projects[index] = old;
            return Err(ProjectError::Persistence("Failed to save update.".to_string()));
        }

        log::info!("renamed project {} from {:?} to {:?}", index, old, new_name);
        Ok(format!("Project updated: '{}' → '{}'", old, new_name))
    }
}

fn invalid(message: &str) -> ProjectError {
    ProjectError::Validation(message.to_string())
}

/// Parse a submitted index; negative or non-numeric input yields `None`
fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}
