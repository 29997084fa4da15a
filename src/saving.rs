use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;

/// Persistence for the ordered project list
///
/// `read` never fails: an unreadable backing store degrades to an empty list.
/// `write` replaces the full contents.
pub trait ProjectStore: Send + Sync {
    fn read(&self) -> Vec<String>;
    fn write(&self, projects: &[String]) -> Result<(), StoreError>;
}

/// Project list stored as one name per line in a plain text file
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    path: PathBuf,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProjectStore for FlatFileStore {
    fn read(&self) -> Vec<String> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::error!("Error reading projects file {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let mut projects = Vec::new();
        for line in BufReader::new(file).lines() {
            match line {
                Ok(line) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        projects.push(trimmed.to_string());
                    }
                }
                Err(e) => {
                    log::error!("Error reading projects file {}: {}", self.path.display(), e);
                    return Vec::new();
                }
            }
        }

        projects
    }

    /// Refuses any entry containing a line terminator, since it would read
    /// back as several entries; the file is left untouched in that case.
    fn write(&self, projects: &[String]) -> Result<(), StoreError> {
        if let Some(entry) = projects.iter().find(|p| p.contains(['\n', '\r'])) {
            log::error!(
                "Refusing to write {:?} to {}: entry spans lines",
                entry,
                self.path.display()
            );
            return Err(StoreError::MultiLineEntry(entry.clone()));
        }

        let write_all = || -> std::io::Result<()> {
            let file = File::create(&self.path)?;
            let mut writer = BufWriter::new(file);
            for project in projects {
                writeln!(writer, "{}", project)?;
            }
            writer.flush()
        };

        write_all().map_err(|source| {
            log::error!(
                "Error writing projects file {}: {}",
                self.path.display(),
                source
            );
            StoreError::Write {
                path: self.path.display().to_string(),
                source,
            }
        })
    }
}

/// Project list kept in memory, optionally refusing every write
///
/// Used where no disk is wanted and to exercise the rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new(projects: Vec<String>) -> Self {
        Self {
            projects: Mutex::new(projects),
            fail_writes: false,
        }
    }

    /// A store whose every `write` fails and leaves the contents untouched
    pub fn failing(projects: Vec<String>) -> Self {
        Self {
            projects: Mutex::new(projects),
            fail_writes: true,
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.projects
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ProjectStore for MemoryStore {
    fn read(&self) -> Vec<String> {
        self.snapshot()
    }

    fn write(&self, projects: &[String]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut stored = self
            .projects
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        *stored = projects.to_vec();
        Ok(())
    }
}
