//! Session identity.
//!
//! Authentication itself happens elsewhere; this module only records which
//! identity (if any) is signed in, in `~/.config/lessondir/session.toml`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::LessonDirConfig;
use crate::error::{LessonDirError, LessonDirResult};

/// The authenticated principal that owns remote records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        SessionIdentity(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize)]
struct SessionFileData {
    identity: SessionIdentity,
}

/// The on-disk session record.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn open() -> LessonDirResult<Self> {
        Ok(Self::at(LessonDirConfig::config_dir()?.join("session.toml")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        SessionFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The signed-in identity, or `None` when signed out.
    pub fn load(&self) -> LessonDirResult<Option<SessionIdentity>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let data: SessionFileData =
            toml::from_str(&content).map_err(|e| LessonDirError::Config(e.to_string()))?;
        Ok(Some(data.identity))
    }

    pub fn save(&self, identity: &SessionIdentity) -> LessonDirResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&SessionFileData {
            identity: identity.clone(),
        })
        .map_err(|e| LessonDirError::Config(e.to_string()))?;

        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn clear(&self) -> LessonDirResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::at(dir.path().join("session.toml"));

        assert_eq!(file.load().unwrap(), None);

        file.save(&SessionIdentity::new("uid-42")).unwrap();
        assert_eq!(file.load().unwrap(), Some(SessionIdentity::new("uid-42")));

        file.clear().unwrap();
        assert_eq!(file.load().unwrap(), None);
        // Clearing twice is fine
        file.clear().unwrap();
    }
}
