//! Build-artifact collaborators
//!
//! The orchestrator does not compile anything itself; it talks to an
//! external compiler service and only needs its completion signal plus
//! the list of emitted artifacts. This module holds that interface, a
//! default implementation for pre-built artifact directories, and the
//! pure source-path → artifact-path resolver.

mod resolver;

pub use resolver::ArtifactResolver;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::utils::Timer;

/// Completion signal from one build pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub duration_ms: u64,
    pub artifacts: Vec<PathBuf>,
}

impl BuildStats {
    pub fn num_artifacts(&self) -> usize {
        self.artifacts.len()
    }
}

/// External source-compilation subsystem.
///
/// `build` is invoked once before dispatch; a failure aborts the run.
/// `next_rebuild` yields watch-mode recompilation outcomes and returns
/// `None` when the service does not support watching.
#[allow(async_fn_in_trait)]
pub trait CompilerService: Send {
    async fn build(&mut self) -> Result<BuildStats>;

    async fn next_rebuild(&mut self) -> Option<Result<BuildStats>> {
        None
    }
}

/// Compiler service for the common case where artifacts already exist on
/// disk: "building" just inventories the artifact directory.
#[derive(Clone, Debug)]
pub struct PrebuiltArtifacts {
    dir: PathBuf,
}

impl PrebuiltArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn collect(&self, dir: &Path, artifacts: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect(&path, artifacts)?;
            } else {
                artifacts.push(path);
            }
        }
        Ok(())
    }
}

impl CompilerService for PrebuiltArtifacts {
    async fn build(&mut self) -> Result<BuildStats> {
        let timer = Timer::start("artifact inventory");
        let mut artifacts = Vec::new();

        if self.dir.is_dir() {
            self.collect(&self.dir.clone(), &mut artifacts)?;
            artifacts.sort();
            debug!(
                dir = %self.dir.display(),
                count = artifacts.len(),
                "inventoried pre-built artifacts"
            );
        } else {
            warn!(dir = %self.dir.display(), "artifact directory does not exist");
        }

        Ok(BuildStats {
            duration_ms: timer.elapsed_ms(),
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inventories_artifact_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.out"), b"").unwrap();
        std::fs::write(dir.path().join("sub/b.out"), b"").unwrap();

        let mut compiler = PrebuiltArtifacts::new(dir.path());
        let stats = compiler.build().await.unwrap();

        assert_eq!(stats.num_artifacts(), 2);
        assert!(stats.artifacts.iter().all(|p| p.starts_with(dir.path())));
    }

    #[tokio::test]
    async fn missing_directory_yields_empty_inventory() {
        let mut compiler = PrebuiltArtifacts::new("does/not/exist");
        let stats = compiler.build().await.unwrap();
        assert!(stats.artifacts.is_empty());
    }

    #[tokio::test]
    async fn prebuilt_artifacts_do_not_watch() {
        let mut compiler = PrebuiltArtifacts::new("build");
        assert!(compiler.next_rebuild().await.is_none());
    }
}
