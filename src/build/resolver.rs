//! Source-path → artifact-path resolution
//!
//! A pure mapping, no loader hooks: the compiled counterpart of a source
//! file lives at the mirrored relative path inside the artifact
//! directory, with the extension rewritten.

use std::path::{Component, Path, PathBuf};

/// Resolves source paths to their pre-built artifacts.
#[derive(Clone, Debug)]
pub struct ArtifactResolver {
    artifact_dir: PathBuf,
    artifact_ext: String,
}

impl ArtifactResolver {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            artifact_ext: "out".to_string(),
        }
    }

    /// Override the artifact extension (default `out`).
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.artifact_ext = ext.into();
        self
    }

    /// Compute the artifact path for a source file. Deterministic: the
    /// same source path always maps to the same artifact path.
    ///
    /// Absolute and parent-relative components are stripped so the result
    /// never escapes the artifact directory.
    pub fn resolve(&self, source: &Path) -> PathBuf {
        let relative: PathBuf = source
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        self.artifact_dir
            .join(relative)
            .with_extension(&self.artifact_ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_relative_path_into_artifact_dir() {
        let resolver = ArtifactResolver::new("build");
        assert_eq!(
            resolver.resolve(Path::new("tests/math.tp")),
            PathBuf::from("build/tests/math.out")
        );
    }

    #[test]
    fn strips_escaping_components() {
        let resolver = ArtifactResolver::new("build");
        assert_eq!(
            resolver.resolve(Path::new("../secrets/x.tp")),
            PathBuf::from("build/secrets/x.out")
        );
        assert_eq!(
            resolver.resolve(Path::new("/abs/path/y.tp")),
            PathBuf::from("build/abs/path/y.out")
        );
    }

    #[test]
    fn custom_extension() {
        let resolver = ArtifactResolver::new("dist").with_extension("js");
        assert_eq!(
            resolver.resolve(Path::new("src/app.test.ts")),
            PathBuf::from("dist/src/app.test.js")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = ArtifactResolver::new("build");
        let a = resolver.resolve(Path::new("t/f.tp"));
        let b = resolver.resolve(Path::new("t/f.tp"));
        assert_eq!(a, b);
    }
}
