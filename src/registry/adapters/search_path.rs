//! Filesystem manifest locators.

use crate::registry::ports::{
    MANIFEST_RESOURCE, ManifestLocator, ManifestLocatorError, ManifestResource,
};
use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use std::io::ErrorKind;
use tracing::debug;

/// Reads `META-INF/stream.binders` from each directory of a search path.
///
/// Missing directories and directories without a manifest are skipped.
#[derive(Debug, Clone, Default)]
pub struct SearchPathManifestLocator {
    roots: Vec<Utf8PathBuf>,
}

impl SearchPathManifestLocator {
    /// Creates a locator over `roots`, searched in order.
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl ManifestLocator for SearchPathManifestLocator {
    fn locate(&self) -> Result<Vec<ManifestResource>, ManifestLocatorError> {
        let mut resources = Vec::new();
        for root in &self.roots {
            let origin = root.join(MANIFEST_RESOURCE).to_string();
            let dir = match Dir::open_ambient_dir(root, ambient_authority()) {
                Ok(dir) => dir,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(%root, "search path entry does not exist");
                    continue;
                }
                Err(err) => return Err(ManifestLocatorError::unreadable(root.as_str(), err)),
            };
            match dir.read_to_string(MANIFEST_RESOURCE) {
                Ok(content) => resources.push(ManifestResource::new(origin, content)),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(ManifestLocatorError::unreadable(origin, err)),
            }
        }
        debug!(found = resources.len(), "binder manifests located");
        Ok(resources)
    }
}

/// Serves manifest resources supplied at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticManifestLocator {
    resources: Vec<ManifestResource>,
}

impl StaticManifestLocator {
    /// Creates a locator returning `resources`.
    #[must_use]
    pub const fn new(resources: Vec<ManifestResource>) -> Self {
        Self { resources }
    }

    /// Returns this locator with one more resource.
    #[must_use]
    pub fn with_resource(mut self, origin: &str, content: &str) -> Self {
        self.resources.push(ManifestResource::new(origin, content));
        self
    }
}

impl ManifestLocator for StaticManifestLocator {
    fn locate(&self) -> Result<Vec<ManifestResource>, ManifestLocatorError> {
        Ok(self.resources.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    fn write_manifest(root: &Utf8Path, content: &str) {
        let dir = Dir::open_ambient_dir(root, ambient_authority()).expect("open temp dir");
        dir.create_dir_all("META-INF").expect("create META-INF");
        dir.write(MANIFEST_RESOURCE, content).expect("write manifest");
    }

    #[test]
    fn reads_manifests_in_search_order_and_skips_missing_entries() {
        let first = tempfile::tempdir().expect("temp dir");
        let empty = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        let first_root = Utf8Path::from_path(first.path()).expect("utf-8 path");
        let empty_root = Utf8Path::from_path(empty.path()).expect("utf-8 path");
        let second_root = Utf8Path::from_path(second.path()).expect("utf-8 path");
        write_manifest(first_root, "memory=in-memory\n");
        write_manifest(second_root, "kafka=kafka-binder\n");

        let locator = SearchPathManifestLocator::new([
            first_root.to_owned(),
            empty_root.to_owned(),
            first_root.join("does-not-exist"),
            second_root.to_owned(),
        ]);
        let resources = locator.locate().expect("manifests located");

        let contents: Vec<&str> = resources
            .iter()
            .map(|resource| resource.content.as_str())
            .collect();
        assert_eq!(contents, ["memory=in-memory\n", "kafka=kafka-binder\n"]);
        let origin = &resources.first().expect("first manifest").origin;
        assert!(origin.ends_with(MANIFEST_RESOURCE));
    }
}
