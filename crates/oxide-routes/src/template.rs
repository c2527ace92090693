//! Template resolution.

use std::fs::File;
use std::path::{Path, PathBuf};

/// Finds the template file a response declaration refers to.
pub trait TemplateLocator: Send + Sync {
    /// Returns `true` if `reference` names a template that can be read
    /// directly, without a lookup.
    fn is_readable(&self, reference: &str) -> bool;

    /// Looks a template up by its conventional name.
    fn locate(&self, name: &str) -> Option<PathBuf>;

    /// Resolves a reference: directly readable references are used as-is,
    /// anything else goes through [`TemplateLocator::locate`].
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        if self.is_readable(reference) {
            Some(PathBuf::from(reference))
        } else {
            self.locate(reference)
        }
    }
}

/// Filesystem locator searching theme directories in order.
///
/// The first directory is typically the child theme, the second its parent.
#[derive(Debug, Clone, Default)]
pub struct ThemeLocator {
    dirs: Vec<PathBuf>,
}

impl ThemeLocator {
    /// Creates a locator with no search directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a search directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Returns the search directories.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

fn readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

impl TemplateLocator for ThemeLocator {
    fn is_readable(&self, reference: &str) -> bool {
        !reference.is_empty() && readable_file(Path::new(reference))
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim_start_matches('/');
        if name.is_empty() {
            return None;
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| readable_file(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_by_name_in_order() {
        let child = tempfile::tempdir().unwrap();
        let parent = tempfile::tempdir().unwrap();
        std::fs::write(parent.path().join("single.php"), "parent").unwrap();
        std::fs::write(parent.path().join("page.php"), "parent").unwrap();
        std::fs::write(child.path().join("page.php"), "child").unwrap();

        let locator = ThemeLocator::new().dir(child.path()).dir(parent.path());
        assert_eq!(
            locator.resolve("single.php"),
            Some(parent.path().join("single.php"))
        );
        assert_eq!(
            locator.resolve("page.php"),
            Some(child.path().join("page.php"))
        );
        assert_eq!(locator.resolve("missing.php"), None);
    }

    #[test]
    fn test_readable_path_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.php");
        std::fs::write(&file, "").unwrap();

        let locator = ThemeLocator::new();
        let reference = file.to_string_lossy().into_owned();
        assert!(locator.is_readable(&reference));
        assert_eq!(locator.resolve(&reference), Some(file));
    }

    #[test]
    fn test_directories_are_not_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        let locator = ThemeLocator::new().dir(dir.path());
        assert_eq!(locator.resolve("partials"), None);
        assert_eq!(locator.resolve(""), None);
    }
}
