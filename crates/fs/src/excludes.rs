use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::warn;
use pronto_runtime::DEFAULT_PROJECT_IGNORE_PATTERNS;

/// Gitignore-style matcher deciding which subtrees the walker skips.
pub struct IgnoreEngine {
    matcher: Gitignore,
}

impl Default for IgnoreEngine {
    fn default() -> Self {
        // Empty matcher rooted at the current directory; callers opt into the
        // default noise patterns via `with_defaults`.
        let matcher = GitignoreBuilder::new(Path::new("."))
            .build()
            .expect("build empty ignore matcher");
        IgnoreEngine { matcher }
    }
}

impl IgnoreEngine {
    /// Matcher seeded with the default project ignore patterns, rooted at
    /// `root`.
    pub fn with_defaults(root: &Path) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_PROJECT_IGNORE_PATTERNS {
            if let Err(e) = builder.add_line(None, pattern) {
                warn!("[excludes] bad default pattern {pattern:?}: {e}");
            }
        }

        match builder.build() {
            Ok(matcher) => IgnoreEngine { matcher },
            Err(e) => {
                warn!("[excludes] falling back to empty matcher: {e}");
                IgnoreEngine::default()
            }
        }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
#[path = "excludes_tests.rs"]
mod tests;
