//! Combines `.gitignore` files, `info/exclude`, and a configured global
//! excludes file into one lookup (§6), on top of `vcs-path`'s
//! [`vcs_path::IgnoreStack`]. Precedence low to high: global excludes,
//! `info/exclude`, nearest `.gitignore` — the same order `vcs_path::Layer`
//! pushes expect, since later-pushed layers win ties.

use vcs_path::{IgnoreStack, Layer};

/// A queryable ignore decision for one repo-relative path.
pub trait IgnoreLookup {
    fn is_ignored(&self, repo_relative_path: &str, is_dir: bool) -> bool;
}

/// Ignores nothing; the default for callers (or tests) that don't care
/// about untracked-file filtering.
pub struct NeverIgnore;

impl IgnoreLookup for NeverIgnore {
    fn is_ignored(&self, _path: &str, _is_dir: bool) -> bool {
        false
    }
}

impl IgnoreLookup for IgnoreStack {
    fn is_ignored(&self, repo_relative_path: &str, is_dir: bool) -> bool {
        IgnoreStack::is_ignored(self, repo_relative_path, is_dir)
    }
}

/// Builds the combined ignore stack for one worktree: `global_excludes`
/// (a user-configured file outside the repo), `info_exclude`
/// (`$GIT_DIR/info/exclude`), then every `.gitignore` layer from root to
/// leaf (`gitignore_layers`, each a `(directory, file_contents)` pair,
/// nearest-last).
pub fn combine<'a>(
    global_excludes: Option<&str>,
    info_exclude: Option<&str>,
    gitignore_layers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> IgnoreStack {
    let mut stack = IgnoreStack::new();
    if let Some(content) = global_excludes {
        stack.push_layer(Layer::from_lines("", content));
    }
    if let Some(content) = info_exclude {
        stack.push_layer(Layer::from_lines("", content));
    }
    for (base, content) in gitignore_layers {
        stack.push_layer(Layer::from_lines(base, content));
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_excludes_precede_info_exclude_which_precedes_gitignore() {
        // global ignores *.log, info/exclude re-includes keep.log, the
        // nearest .gitignore ignores it again: nearest wins.
        let stack = combine(Some("*.log\n"), Some("!keep.log\n"), [("", "keep.log\n")]);
        assert!(stack.is_ignored("keep.log", false));
    }

    #[test]
    fn info_exclude_can_override_the_global_file() {
        let stack = combine(Some("*.log\n"), Some("!keep.log\n"), std::iter::empty());
        assert!(!stack.is_ignored("keep.log", false));
    }

    #[test]
    fn nested_gitignore_layer_is_scoped_to_its_directory() {
        let stack = combine(None, None, [("", "*.tmp\n"), ("sub", "!keep.tmp\n")]);
        assert!(stack.is_ignored("other.tmp", false));
        assert!(stack.is_ignored("sub/other.tmp", false));
        assert!(!stack.is_ignored("sub/keep.tmp", false));
    }
}
