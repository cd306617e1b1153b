//! `.gitignore` / `info/exclude` pattern matching, per spec §6: `#` comments,
//! `!` negation, a leading `/` anchors to the file's directory, a trailing
//! `/` matches directories only, `**` matches zero or more path components.
//! Matching is last-match-wins within one file; files nearer the queried
//! path override farther ones; a negation only takes effect if the parent
//! directory was not already excluded (matching `git check-ignore`'s
//! documented behavior: once a directory is excluded you cannot re-include
//! files beneath it).

/// A single parsed ignore-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub negated: bool,
    pub dir_only: bool,
    pub anchored: bool,
    /// The glob, split on `/`, with comments/negation/anchoring already stripped.
    segments: Vec<String>,
}

impl Pattern {
    /// Parses one line of a `.gitignore`-style file. Returns `None` for
    /// blank lines and `#` comments (a literal leading `#` or `!` is
    /// escaped with a backslash, as in real gitignore syntax).
    pub fn parse(line: &str) -> Option<Pattern> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut rest = line;
        let negated = if let Some(stripped) = rest.strip_prefix('!') {
            rest = stripped;
            true
        } else {
            false
        };
        let rest = rest
            .strip_prefix("\\!")
            .or_else(|| rest.strip_prefix("\\#"))
            .unwrap_or(rest);
        let dir_only = rest.ends_with('/') && !rest.ends_with("\\/");
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return None;
        }
        let anchored = rest.starts_with('/') || rest.contains('/');
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let segments = rest.split('/').map(ToOwned::to_owned).collect();
        Some(Pattern {
            negated,
            dir_only,
            anchored,
            segments,
        })
    }

    /// Tests `relative_path` (slash-separated, relative to the directory
    /// this pattern's file lives in) against this pattern.
    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let path_segments: Vec<&str> = relative_path.split('/').collect();
        if self.anchored {
            glob_match(&self.segments, &path_segments)
        } else {
            // unanchored: the pattern may match starting at any path component
            (0..path_segments.len()).any(|start| glob_match(&self.segments, &path_segments[start..]))
        }
    }
}

/// Matches a `**`-aware glob (already split on `/`) against path components.
fn glob_match(pattern: &[String], path: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(p), _) if p == "**" => {
            if pattern.len() == 1 {
                return true; // trailing ** matches everything below
            }
            (0..=path.len()).any(|skip| glob_match(&pattern[1..], &path[skip..]))
        }
        (Some(_), None) => false,
        (Some(p), Some(component)) => segment_match(p, component) && glob_match(&pattern[1..], &path[1..]),
    }
}

/// Single-component glob: `*` (any run), `?` (one char), `[...]` (class).
fn segment_match(glob: &str, text: &str) -> bool {
    fn inner(g: &[u8], t: &[u8]) -> bool {
        match (g.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                // try matching zero chars, then one, etc.
                (0..=t.len()).any(|n| inner(&g[1..], &t[n..]))
            }
            (Some(b'?'), Some(_)) => inner(&g[1..], &t[1..]),
            (Some(b'['), _) => match find_class_end(g) {
                Some((class_end, negate, set)) => {
                    if let Some(&c) = t.first() {
                        if set.contains(&c) != negate {
                            inner(&g[class_end..], &t[1..])
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                None => g.first() == t.first() && inner(&g[1..], &t[1..]),
            },
            (Some(a), Some(b)) if a == b => inner(&g[1..], &t[1..]),
            _ => false,
        }
    }
    fn find_class_end(g: &[u8]) -> Option<(usize, bool, Vec<u8>)> {
        let mut i = 1;
        let negate = g.get(1) == Some(&b'!') || g.get(1) == Some(&b'^');
        if negate {
            i += 1;
        }
        let start = i;
        while i < g.len() && g[i] != b']' {
            i += 1;
        }
        if i >= g.len() {
            return None;
        }
        Some((i + 1, negate, g[start..i].to_vec()))
    }
    inner(glob.as_bytes(), text.as_bytes())
}

/// One ignore-file's patterns, scoped to the directory (relative to the
/// worktree root) that contains it.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub base: String,
    pub patterns: Vec<Pattern>,
}

impl Layer {
    pub fn from_lines(base: impl Into<String>, lines: &str) -> Self {
        Layer {
            base: base.into(),
            patterns: lines.lines().filter_map(Pattern::parse).collect(),
        }
    }
}

/// A stack of ignore layers ordered from lowest precedence (global excludes
/// file) to highest (the nearest `.gitignore`), per spec §6.
#[derive(Debug, Default, Clone)]
pub struct IgnoreStack {
    layers: Vec<Layer>,
}

impl IgnoreStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Evaluates whether `repo_relative_path` is ignored, walking from the
    /// root down so that an excluded ancestor directory makes the whole
    /// subtree ignored regardless of deeper negations.
    pub fn is_ignored(&self, repo_relative_path: &str, is_dir: bool) -> bool {
        let components: Vec<&str> = repo_relative_path.split('/').collect();
        let mut ignored = false;
        let mut prefix = String::new();
        for (i, component) in components.iter().enumerate() {
            if i > 0 {
                prefix.push('/');
            }
            prefix.push_str(component);
            let component_is_dir = is_dir || i + 1 < components.len();
            if ignored {
                continue; // parent already excluded: cannot be re-included beneath it
            }
            ignored = self.matches_single_level(&prefix, component_is_dir);
        }
        ignored
    }

    fn matches_single_level(&self, repo_relative_path: &str, is_dir: bool) -> bool {
        let mut ignored = false;
        for layer in &self.layers {
            let relative = match strip_base(repo_relative_path, &layer.base) {
                Some(r) => r,
                None => continue,
            };
            for pattern in &layer.patterns {
                if pattern.matches(relative, is_dir) {
                    ignored = !pattern.negated;
                }
            }
        }
        ignored
    }
}

fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        Some(path)
    } else {
        path.strip_prefix(base).and_then(|r| r.strip_prefix('/')).or_else(|| {
            if path == base {
                Some("")
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_matches_directories_only() {
        let p = Pattern::parse("build/").unwrap();
        assert!(p.dir_only);
        assert!(p.matches("build", true));
        assert!(!p.matches("build", false));
    }

    #[test]
    fn leading_slash_anchors_to_file_directory() {
        let p = Pattern::parse("/target").unwrap();
        assert!(p.anchored);
        assert!(p.matches("target", true));
        assert!(!p.matches("sub/target", true));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let p = Pattern::parse("**/foo.rs").unwrap();
        assert!(p.matches("foo.rs", false));
        assert!(p.matches("a/b/foo.rs", false));
    }

    #[test]
    fn negation_reincludes_within_same_level() {
        let mut stack = IgnoreStack::new();
        stack.push_layer(Layer::from_lines("", "*.log\n!keep.log\n"));
        assert!(stack.is_ignored("a.log", false));
        assert!(!stack.is_ignored("keep.log", false));
    }

    #[test]
    fn negation_cannot_escape_an_excluded_directory() {
        let mut stack = IgnoreStack::new();
        stack.push_layer(Layer::from_lines("", "build/\n!build/keep.txt\n"));
        assert!(stack.is_ignored("build", true));
        assert!(stack.is_ignored("build/keep.txt", false));
    }

    #[test]
    fn nearer_file_overrides_farther_one() {
        let mut stack = IgnoreStack::new();
        stack.push_layer(Layer::from_lines("", "*.tmp\n"));
        stack.push_layer(Layer::from_lines("sub", "!keep.tmp\n"));
        assert!(stack.is_ignored("sub/other.tmp", false));
        assert!(!stack.is_ignored("sub/keep.tmp", false));
    }
}
