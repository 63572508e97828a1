//! Source globs: brace expansion, base directories and file discovery.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::StageError;

const WILDCARDS: &[char] = &['*', '?', '[', '{'];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled source or watch glob.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    raw: String,
    patterns: Vec<Pattern>,
    base: PathBuf,
    literal: bool,
}

impl SourceGlob {
    pub fn new(raw: &str) -> Result<Self, StageError> {
        let patterns = expand_braces(raw)
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| StageError::Glob(format!("{}: {}", raw, e))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            patterns,
            base: glob_base(raw),
            literal: !raw.contains(WILDCARDS),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory that output paths are made relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// A glob without wildcards names exactly one file.
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(path, MATCH_OPTIONS))
    }

    /// Every file matching the glob, sorted by path.
    ///
    /// A literal glob naming a missing file is an error; a wildcard glob
    /// that matches nothing is not.
    pub fn files(&self) -> Result<Vec<PathBuf>, StageError> {
        if self.literal {
            let path = PathBuf::from(&self.raw);
            return if path.is_file() {
                Ok(vec![path])
            } else {
                Err(StageError::MissingSource(path))
            };
        }

        if !self.base.is_dir() {
            tracing::debug!("Glob base {} does not exist", self.base.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.base).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.base.clone());
                StageError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Expand `{a,b}` alternations into separate patterns.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{}{}{}", prefix, &pattern[w[0] + 1..w[1]], suffix)))
        .collect()
}

/// Leading path components without wildcards; for a literal path, its parent.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let end = parts
        .iter()
        .position(|part| part.contains(WILDCARDS))
        .unwrap_or(parts.len().saturating_sub(1));

    let base = parts[..end].join("/");
    if base.is_empty() {
        if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::from(".")
        }
    } else {
        PathBuf::from(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_alternations() {
        assert_eq!(
            expand_braces("img/**/*.{jpg,jpeg,png}"),
            vec!["img/**/*.jpg", "img/**/*.jpeg", "img/**/*.png"]
        );
        assert_eq!(expand_braces("a/{b,c{d,e}}"), vec!["a/b", "a/cd", "a/ce"]);
        assert_eq!(expand_braces("plain/*.js"), vec!["plain/*.js"]);
    }

    #[test]
    fn finds_glob_bases() {
        assert_eq!(glob_base("src/**/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/assets/js/main.js"), PathBuf::from("src/assets/js"));
        assert_eq!(
            glob_base("/site/src/assets/fonts/**/*.{ttf,woff}"),
            PathBuf::from("/site/src/assets/fonts")
        );
        assert_eq!(glob_base("*.html"), PathBuf::from("."));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let glob = SourceGlob::new("src/**/*.html").unwrap();

        assert!(glob.matches(Path::new("src/index.html")));
        assert!(glob.matches(Path::new("src/blog/2020/post.html")));
        assert!(!glob.matches(Path::new("src/index.htm")));
        assert!(!glob.matches(Path::new("other/index.html")));
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let glob = SourceGlob::new("src/*.js").unwrap();

        assert!(glob.matches(Path::new("src/main.js")));
        assert!(!glob.matches(Path::new("src/lib/util.js")));
    }

    #[test]
    fn lists_matching_files_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("img");
        fs::create_dir_all(root.join("icons")).unwrap();
        fs::write(root.join("b.png"), b"").unwrap();
        fs::write(root.join("a.jpg"), b"").unwrap();
        fs::write(root.join("icons/logo.svg"), b"").unwrap();

        let glob = SourceGlob::new(&format!("{}/**/*.{{jpg,png}}", root.display())).unwrap();
        let files = glob.files().unwrap();

        assert_eq!(files, vec![root.join("a.jpg"), root.join("b.png")]);
    }

    #[test]
    fn empty_wildcard_match_is_not_an_error() {
        let dir = tempdir().unwrap();
        let glob = SourceGlob::new(&format!("{}/missing/**/*.svg", dir.path().display())).unwrap();

        assert_eq!(glob.files().unwrap(), Vec::<PathBuf>::new());
    }

    #[test]
    fn missing_literal_source_is_an_error() {
        let dir = tempdir().unwrap();
        let glob = SourceGlob::new(&format!("{}/main.js", dir.path().display())).unwrap();

        assert!(glob.is_literal());
        assert!(matches!(glob.files(), Err(StageError::MissingSource(_))));
    }
}
