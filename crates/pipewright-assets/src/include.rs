//! Include directive resolution for scripts and markup.
//!
//! A line consisting only of a directive is replaced by the contents of the
//! referenced file, resolved relative to the including file:
//!
//! ```text
//! //= include vendor/jquery.js
//! //= partials/header.js
//! /*= include polyfills.js */
//! <!--= include partials/nav.html -->
//! ```
//!
//! Included files are processed recursively and every included line is
//! prefixed with the directive's indentation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TransformError;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\s*)(?://=\s*(?:include\s+)?(\S+)|/\*=\s*(?:include\s+)?(\S+?)\s*\*/|<!--=\s*(?:include\s+)?(\S+?)\s*-->)\s*$",
    )
    .expect("valid include regex")
});

/// Where a line of assembled output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOrigin {
    /// Index into [`Assembled::sources`].
    pub source: usize,
    /// Zero-based line in that source.
    pub line: u32,
}

/// The result of resolving every include reachable from an entry file.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub code: String,
    /// Every file that contributed lines, entry first.
    pub sources: Vec<PathBuf>,
    /// Original contents, parallel to `sources`.
    pub contents: Vec<String>,
    /// One origin per output line.
    pub origins: Vec<LineOrigin>,
}

impl Assembled {
    fn source_index(&mut self, path: &Path, content: &str) -> usize {
        if let Some(index) = self.sources.iter().position(|p| p == path) {
            return index;
        }
        self.sources.push(path.to_path_buf());
        self.contents.push(content.to_string());
        self.sources.len() - 1
    }

    fn push_line(&mut self, indent: &str, line: &str, origin: LineOrigin) {
        if !line.is_empty() {
            self.code.push_str(indent);
        }
        self.code.push_str(line);
        self.code.push('\n');
        self.origins.push(origin);
    }
}

/// Read `entry` and splice in every include directive it reaches.
pub fn resolve_includes(entry: &Path) -> Result<Assembled, TransformError> {
    let source = fs::read_to_string(entry).map_err(|e| TransformError::ReadError {
        path: entry.to_path_buf(),
        source: e,
    })?;
    resolve_source(entry, &source)
}

/// Resolve includes in already-loaded `source` that lives at `path`.
pub fn resolve_source(path: &Path, source: &str) -> Result<Assembled, TransformError> {
    let mut assembled = Assembled::default();
    let mut stack = Vec::new();
    splice(path, source, "", &mut stack, &mut assembled)?;
    Ok(assembled)
}

fn splice(
    path: &Path,
    source: &str,
    indent: &str,
    stack: &mut Vec<PathBuf>,
    out: &mut Assembled,
) -> Result<(), TransformError> {
    let identity = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&identity) {
        return Err(TransformError::IncludeCycle(path.to_path_buf()));
    }
    stack.push(identity);

    let index = out.source_index(path, source);
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    for (number, line) in source.lines().enumerate() {
        let Some(caps) = DIRECTIVE.captures(line) else {
            let origin = LineOrigin {
                source: index,
                line: number as u32,
            };
            out.push_line(indent, line, origin);
            continue;
        };

        let target = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let included = base.join(target);
        if !included.is_file() {
            return Err(TransformError::IncludeNotFound {
                path: included,
                from: path.to_path_buf(),
            });
        }

        tracing::debug!("Including {} into {}", included.display(), path.display());
        let content = fs::read_to_string(&included).map_err(|e| TransformError::ReadError {
            path: included.clone(),
            source: e,
        })?;

        let nested_indent = format!("{}{}", indent, &caps[1]);
        splice(&included, &content, &nested_indent, stack, out)?;
    }

    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn splices_every_directive_form() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "var a = 1;\n").unwrap();
        fs::write(dir.path().join("b.js"), "var b = 2;\n").unwrap();
        fs::write(dir.path().join("c.js"), "var c = 3;\n").unwrap();
        let main = dir.path().join("main.js");
        fs::write(
            &main,
            "//= include a.js\n//= b.js\n/*= include c.js */\nrun();\n",
        )
        .unwrap();

        let assembled = resolve_includes(&main).unwrap();

        assert_eq!(assembled.code, "var a = 1;\nvar b = 2;\nvar c = 3;\nrun();\n");
        assert_eq!(assembled.sources.len(), 4);
    }

    #[test]
    fn indents_nested_includes() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("partials")).unwrap();
        fs::write(dir.path().join("partials/nav.html"), "<nav>\n  <a>home</a>\n</nav>\n").unwrap();
        let page = dir.path().join("index.html");
        fs::write(&page, "<body>\n  <!--= include partials/nav.html -->\n</body>\n").unwrap();

        let assembled = resolve_includes(&page).unwrap();

        assert_eq!(
            assembled.code,
            "<body>\n  <nav>\n    <a>home</a>\n  </nav>\n</body>\n"
        );
    }

    #[test]
    fn resolves_relative_to_the_including_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/util")).unwrap();
        fs::write(dir.path().join("lib/outer.js"), "//= util/inner.js\n").unwrap();
        fs::write(dir.path().join("lib/util/inner.js"), "inner();\n").unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "//= include lib/outer.js\n").unwrap();

        let assembled = resolve_includes(&main).unwrap();

        assert_eq!(assembled.code, "inner();\n");
    }

    #[test]
    fn records_line_origins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.js"), "one();\ntwo();\n").unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "start();\n//= include foo.js\nend();\n").unwrap();

        let assembled = resolve_includes(&main).unwrap();

        assert_eq!(
            assembled.origins,
            vec![
                LineOrigin { source: 0, line: 0 },
                LineOrigin { source: 1, line: 0 },
                LineOrigin { source: 1, line: 1 },
                LineOrigin { source: 0, line: 2 },
            ]
        );
        assert_eq!(assembled.contents[1], "one();\ntwo();\n");
    }

    #[test]
    fn reports_missing_includes() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "//= include nope.js\n").unwrap();

        let err = resolve_includes(&main).unwrap_err();

        assert!(matches!(err, TransformError::IncludeNotFound { .. }));
    }

    #[test]
    fn detects_cycles() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "//= include b.js\n").unwrap();
        fs::write(dir.path().join("b.js"), "//= include a.js\n").unwrap();

        let err = resolve_includes(&dir.path().join("a.js")).unwrap_err();

        assert!(matches!(err, TransformError::IncludeCycle(_)));
    }

    #[test]
    fn leaves_ordinary_comments_alone() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "// include this later\nx = 1; //= not.js\n").unwrap();

        let assembled = resolve_includes(&main).unwrap();

        assert_eq!(assembled.code, "// include this later\nx = 1; //= not.js\n");
    }
}
