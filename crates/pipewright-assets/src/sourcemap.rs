//! Line-level source maps for assembled scripts and inline map comments.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parcel_sourcemap::{OriginalLocation, SourceMap};

use crate::error::TransformError;
use crate::include::Assembled;

/// Build a source map mapping every line of `assembled.code` back to the
/// line it was spliced from. Source paths are made relative to `root`.
pub fn line_source_map(assembled: &Assembled, root: &Path) -> Result<String, TransformError> {
    let mut map = SourceMap::new("/");

    for (index, (path, content)) in assembled.sources.iter().zip(&assembled.contents).enumerate() {
        let name = path.strip_prefix(root).unwrap_or(path);
        let source = map.add_source(&name.to_string_lossy().replace('\\', "/"));
        debug_assert_eq!(source as usize, index);
        map.set_source_content(source as usize, content)
            .map_err(|e| TransformError::SourceMap(format!("{:?}", e)))?;
    }

    for (generated_line, origin) in assembled.origins.iter().enumerate() {
        map.add_mapping(
            generated_line as u32,
            0,
            Some(OriginalLocation {
                original_line: origin.line,
                original_column: 0,
                source: origin.source as u32,
                name: None,
            }),
        );
    }

    map.to_json(None)
        .map_err(|e| TransformError::SourceMap(format!("{:?}", e)))
}

/// A `//# sourceMappingURL` comment carrying the map inline.
pub fn inline_js_comment(map_json: &str) -> String {
    format!(
        "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
        STANDARD.encode(map_json)
    )
}

/// A `/*# sourceMappingURL */` comment carrying the map inline.
pub fn inline_css_comment(map_json: &str) -> String {
    format!(
        "/*# sourceMappingURL=data:application/json;base64,{} */",
        STANDARD.encode(map_json)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::LineOrigin;
    use std::path::PathBuf;

    fn assembled() -> Assembled {
        Assembled {
            code: "a();\nb();\n".to_string(),
            sources: vec![PathBuf::from("/site/src/main.js"), PathBuf::from("/site/src/foo.js")],
            contents: vec!["//= include foo.js\na();\n".to_string(), "b();\n".to_string()],
            origins: vec![
                LineOrigin { source: 0, line: 1 },
                LineOrigin { source: 1, line: 0 },
            ],
        }
    }

    #[test]
    fn lists_sources_relative_to_root() {
        let json = line_source_map(&assembled(), Path::new("/site")).unwrap();

        assert!(json.contains("src/main.js"));
        assert!(json.contains("src/foo.js"));
        assert!(!json.contains("/site/"));
        assert!(json.contains("sourcesContent"));
    }

    #[test]
    fn encodes_inline_comments() {
        let js = inline_js_comment("{}");
        let css = inline_css_comment("{}");

        assert_eq!(js, "//# sourceMappingURL=data:application/json;charset=utf-8;base64,e30=");
        assert_eq!(css, "/*# sourceMappingURL=data:application/json;base64,e30= */");
    }
}
