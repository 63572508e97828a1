//! SCSS compilation and CSS post-processing.

use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;
use std::sync::LazyLock;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use regex::{Captures, Regex};

use crate::error::TransformError;
use crate::sourcemap::inline_css_comment;

/// Browser matrix used for vendor prefixing when none is configured.
pub const DEFAULT_BROWSERS: &[&str] = &[
    "last 2 versions",
    "ie >= 11",
    "Opera 12.1",
    "Android 4",
    "Firefox ESR",
    "iOS >= 8",
    "Safari >= 8",
];

static KEYFRAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:-[a-z]+-)?keyframes\s+([\w-]+)").expect("valid keyframes regex")
});

static ANIMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:-[a-z]+-)?animation(?:-name)?\s*:\s*([^;}]+)").expect("valid animation regex")
});

static FONT_FACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@font-face\s*\{[^}]*\}").expect("valid font-face regex"));

static FONT_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"font-family\s*:\s*([^;}]+)").expect("valid font-family regex")
});

static FONT_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[{;\s])font(?:-family)?\s*:\s*([^;}]+)").expect("valid font regex")
});

static COUNTER_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@counter-style\s+([\w-]+)\s*\{[^}]*\}").expect("valid counter-style regex")
});

static COUNTER_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:list-style(?:-type)?\s*:|system\s*:\s*extends)\s*([^;}]+)")
        .expect("valid counter use regex")
});

static FLEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{;])((?:-[a-z]+-)?flex):([^;}]+)").expect("valid flex regex")
});

fn css_error(e: impl Display) -> TransformError {
    TransformError::Css(e.to_string())
}

/// Compile an SCSS entry file; imports resolve relative to its directory.
pub fn compile_scss(path: &Path) -> Result<String, TransformError> {
    let options = grass::Options::default().style(grass::OutputStyle::Expanded);
    grass::from_path(path, &options).map_err(|e| TransformError::Sass(e.to_string()))
}

/// Post-processes compiled CSS for a fixed browser matrix.
#[derive(Debug, Clone, Default)]
pub struct CssPipeline {
    targets: Targets,
}

impl CssPipeline {
    /// Build a pipeline from browserslist queries.
    pub fn new<S: AsRef<str>>(browsers: &[S]) -> Result<Self, TransformError> {
        let browsers = Browsers::from_browserslist(browsers.iter().map(|b| b.as_ref()))
            .map_err(css_error)?;
        Ok(Self {
            targets: Targets {
                browsers,
                ..Targets::default()
            },
        })
    }

    /// Prefix and minify, drop `@keyframes`, `@font-face` and
    /// `@counter-style` rules nothing uses, then apply the flexbug fixups.
    pub fn optimize(&self, css: &str, filename: &str) -> Result<String, TransformError> {
        let css = &discard_unused_at_rules(css);
        let unused_symbols = unused_keyframes(css);
        if !unused_symbols.is_empty() {
            tracing::debug!("Dropping unused keyframes in {}: {:?}", filename, unused_symbols);
        }

        let mut stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: filename.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(css_error)?;

        stylesheet
            .minify(MinifyOptions {
                targets: self.targets,
                unused_symbols,
            })
            .map_err(css_error)?;

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(css_error)?;

        Ok(fix_flexbugs(&result.code))
    }

    /// Print readable CSS followed by an inline source map comment.
    pub fn print_with_source_map(&self, css: &str, filename: &str) -> Result<String, TransformError> {
        let stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: filename.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(css_error)?;

        let mut map = SourceMap::new("/");
        map.add_source(filename);
        map.set_source_content(0, css)
            .map_err(|e| TransformError::SourceMap(format!("{:?}", e)))?;

        let result = stylesheet
            .to_css(PrinterOptions {
                source_map: Some(&mut map),
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(css_error)?;

        let json = map
            .to_json(None)
            .map_err(|e| TransformError::SourceMap(format!("{:?}", e)))?;

        Ok(format!("{}\n{}\n", result.code, inline_css_comment(&json)))
    }
}

/// Names of `@keyframes` that no `animation` or `animation-name` refers to.
pub fn unused_keyframes(css: &str) -> HashSet<String> {
    let used: HashSet<&str> = ANIMATION
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
        .collect();

    KEYFRAMES
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !used.contains(name))
        .map(str::to_string)
        .collect()
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase()
}

/// Remove `@font-face` rules whose family no `font` or `font-family`
/// declaration names, and `@counter-style` rules no `list-style`,
/// `list-style-type` or `system: extends` refers to.
pub fn discard_unused_at_rules(css: &str) -> String {
    let outside_faces = FONT_FACE.replace_all(css, "");
    let used_fonts: Vec<String> = FONT_USE
        .captures_iter(&outside_faces)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace(['"', '\''], "").to_lowercase())
        .collect();

    let css = FONT_FACE.replace_all(css, |caps: &Captures| {
        let family = FONT_FAMILY
            .captures(&caps[0])
            .and_then(|c| c.get(1))
            .map(|m| unquote(m.as_str()));
        match family {
            Some(family) if !used_fonts.iter().any(|used| used.contains(&family)) => {
                tracing::debug!("Dropping unused font face {}", family);
                String::new()
            }
            _ => caps[0].to_string(),
        }
    });

    let used_counters: HashSet<&str> = COUNTER_USE
        .captures_iter(&css)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
        .collect();

    COUNTER_STYLE
        .replace_all(&css, |caps: &Captures| {
            if used_counters.contains(&caps[1]) {
                caps[0].to_string()
            } else {
                tracing::debug!("Dropping unused counter style {}", &caps[1]);
                String::new()
            }
        })
        .into_owned()
}

/// Spell out a numeric `flex` shorthand for engines that misread the short
/// forms. A missing or zero basis becomes `0%` and a missing shrink `1`.
fn fix_flex(prop: &str, value: &str) -> Option<String> {
    let (value, important) = match value.strip_suffix("!important") {
        Some(rest) => (rest.trim_end(), "!important"),
        None => (value, ""),
    };

    let mut parts = value.split_whitespace();
    let grow = parts.next()?;
    grow.parse::<f64>().ok()?;
    let rest: Vec<&str> = parts.collect();

    let (shrink, basis) = match rest.split_first() {
        Some((first, tail)) if first.parse::<f64>().is_ok() => (*first, tail.join(" ")),
        _ => ("1", rest.join(" ")),
    };
    let basis = match basis.as_str() {
        "" | "0" | "0px" => "0%".to_string(),
        _ => basis,
    };

    // IE drops a shorthand whose basis is calc()
    if prop == "flex" && basis.starts_with("calc(") {
        return Some(format!(
            "flex-grow:{grow}{important};flex-shrink:{shrink}{important};flex-basis:{basis}{important}"
        ));
    }
    Some(format!("{prop}:{grow} {shrink} {basis}{important}"))
}

/// Apply the flexbug fixups to minified CSS.
pub fn fix_flexbugs(css: &str) -> String {
    FLEX.replace_all(css, |caps: &Captures| match fix_flex(&caps[2], &caps[3]) {
        Some(fixed) => format!("{}{}", &caps[1], fixed),
        None => caps[0].to_string(),
    })
    .into_owned()
}
