//! JavaScript minification.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::TransformError;

/// Bumped whenever the rule table changes.
pub const JS_RULES_VERSION: u32 = 1;

/// A compression or mangling rule applied to production scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsRule {
    Sequences,
    DeadCode,
    Conditionals,
    Booleans,
    Unused,
    IfReturn,
    JoinVars,
    DropConsole,
    Mangle,
}

/// Rules applied to every production script.
pub const JS_RULES: &[JsRule] = &[
    JsRule::Sequences,
    JsRule::DeadCode,
    JsRule::Conditionals,
    JsRule::Booleans,
    JsRule::Unused,
    JsRule::IfReturn,
    JsRule::JoinVars,
    JsRule::DropConsole,
    JsRule::Mangle,
];

impl JsRule {
    pub fn name(self) -> &'static str {
        match self {
            JsRule::Sequences => "sequences",
            JsRule::DeadCode => "dead_code",
            JsRule::Conditionals => "conditionals",
            JsRule::Booleans => "booleans",
            JsRule::Unused => "unused",
            JsRule::IfReturn => "if_return",
            JsRule::JoinVars => "join_vars",
            JsRule::DropConsole => "drop_console",
            JsRule::Mangle => "mangle",
        }
    }

    fn is_compression(self) -> bool {
        !matches!(self, JsRule::Mangle | JsRule::DropConsole)
    }
}

fn minifier_options(rules: &[JsRule]) -> MinifierOptions {
    let compress = rules.iter().any(|r| r.is_compression()).then(|| CompressOptions {
        drop_console: rules.contains(&JsRule::DropConsole),
        ..CompressOptions::smallest()
    });
    let mangle = rules.contains(&JsRule::Mangle).then(MangleOptions::default);

    MinifierOptions { mangle, compress }
}

/// Minify a classic (non-module) script with [`JS_RULES`].
pub fn minify_js(source: &str) -> Result<String, TransformError> {
    minify_js_with(source, JS_RULES)
}

/// Minify a classic script with the given rules. Top-level declarations are
/// globals shared with other scripts on the page, so they are neither
/// renamed nor dropped.
pub fn minify_js_with(source: &str, rules: &[JsRule]) -> Result<String, TransformError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(TransformError::Js(error.to_string()));
    }

    let mut program = ret.program;
    let ret = Minifier::new(minifier_options(rules)).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_table_is_versioned() {
        assert_eq!(JS_RULES_VERSION, 1);
        let names: Vec<_> = JS_RULES.iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "sequences",
                "dead_code",
                "conditionals",
                "booleans",
                "unused",
                "if_return",
                "join_vars",
                "drop_console",
                "mangle"
            ]
        );
    }

    #[test]
    fn drops_console_calls() {
        let out = minify_js("console.log('debug');\nwindow.answer = 42;\n").unwrap();

        assert!(!out.contains("console"));
        assert!(out.contains("42"));
    }

    #[test]
    fn keeps_console_without_the_rule() {
        let out = minify_js_with("console.log('debug');", &[JsRule::DeadCode]).unwrap();

        assert!(out.contains("console.log"));
    }

    #[test]
    fn mangles_local_names() {
        let out = minify_js(
            "function greet(name) { var greetingMessage = 'hi ' + name; return greetingMessage; }\nwindow.greet = greet;\n",
        )
        .unwrap();

        assert!(!out.contains("greetingMessage"));
        assert!(out.len() < 60);
    }

    #[test]
    fn keeps_top_level_declarations() {
        let out = minify_js(
            "function openMenu() { document.body.className = 'open'; }\nvar siteName = 'pipewright';\n",
        )
        .unwrap();

        assert!(out.contains("openMenu"));
        assert!(out.contains("siteName"));
    }

    #[test]
    fn reports_syntax_errors() {
        let err = minify_js("function (").unwrap_err();

        assert!(matches!(err, TransformError::Js(_)));
    }
}
