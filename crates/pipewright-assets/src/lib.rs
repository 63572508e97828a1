//! Pure asset transforms used by the pipewright pipeline.
//!
//! Each transform takes source text or bytes and returns the transformed
//! output; none of them know about globs, destinations or build modes.

pub mod error;
pub mod html;
pub mod include;
pub mod js;
pub mod raster;
pub mod sourcemap;
pub mod styles;
pub mod svg;

pub use error::TransformError;
pub use html::collapse_whitespace;
pub use include::{resolve_includes, resolve_source, Assembled, LineOrigin};
pub use js::{minify_js, minify_js_with, JsRule, JS_RULES, JS_RULES_VERSION};
pub use raster::{ImageOptimizer, RasterFormat, RasterOptimizer};
pub use sourcemap::{inline_css_comment, inline_js_comment, line_source_map};
pub use styles::{compile_scss, CssPipeline, DEFAULT_BROWSERS};
pub use svg::{optimize_svg, optimize_with, SvgRule, SvgSettings, SVG_RULES, SVG_RULES_VERSION};
