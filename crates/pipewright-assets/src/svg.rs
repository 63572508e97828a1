//! SVG optimization using usvg.
//!
//! usvg parses the document and writes it back normalized: doctype, comments,
//! metadata, titles, scripts, hidden and empty elements are gone, styles are
//! resolved to attributes, shapes become absolute paths and groups survive
//! only when they carry something. The rule table picks the writer's
//! precision and the cleanups applied to what usvg writes.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use crate::error::TransformError;

/// Bumped whenever the rule table or what a rule configures changes.
pub const SVG_RULES_VERSION: u32 = 2;

/// Decimal places kept in path data and other coordinates.
pub const PRECISION: u8 = 3;

/// Decimal places kept in transform matrices.
pub const TRANSFORM_PRECISION: u8 = 5;

// usvg's own writer default.
const FULL_PRECISION: u8 = 8;

static ID_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:url\(\s*['"]?#|href=["']#)([^'")\s]+)"#).expect("valid id reference regex")
});

static RASTER_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^data:image/(?:png|jpe?g|gif)|\.(?:png|jpe?g|gif)$")
        .expect("valid raster href regex")
});

/// A single named SVG cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgRule {
    RemoveDoctype,
    RemoveComments,
    RemoveXmlProcInst,
    RemoveMetadata,
    RemoveTitle,
    RemoveHiddenElems,
    RemoveEmptyText,
    RemoveViewBox,
    ConvertStyleToAttrs,
    MinifyStyles,
    CleanupIds,
    RemoveRasterImages,
    RemoveUselessDefs,
    CleanupListOfValues,
    CleanupNumericValues,
    ConvertColors,
    RemoveUnknownsAndDefaults,
    RemoveNonInheritableGroupAttrs,
    RemoveUselessStrokeAndFill,
    CleanupEnableBackground,
    ConvertShapeToPath,
    MoveElemsAttrsToGroup,
    MoveGroupAttrsToElems,
    CollapseGroups,
    ConvertPathData,
    ConvertTransform,
    RemoveEmptyAttrs,
    RemoveEmptyContainers,
    MergePaths,
    RemoveUnusedNs,
    SortAttrs,
    RemoveDesc,
    RemoveDimensions,
    RemoveStyleElement,
    RemoveScriptElement,
}

/// Rules applied to every production SVG, in order.
pub const SVG_RULES: &[SvgRule] = &[
    SvgRule::RemoveDoctype,
    SvgRule::RemoveComments,
    SvgRule::RemoveXmlProcInst,
    SvgRule::RemoveMetadata,
    SvgRule::RemoveTitle,
    SvgRule::RemoveHiddenElems,
    SvgRule::RemoveEmptyText,
    SvgRule::RemoveViewBox,
    SvgRule::ConvertStyleToAttrs,
    SvgRule::MinifyStyles,
    SvgRule::CleanupIds,
    SvgRule::RemoveRasterImages,
    SvgRule::RemoveUselessDefs,
    SvgRule::CleanupListOfValues,
    SvgRule::CleanupNumericValues,
    SvgRule::ConvertColors,
    SvgRule::RemoveUnknownsAndDefaults,
    SvgRule::RemoveNonInheritableGroupAttrs,
    SvgRule::RemoveUselessStrokeAndFill,
    SvgRule::CleanupEnableBackground,
    SvgRule::ConvertShapeToPath,
    SvgRule::MoveElemsAttrsToGroup,
    SvgRule::MoveGroupAttrsToElems,
    SvgRule::CollapseGroups,
    SvgRule::ConvertPathData,
    SvgRule::ConvertTransform,
    SvgRule::RemoveEmptyAttrs,
    SvgRule::RemoveEmptyContainers,
    SvgRule::MergePaths,
    SvgRule::RemoveUnusedNs,
    SvgRule::SortAttrs,
    SvgRule::RemoveDesc,
    SvgRule::RemoveDimensions,
    SvgRule::RemoveStyleElement,
    SvgRule::RemoveScriptElement,
];

impl SvgRule {
    /// The conventional camelCase rule name.
    pub fn name(self) -> &'static str {
        match self {
            SvgRule::RemoveDoctype => "removeDoctype",
            SvgRule::RemoveComments => "removeComments",
            SvgRule::RemoveXmlProcInst => "removeXMLProcInst",
            SvgRule::RemoveMetadata => "removeMetadata",
            SvgRule::RemoveTitle => "removeTitle",
            SvgRule::RemoveHiddenElems => "removeHiddenElems",
            SvgRule::RemoveEmptyText => "removeEmptyText",
            SvgRule::RemoveViewBox => "removeViewBox",
            SvgRule::ConvertStyleToAttrs => "convertStyleToAttrs",
            SvgRule::MinifyStyles => "minifyStyles",
            SvgRule::CleanupIds => "cleanupIDs",
            SvgRule::RemoveRasterImages => "removeRasterImages",
            SvgRule::RemoveUselessDefs => "removeUselessDefs",
            SvgRule::CleanupListOfValues => "cleanupListOfValues",
            SvgRule::CleanupNumericValues => "cleanupNumericValues",
            SvgRule::ConvertColors => "convertColors",
            SvgRule::RemoveUnknownsAndDefaults => "removeUnknownsAndDefaults",
            SvgRule::RemoveNonInheritableGroupAttrs => "removeNonInheritableGroupAttrs",
            SvgRule::RemoveUselessStrokeAndFill => "removeUselessStrokeAndFill",
            SvgRule::CleanupEnableBackground => "cleanupEnableBackground",
            SvgRule::ConvertShapeToPath => "convertShapeToPath",
            SvgRule::MoveElemsAttrsToGroup => "moveElemsAttrsToGroup",
            SvgRule::MoveGroupAttrsToElems => "moveGroupAttrsToElems",
            SvgRule::CollapseGroups => "collapseGroups",
            SvgRule::ConvertPathData => "convertPathData",
            SvgRule::ConvertTransform => "convertTransform",
            SvgRule::RemoveEmptyAttrs => "removeEmptyAttrs",
            SvgRule::RemoveEmptyContainers => "removeEmptyContainers",
            SvgRule::MergePaths => "mergePaths",
            SvgRule::RemoveUnusedNs => "removeUnusedNS",
            SvgRule::SortAttrs => "sortAttrs",
            SvgRule::RemoveDesc => "removeDesc",
            SvgRule::RemoveDimensions => "removeDimensions",
            SvgRule::RemoveStyleElement => "removeStyleElement",
            SvgRule::RemoveScriptElement => "removeScriptElement",
        }
    }

    /// Fold this rule into `settings`. Returns `false` for rules usvg's
    /// normalization always performs.
    pub fn configure(self, settings: &mut SvgSettings) -> bool {
        match self {
            SvgRule::CleanupNumericValues | SvgRule::ConvertPathData => {
                settings.coordinates_precision = PRECISION;
            }
            SvgRule::ConvertTransform => settings.transforms_precision = TRANSFORM_PRECISION,
            SvgRule::RemoveViewBox => settings.remove_view_box = true,
            SvgRule::RemoveDimensions => settings.remove_dimensions = true,
            SvgRule::RemoveRasterImages => settings.remove_raster_images = true,
            SvgRule::CleanupIds => settings.cleanup_ids = true,
            SvgRule::ConvertColors => settings.shorten_colors = true,
            _ => return false,
        }
        true
    }
}

/// usvg writer options plus the cleanups run over its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgSettings {
    pub coordinates_precision: u8,
    pub transforms_precision: u8,
    /// Drop a root `viewBox` equal to `0 0 width height`, unless dimensions go
    pub remove_view_box: bool,
    /// Drop root `width`/`height` so the viewBox alone sizes the image,
    /// adding one from them when the root has none
    pub remove_dimensions: bool,
    pub remove_raster_images: bool,
    /// Drop ids nothing references
    pub cleanup_ids: bool,
    /// `#AABBCC` to `#abc`
    pub shorten_colors: bool,
}

impl Default for SvgSettings {
    fn default() -> Self {
        Self {
            coordinates_precision: FULL_PRECISION,
            transforms_precision: FULL_PRECISION,
            remove_view_box: false,
            remove_dimensions: false,
            remove_raster_images: false,
            cleanup_ids: false,
            shorten_colors: false,
        }
    }
}

impl SvgSettings {
    pub fn from_rules(rules: &[SvgRule]) -> Self {
        let mut settings = Self::default();
        for rule in rules {
            if !rule.configure(&mut settings) {
                tracing::trace!("{} is part of usvg's normalization", rule.name());
            }
        }
        settings
    }
}

fn svg_error(e: impl Display) -> TransformError {
    TransformError::Svg(e.to_string())
}

/// Optimize an SVG document with the full [`SVG_RULES`] table.
pub fn optimize_svg(source: &str) -> Result<String, TransformError> {
    optimize_with(source, SVG_RULES)
}

/// Optimize an SVG document with a custom rule sequence.
pub fn optimize_with(source: &str, rules: &[SvgRule]) -> Result<String, TransformError> {
    let settings = SvgSettings::from_rules(rules);

    let tree = usvg::Tree::from_data(source.as_bytes(), &usvg::Options::default())
        .map_err(svg_error)?;
    let written = tree.to_string(&usvg::WriteOptions {
        coordinates_precision: settings.coordinates_precision,
        transforms_precision: settings.transforms_precision,
        indent: usvg::Indent::None,
        attributes_indent: usvg::Indent::None,
        ..usvg::WriteOptions::default()
    });

    finish(&written, &settings)
}

/// Apply the output cleanups to a document usvg wrote.
fn finish(svg: &str, settings: &SvgSettings) -> Result<String, TransformError> {
    let referenced: HashSet<&str> = if settings.cleanup_ids {
        ID_REFERENCE
            .captures_iter(svg)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    } else {
        HashSet::new()
    };

    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::new());
    let mut root = true;

    loop {
        let event = reader.read_event().map_err(svg_error)?;
        let written = match event {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => continue,
            Event::Start(e) => {
                if settings.remove_raster_images && is_raster_image(&e) {
                    reader.read_to_end(e.name()).map_err(svg_error)?;
                    continue;
                }
                let is_root = std::mem::take(&mut root);
                writer.write_event(Event::Start(rewrite(&e, settings, &referenced, is_root)?))
            }
            Event::Empty(e) => {
                if settings.remove_raster_images && is_raster_image(&e) {
                    continue;
                }
                let is_root = std::mem::take(&mut root);
                writer.write_event(Event::Empty(rewrite(&e, settings, &referenced, is_root)?))
            }
            other => writer.write_event(other),
        };
        written.map_err(svg_error)?;
    }

    String::from_utf8(writer.into_inner()).map_err(svg_error)
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn is_raster_image(e: &BytesStart) -> bool {
    e.name().as_ref() == b"image"
        && attribute(e, "href")
            .or_else(|| attribute(e, "xlink:href"))
            .is_some_and(|href| RASTER_HREF.is_match(&href))
}

fn view_box_matches_size(e: &BytesStart) -> bool {
    let parse = |name: &str| attribute(e, name).and_then(|v| v.trim().parse::<f64>().ok());
    let (Some(width), Some(height), Some(view_box)) =
        (parse("width"), parse("height"), attribute(e, "viewBox"))
    else {
        return false;
    };

    let numbers: Vec<f64> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    numbers == [0.0, 0.0, width, height]
}

fn is_color_attribute(key: &[u8]) -> bool {
    matches!(
        key,
        b"fill" | b"stroke" | b"stop-color" | b"flood-color" | b"lighting-color" | b"color"
    )
}

fn shorten_hex(value: &[u8]) -> Cow<'_, [u8]> {
    if value.len() != 7 || value[0] != b'#' || !value[1..].iter().all(u8::is_ascii_hexdigit) {
        return Cow::Borrowed(value);
    }
    let hex = value.to_ascii_lowercase();
    if hex[1] == hex[2] && hex[3] == hex[4] && hex[5] == hex[6] {
        Cow::Owned(vec![b'#', hex[1], hex[3], hex[5]])
    } else {
        Cow::Owned(hex)
    }
}

fn rewrite(
    e: &BytesStart,
    settings: &SvgSettings,
    referenced: &HashSet<&str>,
    is_root: bool,
) -> Result<BytesStart<'static>, TransformError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let drop_view_box = is_root
        && settings.remove_view_box
        && !settings.remove_dimensions
        && view_box_matches_size(e);
    let add_view_box = is_root && settings.remove_dimensions && attribute(e, "viewBox").is_none();

    let mut out = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(svg_error)?;
        let key = attr.key.as_ref();
        let value = attr.value.as_ref();

        let skip = match key {
            b"width" | b"height" => is_root && settings.remove_dimensions,
            b"viewBox" => drop_view_box,
            b"id" => settings.cleanup_ids && !referenced.contains(&*String::from_utf8_lossy(value)),
            _ => false,
        };
        if skip {
            continue;
        }

        let value = if settings.shorten_colors && is_color_attribute(key) {
            shorten_hex(value)
        } else {
            Cow::Borrowed(value)
        };
        out.push_attribute((key, value.as_ref()));
    }

    if add_view_box {
        if let (Some(width), Some(height)) = (attribute(e, "width"), attribute(e, "height")) {
            out.push_attribute(("viewBox", format!("0 0 {} {}", width, height).as_str()));
        }
    }
    Ok(out)
}
