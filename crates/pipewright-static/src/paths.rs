//! Asset kinds and the table mapping each kind to its globs and destination.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DirsConfig;
use crate::error::StageError;
use crate::globs::SourceGlob;

/// The kinds of asset the pipeline builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Html,
    Js,
    Styles,
    ImageSvg,
    ImageRaster,
    Fonts,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Html,
        AssetKind::Js,
        AssetKind::Styles,
        AssetKind::ImageSvg,
        AssetKind::ImageRaster,
        AssetKind::Fonts,
    ];

    /// Name of the stage that builds this kind.
    pub fn stage_name(self) -> &'static str {
        match self {
            AssetKind::Html => "html:build",
            AssetKind::Js => "js:build",
            AssetKind::Styles => "styles:build",
            AssetKind::ImageSvg => "images:svg",
            AssetKind::ImageRaster => "images:basic",
            AssetKind::Fonts => "fonts:build",
        }
    }

    pub fn from_stage_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.stage_name() == name)
    }

    pub fn is_image(self) -> bool {
        matches!(self, AssetKind::ImageSvg | AssetKind::ImageRaster)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage_name())
    }
}

/// Where one kind reads from, what it watches and where it writes.
#[derive(Debug, Clone)]
pub struct PathEntry {
    pub kind: AssetKind,
    pub source: SourceGlob,
    pub watch: SourceGlob,
    pub dest: PathBuf,
}

impl PathEntry {
    pub fn new(kind: AssetKind, source: &str, watch: &str, dest: PathBuf) -> Result<Self, StageError> {
        Ok(Self {
            kind,
            source: SourceGlob::new(source)?,
            watch: SourceGlob::new(watch)?,
            dest,
        })
    }

    /// Output path for a matched source file.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let relative = source.strip_prefix(self.source.base()).unwrap_or(source);
        let target = self.dest.join(relative);
        match self.kind {
            AssetKind::Styles => target.with_extension("css"),
            _ => target,
        }
    }
}

/// The fixed mapping from asset kind to paths.
#[derive(Debug, Clone)]
pub struct PathTable {
    dest_root: PathBuf,
    entries: Vec<PathEntry>,
}

impl PathTable {
    /// The conventional layout under the configured roots.
    pub fn new(dirs: &DirsConfig) -> Result<Self, StageError> {
        let src = dirs.src.display().to_string();
        let src = src.trim_end_matches('/');
        let dest = &dirs.dest;
        let images = format!("{}/assets/images/**/*.*", src);
        let fonts = format!("{}/assets/fonts/**/*.{{eot,ttf,woff,woff2,svg}}", src);
        let html = format!("{}/**/*.html", src);

        let entries = vec![
            PathEntry::new(AssetKind::Html, &html, &html, dest.clone())?,
            PathEntry::new(
                AssetKind::Js,
                &format!("{}/assets/js/main.js", src),
                &format!("{}/assets/js/**/*.js", src),
                dest.join("assets/js"),
            )?,
            PathEntry::new(
                AssetKind::Styles,
                &format!("{}/assets/styles/main.scss", src),
                &format!("{}/assets/styles/**/*.scss", src),
                dest.join("assets/styles"),
            )?,
            PathEntry::new(
                AssetKind::ImageSvg,
                &format!("{}/assets/images/**/*.svg", src),
                &images,
                dest.join("assets/images"),
            )?,
            PathEntry::new(
                AssetKind::ImageRaster,
                &format!("{}/assets/images/**/*.{{jpg,jpeg,png}}", src),
                &images,
                dest.join("assets/images"),
            )?,
            PathEntry::new(AssetKind::Fonts, &fonts, &fonts, dest.join("assets/fonts"))?,
        ];

        Self::from_entries(dest.clone(), entries)
    }

    /// Build a table from explicit entries, checking there is exactly one per kind.
    pub fn from_entries(dest_root: PathBuf, entries: Vec<PathEntry>) -> Result<Self, StageError> {
        let table = Self { dest_root, entries };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), StageError> {
        for kind in AssetKind::ALL {
            let count = self.entries.iter().filter(|e| e.kind == kind).count();
            if count != 1 {
                return Err(StageError::Glob(format!(
                    "expected one path entry for {}, found {}",
                    kind, count
                )));
            }
        }
        Ok(())
    }

    pub fn entry(&self, kind: AssetKind) -> Result<&PathEntry, StageError> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .ok_or_else(|| StageError::Glob(format!("no path entry for {}", kind)))
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// The destination root that Clean removes and the server serves.
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Kinds whose watch glob matches `path`.
    pub fn kinds_watching(&self, path: &Path) -> Vec<AssetKind> {
        self.entries
            .iter()
            .filter(|e| e.watch.matches(path))
            .map(|e| e.kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> PathTable {
        PathTable::new(&DirsConfig::default()).unwrap()
    }

    #[test]
    fn stage_names_round_trip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_stage_name(kind.stage_name()), Some(kind));
        }
        assert_eq!(AssetKind::from_stage_name("images:build"), None);
    }

    #[test]
    fn has_the_conventional_layout() {
        let table = table();
        let js = table.entry(AssetKind::Js).unwrap();

        assert_eq!(js.source.as_str(), "src/assets/js/main.js");
        assert_eq!(js.watch.as_str(), "src/assets/js/**/*.js");
        assert_eq!(js.dest, PathBuf::from("build/assets/js"));
        assert_eq!(table.dest_root(), Path::new("build"));
    }

    #[test]
    fn maps_sources_to_outputs() {
        let table = table();

        let html = table.entry(AssetKind::Html).unwrap();
        assert_eq!(
            html.output_path(Path::new("src/blog/post.html")),
            PathBuf::from("build/blog/post.html")
        );

        let styles = table.entry(AssetKind::Styles).unwrap();
        assert_eq!(
            styles.output_path(Path::new("src/assets/styles/main.scss")),
            PathBuf::from("build/assets/styles/main.css")
        );

        let raster = table.entry(AssetKind::ImageRaster).unwrap();
        assert_eq!(
            raster.output_path(Path::new("src/assets/images/photos/cat.jpg")),
            PathBuf::from("build/assets/images/photos/cat.jpg")
        );
    }

    #[test]
    fn image_kinds_share_a_watch_glob() {
        let kinds = table().kinds_watching(Path::new("src/assets/images/icons/x.gif"));

        assert_eq!(kinds, vec![AssetKind::ImageSvg, AssetKind::ImageRaster]);
    }

    #[test]
    fn routes_changes_to_their_kind() {
        let table = table();

        assert_eq!(
            table.kinds_watching(Path::new("src/assets/styles/base/_reset.scss")),
            vec![AssetKind::Styles]
        );
        assert_eq!(
            table.kinds_watching(Path::new("src/assets/js/lib/util.js")),
            vec![AssetKind::Js]
        );
        assert_eq!(
            table.kinds_watching(Path::new("src/assets/fonts/Inter.woff2")),
            vec![AssetKind::Fonts]
        );
        assert!(table.kinds_watching(Path::new("README.md")).is_empty());
    }

    #[test]
    fn rejects_duplicate_entries() {
        let dest = PathBuf::from("build");
        let mut entries = table().entries().to_vec();
        entries.push(entries[0].clone());

        assert!(PathTable::from_entries(dest.clone(), entries).is_err());
        assert!(PathTable::from_entries(dest, Vec::new()).is_err());
    }
}
