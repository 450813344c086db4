//! Font resolution and text measurement

use crate::constants::*;
use crate::style::TextStyle;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[cfg(feature = "ttf-parser")]
use tracing::warn;

/// Advance width and vertical metrics of a measured string
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
}

impl TextMetrics {
    /// Natural line height: ascent + descent + leading
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + self.leading
    }
}

/// Measures strings for a resolved text style.
///
/// Implementations must be deterministic: the same text and style always
/// produce the same metrics.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    /// Width of one inter-word space
    fn space_width(&self, style: &TextStyle) -> f32 {
        self.measure(" ", style).width
    }
}

/// Base-14 family used when a font is drawn without an embedded face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseFamily {
    Helvetica,
    Times,
    Courier,
}

impl BaseFamily {
    /// PDF BaseFont name for the style variant
    pub fn pdf_name(self, bold: bool, italic: bool) -> &'static str {
        match (self, bold, italic) {
            (Self::Helvetica, false, false) => "Helvetica",
            (Self::Helvetica, true, false) => "Helvetica-Bold",
            (Self::Helvetica, false, true) => "Helvetica-Oblique",
            (Self::Helvetica, true, true) => "Helvetica-BoldOblique",
            (Self::Times, false, false) => "Times-Roman",
            (Self::Times, true, false) => "Times-Bold",
            (Self::Times, false, true) => "Times-Italic",
            (Self::Times, true, true) => "Times-BoldItalic",
            (Self::Courier, false, false) => "Courier",
            (Self::Courier, true, false) => "Courier-Bold",
            (Self::Courier, false, true) => "Courier-Oblique",
            (Self::Courier, true, true) => "Courier-BoldOblique",
        }
    }
}

/// A resolved font face
#[derive(Debug, Clone, PartialEq)]
pub struct FontHandle {
    /// Canonical family name after alias matching
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    pub base: BaseFamily,
    /// Font file for the face, if one is registered
    pub file: Option<PathBuf>,
}

impl FontHandle {
    pub fn pdf_base_font(&self) -> &'static str {
        self.base.pdf_name(self.bold, self.italic)
    }
}

/// Maps a requested family and style to a concrete face.
///
/// Never fails: unknown families resolve to the default family.
pub trait FontResolver {
    fn resolve(&self, family: &str, bold: bool, italic: bool) -> FontHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FaceStyle {
    bold: bool,
    italic: bool,
}

#[derive(Debug, Clone)]
struct FamilyEntry {
    name: String,
    base: BaseFamily,
    faces: HashMap<FaceStyle, PathBuf>,
}

impl FamilyEntry {
    fn new(name: &str, base: BaseFamily) -> Self {
        Self {
            name: name.to_string(),
            base,
            faces: HashMap::new(),
        }
    }

    /// Exact style, then regular, then any registered face
    fn face(&self, bold: bool, italic: bool) -> Option<&PathBuf> {
        self.faces
            .get(&FaceStyle { bold, italic })
            .or_else(|| self.faces.get(&FaceStyle { bold: false, italic: false }))
            .or_else(|| {
                let mut all: Vec<_> = self.faces.iter().collect();
                all.sort_by_key(|(style, _)| (style.bold, style.italic));
                all.first().map(|(_, path)| *path)
            })
    }
}

/// Substrings of requested family names and the family they map to
const FAMILY_ALIASES: &[(&str, &str)] = &[
    ("arial", "Arial"),
    ("helvetica", "Arial"),
    ("times", "Times New Roman"),
    ("calibri", "Calibri"),
    ("cambria", "Cambria"),
    ("courier", "Courier New"),
];

/// Family registry with alias matching and optional face files
#[derive(Debug, Clone)]
pub struct FontRegistry {
    families: HashMap<String, FamilyEntry>,
    default_family: String,
}

impl FontRegistry {
    /// Registry with the standard office families mapped onto base-14 fonts
    pub fn standard() -> Self {
        let mut registry = Self {
            families: HashMap::new(),
            default_family: DEFAULT_FONT_FAMILY.to_string(),
        };
        for (name, base) in [
            ("Arial", BaseFamily::Helvetica),
            ("Calibri", BaseFamily::Helvetica),
            ("Times New Roman", BaseFamily::Times),
            ("Cambria", BaseFamily::Times),
            ("Courier New", BaseFamily::Courier),
        ] {
            registry
                .families
                .insert(name.to_lowercase(), FamilyEntry::new(name, base));
        }
        registry
    }

    /// Use another registered family as the fallback
    pub fn with_default_family(mut self, family: &str) -> Self {
        if self.families.contains_key(&family.to_lowercase()) {
            self.default_family = family.to_string();
        } else {
            debug!(family, "Default family not registered, keeping {}", self.default_family);
        }
        self
    }

    /// Register a face file for a family and style
    pub fn add_face(&mut self, family: &str, bold: bool, italic: bool, path: impl Into<PathBuf>) {
        let base = self
            .lookup(family)
            .map(|entry| entry.base)
            .unwrap_or(BaseFamily::Helvetica);
        self.families
            .entry(family.to_lowercase())
            .or_insert_with(|| FamilyEntry::new(family, base))
            .faces
            .insert(FaceStyle { bold, italic }, path.into());
    }

    /// Every registered face file
    pub fn face_files(&self) -> impl Iterator<Item = &Path> {
        self.families
            .values()
            .flat_map(|entry| entry.faces.values())
            .map(PathBuf::as_path)
    }

    fn lookup(&self, family: &str) -> Option<&FamilyEntry> {
        let key = family.trim().to_lowercase();
        if let Some(entry) = self.families.get(&key) {
            return Some(entry);
        }
        FAMILY_ALIASES
            .iter()
            .find(|(pattern, _)| key.contains(pattern))
            .and_then(|(_, canonical)| self.families.get(&canonical.to_lowercase()))
    }

    /// Scan a directory for .ttf/.otf files and register them by family name.
    ///
    /// Unreadable or unparsable files are skipped with a warning. Returns
    /// the number of faces registered.
    #[cfg(feature = "ttf-parser")]
    pub fn load_directory(&mut self, dir: &Path) -> crate::Result<usize> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let data = match std::fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable font");
                    continue;
                }
            };
            let face = match ttf_parser::Face::parse(&data, 0) {
                Ok(face) => face,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unparsable font");
                    continue;
                }
            };
            let Some(family) = face_family_name(&face) else {
                warn!(path = %path.display(), "Font has no family name, skipping");
                continue;
            };
            trace!(family = %family, path = %path.display(), "Registered font face");
            self.add_face(&family, face.is_bold(), face.is_italic(), path);
            loaded += 1;
        }

        debug!("Loaded {} font faces from {}", loaded, dir.display());
        Ok(loaded)
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontResolver for FontRegistry {
    fn resolve(&self, family: &str, bold: bool, italic: bool) -> FontHandle {
        let entry = self.lookup(family).or_else(|| {
            trace!(family, "Unknown font family, using {}", self.default_family);
            self.lookup(&self.default_family)
        });

        match entry {
            Some(entry) => FontHandle {
                family: entry.name.clone(),
                bold,
                italic,
                base: entry.base,
                file: entry.face(bold, italic).cloned(),
            },
            None => FontHandle {
                family: self.default_family.clone(),
                bold,
                italic,
                base: BaseFamily::Helvetica,
                file: None,
            },
        }
    }
}

#[cfg(feature = "ttf-parser")]
fn face_family_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    [
        ttf_parser::name_id::TYPOGRAPHIC_FAMILY,
        ttf_parser::name_id::FAMILY,
    ]
    .iter()
    .find_map(|&id| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == id)
            .find_map(|name| name.to_string())
    })
}

/// Estimates metrics from the font size alone.
///
/// Every glyph is `char_width_ratio` of the size wide (bold slightly wider)
/// and every line is ascent + descent + leading ratios of the size tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicMeasurer {
    pub char_width_ratio: f32,
    pub ascent_ratio: f32,
    pub descent_ratio: f32,
    pub leading_ratio: f32,
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self {
            char_width_ratio: DEFAULT_CHAR_WIDTH_RATIO,
            ascent_ratio: DEFAULT_ASCENT_RATIO,
            descent_ratio: DEFAULT_DESCENT_RATIO,
            leading_ratio: DEFAULT_LEADING_RATIO,
        }
    }
}

impl HeuristicMeasurer {
    fn vertical(&self, size: f32) -> TextMetrics {
        TextMetrics {
            width: 0.0,
            ascent: size * self.ascent_ratio,
            descent: size * self.descent_ratio,
            leading: size * self.leading_ratio,
        }
    }
}

impl TextMeasurer for HeuristicMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let mut width = text.chars().count() as f32 * style.size * self.char_width_ratio;
        if style.bold {
            width *= BOLD_WIDTH_FACTOR;
        }
        TextMetrics {
            width,
            ..self.vertical(style.size)
        }
    }
}

/// Metrics of one TrueType face, normalized to the em square
#[cfg(feature = "ttf-parser")]
pub(crate) struct FaceData {
    pub(crate) data: Vec<u8>,
    pub(crate) units_per_em: f32,
    pub(crate) ascender: f32,
    pub(crate) descender: f32,
    pub(crate) line_gap: f32,
}

#[cfg(feature = "ttf-parser")]
impl FaceData {
    pub(crate) fn load(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read(path)?;
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| {
            crate::LayoutError::FontError(format!("{}: {e}", path.display()))
        })?;
        let units_per_em = face.units_per_em() as f32;
        let (ascender, descender, line_gap) = (
            face.ascender() as f32,
            face.descender() as f32,
            face.line_gap() as f32,
        );
        Ok(Self {
            data,
            units_per_em,
            ascender,
            descender,
            line_gap,
        })
    }
}

/// Measures with glyph advances of registered TrueType faces.
///
/// Families without a face file (or with a face that failed to load) are
/// measured by the heuristic fallback.
#[cfg(feature = "ttf-parser")]
pub struct TtfMeasurer {
    registry: FontRegistry,
    faces: HashMap<PathBuf, FaceData>,
    fallback: HeuristicMeasurer,
}

#[cfg(feature = "ttf-parser")]
impl TtfMeasurer {
    /// Load every face file of the registry; failures are logged and skipped
    pub fn new(registry: FontRegistry) -> Self {
        let mut faces = HashMap::new();
        for path in registry.face_files() {
            match FaceData::load(path) {
                Ok(face) => {
                    faces.insert(path.to_path_buf(), face);
                }
                Err(e) => warn!(error = %e, "Font face unavailable, using estimated metrics"),
            }
        }
        Self {
            registry,
            faces,
            fallback: HeuristicMeasurer::default(),
        }
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }
}

#[cfg(feature = "ttf-parser")]
impl TextMeasurer for TtfMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let handle = self.registry.resolve(&style.family, style.bold, style.italic);
        let Some(face_data) = handle.file.as_ref().and_then(|path| self.faces.get(path)) else {
            return self.fallback.measure(text, style);
        };
        let Ok(face) = ttf_parser::Face::parse(&face_data.data, 0) else {
            return self.fallback.measure(text, style);
        };

        let scale = style.size / face_data.units_per_em;
        let width = text
            .chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|advance| advance as f32 * scale)
                    .unwrap_or(style.size * DEFAULT_CHAR_WIDTH_RATIO)
            })
            .sum();

        TextMetrics {
            width,
            ascent: face_data.ascender * scale,
            descent: -face_data.descender * scale,
            leading: face_data.line_gap * scale,
        }
    }
}

#[cfg(feature = "ttf-parser")]
impl std::fmt::Debug for TtfMeasurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtfMeasurer")
            .field("registry", &self.registry)
            .field("loaded_faces", &self.faces.len())
            .finish()
    }
}
