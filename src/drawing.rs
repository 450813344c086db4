//! PDF output through lopdf
//!
//! [`PdfSink`] turns drawing commands into content stream operations. Page
//! coordinates arrive with a top-left origin and are flipped to PDF's
//! bottom-left origin here. Families with a registered face file are
//! embedded and shown as glyph ids; the rest use the standard Type1 fonts
//! with WinAnsiEncoding.

use crate::Result;
use crate::error::LayoutError;
#[cfg(feature = "ttf-parser")]
use crate::embed::EmbeddedFace;
use crate::font::{FontHandle, FontRegistry, FontResolver};
use crate::resources::ImageHandle;
use crate::sink::{DrawCommand, ImageCommand, LineCommand, PageSink, TextCommand};
use crate::style::{Color, DashStyle};
use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream, StringFormat,
    content::{Content, Operation},
    dictionary,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
#[cfg(feature = "ttf-parser")]
use std::path::PathBuf;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FontKey {
    /// Standard Type1 font by BaseFont name
    Base(&'static str),
    /// Face file embedded as a Type0 font
    #[cfg(feature = "ttf-parser")]
    Embedded(PathBuf),
}

struct OpenPage {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
    fonts: BTreeMap<String, ObjectId>,
    xobjects: BTreeMap<String, ObjectId>,
}

impl OpenPage {
    fn flip(&self, y: f32) -> f32 {
        self.height - y
    }
}

/// Page sink writing a lopdf document
pub struct PdfSink {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    resolver: Box<dyn FontResolver>,
    /// Resource name and font object of each font used so far
    fonts: HashMap<FontKey, (String, ObjectId)>,
    /// Face files tried for embedding; `None` when loading failed
    #[cfg(feature = "ttf-parser")]
    faces: HashMap<PathBuf, Option<EmbeddedFace>>,
    /// Image id to resource name and XObject
    images: HashMap<usize, Option<(String, ObjectId)>>,
    open: Option<OpenPage>,
}

impl Default for PdfSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfSink {
    pub fn new() -> Self {
        Self::with_resolver(FontRegistry::standard())
    }

    pub fn with_resolver(resolver: impl FontResolver + 'static) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            resolver: Box::new(resolver),
            fonts: HashMap::new(),
            #[cfg(feature = "ttf-parser")]
            faces: HashMap::new(),
            images: HashMap::new(),
            open: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Embedded face when the handle has a loadable file, base-14 otherwise
    fn font_key(&mut self, handle: &FontHandle) -> FontKey {
        #[cfg(feature = "ttf-parser")]
        {
            if let Some(path) = handle.file.as_ref().filter(|path| self.embed_face(path)) {
                return FontKey::Embedded(path.clone());
            }
        }
        FontKey::Base(handle.pdf_base_font())
    }

    /// Load a face file once; a failure is logged and remembered
    #[cfg(feature = "ttf-parser")]
    fn embed_face(&mut self, path: &Path) -> bool {
        if let Some(entry) = self.faces.get(path) {
            return entry.is_some();
        }
        let face = match EmbeddedFace::load(path) {
            Ok(face) => {
                let name = format!("F{}", self.fonts.len() + 1);
                let id = self.doc.new_object_id();
                debug!(path = %path.display(), id = ?id, "Embedding font face");
                self.fonts.insert(FontKey::Embedded(path.to_path_buf()), (name, id));
                Some(face)
            }
            Err(e) => {
                warn!(error = %e, "Font face not embeddable, using a standard font");
                None
            }
        };
        let loaded = face.is_some();
        self.faces.insert(path.to_path_buf(), face);
        loaded
    }

    fn font_resource(&mut self, key: &FontKey) -> Result<(String, ObjectId)> {
        if let Some(entry) = self.fonts.get(key) {
            return Ok(entry.clone());
        }
        let base = match key {
            FontKey::Base(base) => *base,
            #[cfg(feature = "ttf-parser")]
            FontKey::Embedded(path) => {
                return Err(LayoutError::FontError(format!("{} was not loaded", path.display())));
            }
        };
        let name = format!("F{}", self.fonts.len() + 1);
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
            "Encoding" => "WinAnsiEncoding",
        });
        trace!(base, id = ?id, "Added font");
        self.fonts.insert(key.clone(), (name.clone(), id));
        Ok((name, id))
    }

    /// String operand of `Tj` for the font
    fn encode(&mut self, key: &FontKey, text: &str) -> Result<Object> {
        match key {
            FontKey::Base(_) => Ok(Object::String(encode_win_ansi(text), StringFormat::Literal)),
            #[cfg(feature = "ttf-parser")]
            FontKey::Embedded(path) => {
                let face = self
                    .faces
                    .get_mut(path)
                    .and_then(Option::as_mut)
                    .ok_or_else(|| LayoutError::FontError(path.display().to_string()))?;
                Ok(Object::String(face.encode(text)?, StringFormat::Hexadecimal))
            }
        }
    }

    fn image_resource(&mut self, image: &ImageHandle) -> Option<(String, ObjectId)> {
        let doc = &mut self.doc;
        self.images
            .entry(image.id)
            .or_insert_with(|| match lopdf::xobject::image_from(image.bytes.to_vec()) {
                Ok(stream) => {
                    let id = doc.add_object(stream);
                    Some((format!("Im{}", image.id), id))
                }
                Err(e) => {
                    warn!(image = image.id, "Skipping image that cannot be embedded: {e}");
                    None
                }
            })
            .clone()
    }

    fn draw_text(&mut self, text: &TextCommand) -> Result<()> {
        if text.text.is_empty() {
            return Ok(());
        }
        let style = &text.style;
        let handle = self.resolver.resolve(&style.family, style.bold, style.italic);
        let key = self.font_key(&handle);
        let (name, id) = self.font_resource(&key)?;
        let shown = self.encode(&key, &text.text)?;
        let page = self.page_mut()?;
        page.fonts.insert(name.clone(), id);
        let y = page.flip(text.baseline);

        page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(name.into_bytes()), style.size.into()]),
            fill_color(style.color),
            Operation::new("Td", vec![text.x.into(), y.into()]),
            Operation::new("Tj", vec![shown]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn draw_line(&mut self, line: &LineCommand) -> Result<()> {
        let page = self.page_mut()?;
        let (from_y, to_y) = (page.flip(line.from.y), page.flip(line.to.y));
        let dash: Vec<Object> = match line.dash {
            DashStyle::Solid => Vec::new(),
            DashStyle::Dashed => vec![3.0f32.into(), 2.0f32.into()],
            DashStyle::Dotted => vec![1.0f32.into(), 1.0f32.into()],
        };
        page.operations.extend([
            Operation::new("q", vec![]),
            stroke_color(line.color),
            Operation::new("w", vec![line.width.into()]),
            Operation::new("d", vec![Object::Array(dash), 0.into()]),
            Operation::new("m", vec![line.from.x.into(), from_y.into()]),
            Operation::new("l", vec![line.to.x.into(), to_y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageCommand) -> Result<()> {
        let Some((name, id)) = self.image_resource(&image.image) else {
            return Ok(());
        };
        let page = self.page_mut()?;
        page.xobjects.insert(name.clone(), id);
        let rect = image.rect;
        let bottom = page.flip(rect.bottom());
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    rect.width.into(),
                    0.into(),
                    0.into(),
                    rect.height.into(),
                    rect.x.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn page_mut(&mut self) -> Result<&mut OpenPage> {
        self.open
            .as_mut()
            .ok_or_else(|| LayoutError::SinkError("draw outside a page".to_string()))
    }

    /// Close the page tree and return the document
    #[instrument(skip_all, fields(pages = self.page_ids.len()))]
    pub fn finish(mut self) -> Result<Document> {
        if self.open.is_some() {
            return Err(LayoutError::SinkError("page left open".to_string()));
        }
        #[cfg(feature = "ttf-parser")]
        for (path, face) in std::mem::take(&mut self.faces) {
            let Some(face) = face else { continue };
            let Some((name, id)) = self.fonts.get(&FontKey::Embedded(path)) else {
                continue;
            };
            face.write(&mut self.doc, *id, &format!("Embedded{name}"))?;
        }
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        debug!("Finished PDF with {} pages", self.page_ids.len());
        Ok(self.doc)
    }

    /// Serialized PDF bytes
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut doc = self.finish()?;
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn save(self, path: &Path) -> Result<()> {
        let mut doc = self.finish()?;
        doc.save(path)?;
        Ok(())
    }
}

impl PageSink for PdfSink {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<()> {
        if self.open.is_some() {
            return Err(LayoutError::SinkError("page begun twice".to_string()));
        }
        self.open = Some(OpenPage {
            width,
            height,
            operations: Vec::new(),
            fonts: BTreeMap::new(),
            xobjects: BTreeMap::new(),
        });
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        match command {
            DrawCommand::Text(text) => self.draw_text(text),
            DrawCommand::Line(line) => self.draw_line(line),
            DrawCommand::FillRect { rect, color } => {
                let page = self.page_mut()?;
                let y = page.flip(rect.bottom());
                page.operations.extend([
                    fill_color(*color),
                    Operation::new(
                        "re",
                        vec![rect.x.into(), y.into(), rect.width.into(), rect.height.into()],
                    ),
                    Operation::new("f", vec![]),
                ]);
                Ok(())
            }
            DrawCommand::Image(image) => self.draw_image(image),
        }
    }

    fn end_page(&mut self) -> Result<()> {
        let page = self
            .open
            .take()
            .ok_or_else(|| LayoutError::SinkError("no page to end".to_string()))?;

        let operation_count = page.operations.len();
        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut resources = Dictionary::new();
        if !page.fonts.is_empty() {
            resources.set("Font", references(page.fonts));
        }
        if !page.xobjects.is_empty() {
            resources.set("XObject", references(page.xobjects));
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        trace!(page = self.page_ids.len(), operation_count, "Wrote page");
        Ok(())
    }
}

fn references(entries: BTreeMap<String, ObjectId>) -> Dictionary {
    let mut dict = Dictionary::new();
    for (name, id) in entries {
        dict.set(name.into_bytes(), id);
    }
    dict
}

fn fill_color(color: Color) -> Operation {
    Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()])
}

fn stroke_color(color: Color) -> Operation {
    Operation::new("RG", vec![color.r.into(), color.g.into(), color.b.into()])
}

/// Encode text for a WinAnsiEncoding font; unmapped characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            c if (c as u32) < 0x80 || (0xa0..=0xff).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
