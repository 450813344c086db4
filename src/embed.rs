//! TrueType faces embedded as composite fonts
//!
//! A registered face is written once per document as a Type0 font with an
//! Identity-H encoding over a CIDFontType2 descendant. Shown strings are the
//! big-endian glyph ids of each character, so any script the face covers
//! renders as-is. Widths and the ToUnicode map cover the glyphs actually
//! drawn.

use crate::Result;
use crate::error::LayoutError;
use crate::font::FaceData;
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

/// Glyph ids per `beginbfchar` block; the CMap format caps blocks at 100
const CMAP_BLOCK: usize = 100;

pub(crate) struct EmbeddedFace {
    face: FaceData,
    /// Drawn glyph ids and the character each one stands for
    used: BTreeMap<u16, char>,
}

impl EmbeddedFace {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            face: FaceData::load(path)?,
            used: BTreeMap::new(),
        })
    }

    fn parse(&self) -> Result<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.face.data, 0)
            .map_err(|e| LayoutError::FontError(e.to_string()))
    }

    /// Two bytes per character; characters the face lacks map to glyph 0
    pub(crate) fn encode(&mut self, text: &str) -> Result<Vec<u8>> {
        let glyphs: Vec<(char, u16)> = {
            let face = self.parse()?;
            text.chars()
                .map(|ch| (ch, face.glyph_index(ch).map(|g| g.0).unwrap_or(0)))
                .collect()
        };
        let mut bytes = Vec::with_capacity(glyphs.len() * 2);
        for (ch, glyph_id) in glyphs {
            if glyph_id == 0 {
                trace!(?ch, "No glyph in face");
            } else {
                self.used.entry(glyph_id).or_insert(ch);
            }
            bytes.extend_from_slice(&glyph_id.to_be_bytes());
        }
        Ok(bytes)
    }

    /// Write the font objects, placing the Type0 dictionary at `font_id`
    pub(crate) fn write(
        self,
        doc: &mut Document,
        font_id: ObjectId,
        fallback_name: &str,
    ) -> Result<()> {
        let face = self.parse()?;
        let units_per_em = self.face.units_per_em;
        let scale = |v: f32| (v * 1000.0 / units_per_em).round() as i64;

        let base_font = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let bbox = face.global_bounding_box();
        let mut flags: i64 = 32;
        if face.is_monospaced() {
            flags |= 1;
        }
        if face.is_italic() {
            flags |= 64;
        }
        let ascent = scale(self.face.ascender);
        let cap_height = face
            .capital_height()
            .map(|h| scale(h as f32))
            .unwrap_or(ascent);

        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.face.data.len() as i64 },
            self.face.data.clone(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.as_str(),
            "Flags" => flags,
            "ItalicAngle" => if face.is_italic() { -12 } else { 0 },
            "Ascent" => ascent,
            "Descent" => scale(self.face.descender),
            "CapHeight" => cap_height,
            "StemV" => 80,
            "FontBBox" => vec![
                scale(bbox.x_min as f32).into(),
                scale(bbox.y_min as f32).into(),
                scale(bbox.x_max as f32).into(),
                scale(bbox.y_max as f32).into(),
            ],
            "FontFile2" => font_file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for &glyph_id in self.used.keys() {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(glyph_id))
                .unwrap_or(0);
            widths.push(Object::Integer(glyph_id.into()));
            widths.push(Object::Array(vec![scale(advance as f32).into()]));
        }
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.as_str(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "CIDToGIDMap" => "Identity",
            "DW" => 1000,
            "W" => widths,
        });

        let to_unicode_id =
            doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&self.used)));
        doc.objects.insert(
            font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => base_font.as_str(),
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(cid_font_id)],
                "ToUnicode" => to_unicode_id,
            }),
        );
        trace!(%base_font, glyphs = self.used.len(), id = ?font_id, "Embedded font");
        Ok(())
    }
}

/// CMap mapping drawn glyph ids back to Unicode for text extraction
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for block in entries.chunks(CMAP_BLOCK) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph_id, ch) in block {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            cmap.push_str(&format!("<{glyph_id:04X}> <{utf16}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}
