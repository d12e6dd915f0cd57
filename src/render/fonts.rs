use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::foundation::error::{AdError, AdResult};

/// One entry of a font fallback chain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FontSource {
    /// TTF/OTF file on disk.
    File { path: PathBuf },
    /// Family looked up in the system font database.
    System { family: String },
    /// Font bytes supplied in memory.
    #[serde(skip)]
    Bytes { label: String, data: Arc<[u8]> },
}

impl FontSource {
    pub fn label(&self) -> String {
        match self {
            Self::File { path } => path.display().to_string(),
            Self::System { family } => format!("system:{family}"),
            Self::Bytes { label, .. } => label.clone(),
        }
    }
}

/// Chain used when the configuration does not name fonts.
pub fn default_font_chain() -> Vec<FontSource> {
    ["DejaVu Sans", "Liberation Sans", "Noto Sans", "Arial", "Helvetica"]
        .into_iter()
        .map(|family| FontSource::System {
            family: family.to_string(),
        })
        .collect()
}

/// A font whose bytes were loaded and accepted by the shaper.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    pub label: String,
    pub family_name: String,
    pub data: Arc<Vec<u8>>,
    pub index: u32,
}

/// The face used for all text in a process.
#[derive(Clone, Debug)]
pub enum FontFace {
    Loaded(LoadedFont),
    /// Fixed-advance block face that needs no font file.
    Builtin,
}

/// Result of resolving a fallback chain once: the first usable face, plus what was skipped.
#[derive(Clone, Debug)]
pub struct FontBook {
    face: FontFace,
    skipped: Vec<String>,
}

impl FontBook {
    /// Walk `chain` in order and keep the first source whose bytes load and shape.
    ///
    /// Never fails: the built-in face terminates every chain.
    #[tracing::instrument(skip(chain), fields(sources = chain.len()))]
    pub fn resolve(chain: &[FontSource]) -> Self {
        let mut skipped = Vec::new();
        let mut system_db: Option<usvg::fontdb::Database> = None;

        for source in chain {
            match load_source(source, &mut system_db).and_then(|(data, index)| {
                let family_name = read_family_name(&data)?;
                Ok(LoadedFont {
                    label: source.label(),
                    family_name,
                    data: Arc::new(data),
                    index,
                })
            }) {
                Ok(font) => {
                    tracing::debug!(font = %font.label, family = %font.family_name, "resolved font");
                    return Self {
                        face: FontFace::Loaded(font),
                        skipped,
                    };
                }
                Err(err) => {
                    tracing::debug!(font = %source.label(), error = %err, "font source unavailable");
                    skipped.push(source.label());
                }
            }
        }

        tracing::warn!(
            skipped = skipped.len(),
            "no font in the fallback chain was usable; using the built-in face"
        );
        Self {
            face: FontFace::Builtin,
            skipped,
        }
    }

    pub fn builtin_only() -> Self {
        Self {
            face: FontFace::Builtin,
            skipped: Vec::new(),
        }
    }

    /// Process-wide book built from [`default_font_chain`] on first use.
    pub fn process_default() -> Arc<FontBook> {
        static BOOK: OnceLock<Arc<FontBook>> = OnceLock::new();
        BOOK.get_or_init(|| Arc::new(FontBook::resolve(&default_font_chain())))
            .clone()
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, FontFace::Builtin)
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

fn load_source(
    source: &FontSource,
    system_db: &mut Option<usvg::fontdb::Database>,
) -> AdResult<(Vec<u8>, u32)> {
    match source {
        FontSource::File { path } => {
            let data = std::fs::read(path)
                .map_err(|e| AdError::configuration(format!("read font '{}': {e}", path.display())))?;
            Ok((data, 0))
        }
        FontSource::Bytes { data, .. } => Ok((data.to_vec(), 0)),
        FontSource::System { family } => {
            let db = system_db.get_or_insert_with(|| {
                let mut db = usvg::fontdb::Database::new();
                db.load_system_fonts();
                db
            });
            let families = [usvg::fontdb::Family::Name(family.as_str())];
            let query = usvg::fontdb::Query {
                families: &families,
                ..usvg::fontdb::Query::default()
            };
            let id = db.query(&query).ok_or_else(|| {
                AdError::configuration(format!("system font family '{family}' not installed"))
            })?;
            db.with_face_data(id, |data, index| (data.to_vec(), index))
                .ok_or_else(|| AdError::configuration(format!("font data for '{family}' unavailable")))
        }
    }
}

/// Register the bytes with a scratch collection to confirm they contain a usable family.
fn read_family_name(data: &[u8]) -> AdResult<String> {
    let mut ctx = parley::FontContext::default();
    let families = ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(data.to_vec()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| AdError::configuration("no font families registered from font bytes"))?;
    ctx.collection
        .family_name(family_id)
        .map(str::to_string)
        .ok_or_else(|| AdError::configuration("registered font family has no name"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/fonts.rs"]
mod tests;
