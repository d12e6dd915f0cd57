use crate::foundation::core::{Dimensions, Orientation, PixelBox, Rect};
use crate::foundation::math::{normalize_key, similarity};

/// Name of the template used when nothing else matches.
pub const DEFAULT_ARCHETYPE: &str = "Minimal Product Focus";

/// Minimum similarity ratio accepted by the fuzzy name match.
pub const FUZZY_MATCH_CUTOFF: f64 = 0.6;

/// Font sizes as a fraction of canvas height.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Typography {
    pub headline: f64,
    pub body: f64,
    pub cta: f64,
}

/// Normalized region boxes, each within `[0,1]^2` and pairwise disjoint.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Regions {
    pub product: Rect,
    pub headline: Rect,
    pub body: Rect,
    pub cta: Rect,
    pub logo: Rect,
    /// Thin strip for the legal disclaimer.
    pub footer: Rect,
}

impl Regions {
    pub fn all(&self) -> [(Region, Rect); 6] {
        [
            (Region::Product, self.product),
            (Region::Headline, self.headline),
            (Region::Body, self.body),
            (Region::Cta, self.cta),
            (Region::Logo, self.logo),
            (Region::Footer, self.footer),
        ]
    }

    fn get(&self, region: Region) -> Rect {
        match region {
            Region::Product => self.product,
            Region::Headline => self.headline,
            Region::Body => self.body,
            Region::Cta => self.cta,
            Region::Logo => self.logo,
            Region::Footer => self.footer,
        }
    }

    fn mirrored(self) -> Self {
        let m = |r: Rect| Rect::new(1.0 - r.x1, r.y0, 1.0 - r.x0, r.y1);
        Self {
            product: m(self.product),
            headline: m(self.headline),
            body: m(self.body),
            cta: m(self.cta),
            logo: m(self.logo),
            footer: m(self.footer),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Product,
    Headline,
    Body,
    Cta,
    Logo,
    Footer,
}

struct Archetype {
    name: &'static str,
    regions: Regions,
    typography: Typography,
}

const fn r(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
    Rect::new(x0, y0, x1, y1)
}

const FOOTER: Rect = r(0.05, 0.965, 0.95, 0.995);

const ARCHETYPES: [Archetype; 4] = [
    Archetype {
        name: "Hero Product with Stat Overlay",
        regions: Regions {
            logo: r(0.75, 0.03, 0.95, 0.12),
            product: r(0.10, 0.13, 0.90, 0.64),
            headline: r(0.05, 0.66, 0.65, 0.78),
            body: r(0.05, 0.79, 0.65, 0.87),
            cta: r(0.05, 0.88, 0.40, 0.955),
            footer: FOOTER,
        },
        typography: Typography {
            headline: 0.05,
            body: 0.025,
            cta: 0.028,
        },
    },
    Archetype {
        name: "Problem/Solution Split",
        regions: Regions {
            logo: r(0.05, 0.03, 0.25, 0.12),
            headline: r(0.05, 0.15, 0.48, 0.35),
            body: r(0.05, 0.38, 0.48, 0.65),
            cta: r(0.05, 0.70, 0.35, 0.85),
            product: r(0.50, 0.10, 0.95, 0.85),
            footer: FOOTER,
        },
        typography: Typography {
            headline: 0.042,
            body: 0.025,
            cta: 0.028,
        },
    },
    Archetype {
        name: "Lifestyle Context Shot",
        regions: Regions {
            logo: r(0.75, 0.03, 0.95, 0.12),
            headline: r(0.05, 0.08, 0.70, 0.25),
            body: r(0.05, 0.28, 0.55, 0.45),
            cta: r(0.05, 0.50, 0.35, 0.62),
            product: r(0.55, 0.50, 0.95, 0.95),
            footer: FOOTER,
        },
        typography: Typography {
            headline: 0.048,
            body: 0.025,
            cta: 0.028,
        },
    },
    Archetype {
        name: DEFAULT_ARCHETYPE,
        regions: Regions {
            logo: r(0.40, 0.02, 0.60, 0.10),
            product: r(0.20, 0.12, 0.80, 0.62),
            headline: r(0.10, 0.64, 0.90, 0.76),
            body: r(0.15, 0.77, 0.85, 0.86),
            cta: r(0.30, 0.87, 0.70, 0.955),
            footer: FOOTER,
        },
        typography: Typography {
            headline: 0.04,
            body: 0.025,
            cta: 0.028,
        },
    },
];

const PORTRAIT: Regions = Regions {
    logo: r(0.30, 0.02, 0.70, 0.07),
    product: r(0.08, 0.08, 0.92, 0.54),
    headline: r(0.06, 0.56, 0.94, 0.69),
    body: r(0.08, 0.70, 0.92, 0.82),
    cta: r(0.22, 0.84, 0.78, 0.93),
    footer: FOOTER,
};

// Product on the left; mirrored when the archetype places it on the right.
const LANDSCAPE: Regions = Regions {
    product: r(0.03, 0.06, 0.45, 0.94),
    logo: r(0.74, 0.04, 0.96, 0.16),
    headline: r(0.50, 0.18, 0.96, 0.40),
    body: r(0.50, 0.42, 0.96, 0.62),
    cta: r(0.50, 0.66, 0.80, 0.82),
    footer: r(0.48, 0.90, 0.97, 0.985),
};

/// How a requested archetype name was matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeMatch {
    Exact,
    Normalized,
    Fuzzy,
    Default,
}

/// Region layout for one composed asset.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutDirective {
    pub archetype: String,
    pub matched_by: ArchetypeMatch,
    pub orientation: Orientation,
    pub dimensions: Dimensions,
    pub regions: Regions,
    pub typography: Typography,
}

impl LayoutDirective {
    /// Region scaled to the channel's pixels (floor semantics).
    pub fn pixel_box(&self, region: Region) -> PixelBox {
        PixelBox::from_normalized(self.regions.get(region), self.dimensions)
    }

    pub fn headline_px(&self) -> f32 {
        self.font_px(self.typography.headline)
    }

    pub fn body_px(&self) -> f32 {
        self.font_px(self.typography.body)
    }

    pub fn cta_px(&self) -> f32 {
        self.font_px(self.typography.cta)
    }

    fn font_px(&self, ratio: f64) -> f32 {
        ((ratio * f64::from(self.dimensions.height)) as f32).max(1.0)
    }
}

fn find_archetype(requested: &str) -> (&'static Archetype, ArchetypeMatch) {
    if let Some(a) = ARCHETYPES.iter().find(|a| a.name == requested) {
        return (a, ArchetypeMatch::Exact);
    }

    let key = normalize_key(requested);
    if let Some(a) = ARCHETYPES.iter().find(|a| normalize_key(a.name) == key) {
        return (a, ArchetypeMatch::Normalized);
    }

    let best = ARCHETYPES
        .iter()
        .map(|a| (a, similarity(&key, &normalize_key(a.name))))
        .filter(|(_, s)| *s >= FUZZY_MATCH_CUTOFF)
        .max_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((a, _)) = best {
        return (a, ArchetypeMatch::Fuzzy);
    }

    let default = ARCHETYPES
        .iter()
        .find(|a| a.name == DEFAULT_ARCHETYPE)
        .unwrap_or(&ARCHETYPES[ARCHETYPES.len() - 1]);
    (default, ArchetypeMatch::Default)
}

/// Resolve an archetype name to a concrete region layout for `dims`.
///
/// Unknown names fall back to [`DEFAULT_ARCHETYPE`]. Portrait channels stack the text regions
/// under the product; landscape channels use a two-column split that keeps the archetype's
/// product side.
pub fn resolve_layout(requested: &str, dims: Dimensions) -> LayoutDirective {
    let (arch, matched_by) = find_archetype(requested);
    if matched_by == ArchetypeMatch::Default {
        tracing::warn!(requested, fallback = arch.name, "unknown layout archetype");
    }

    let orientation = dims.orientation();
    let regions = match orientation {
        Orientation::Balanced => arch.regions,
        Orientation::Portrait => PORTRAIT,
        Orientation::Landscape => {
            let p = arch.regions.product;
            if (p.x0 + p.x1) / 2.0 > 0.5 {
                LANDSCAPE.mirrored()
            } else {
                LANDSCAPE
            }
        }
    };

    LayoutDirective {
        archetype: arch.name.to_string(),
        matched_by,
        orientation,
        dimensions: dims,
        regions,
        typography: arch.typography,
    }
}

/// Names of every built-in archetype.
pub fn archetype_names() -> impl Iterator<Item = &'static str> {
    ARCHETYPES.iter().map(|a| a.name)
}

#[cfg(test)]
#[path = "../../tests/unit/layout/archetypes.rs"]
mod tests;
