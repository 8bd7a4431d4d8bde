//! Template configuration: font, margins, section order and titles.
//!
//! Loaded once at startup and shared read-only behind an `Arc`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::font_metrics::FontFamily;
use crate::models::resume::SectionKey;

/// US Letter, in points.
pub const PAGE_WIDTH_PT: f32 = 612.0;
pub const PAGE_HEIGHT_PT: f32 = 792.0;
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("section_order must list each of the nine sections exactly once (missing: {missing:?}, duplicated: {duplicated:?})")]
    NotAPermutation {
        missing: Vec<SectionKey>,
        duplicated: Vec<SectionKey>,
    },

    #[error("font_size must be positive, got {0}")]
    FontSize(f32),

    #[error("margins leave no printable area")]
    NoPrintableArea,
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub font: FontFamily,
    /// Body font size in points.
    pub font_size: f32,
    pub margins: Margins,
    pub section_order: Vec<SectionKey>,
    /// Partial override of section display titles.
    #[serde(default)]
    pub section_titles: BTreeMap<SectionKey, String>,
}

impl TemplateConfig {
    /// Harvard default: Times New Roman 11pt, 1" margins.
    pub fn harvard() -> Self {
        TemplateConfig {
            font: FontFamily::TimesNewRoman,
            font_size: 11.0,
            margins: Margins {
                top: 1.0,
                bottom: 1.0,
                left: 1.0,
                right: 1.0,
            },
            section_order: vec![
                SectionKey::ContactInfo,
                SectionKey::Links,
                SectionKey::Summary,
                SectionKey::Education,
                SectionKey::Experience,
                SectionKey::Projects,
                SectionKey::Skills,
                SectionKey::Certifications,
                SectionKey::Languages,
            ],
            section_titles: BTreeMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let template: TemplateConfig = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let json = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.font_size.is_nan() || self.font_size <= 0.0 {
            return Err(TemplateError::FontSize(self.font_size));
        }

        let mut seen = HashSet::new();
        let duplicated: Vec<SectionKey> = self
            .section_order
            .iter()
            .copied()
            .filter(|key| !seen.insert(*key))
            .collect();
        let missing: Vec<SectionKey> = SectionKey::ALL
            .into_iter()
            .filter(|key| !seen.contains(key))
            .collect();
        if !missing.is_empty() || !duplicated.is_empty() {
            return Err(TemplateError::NotAPermutation {
                missing,
                duplicated,
            });
        }

        let m = &self.margins;
        let margins_ok = [m.top, m.bottom, m.left, m.right]
            .iter()
            .all(|v| *v >= 0.0);
        if !margins_ok || self.page_budget() <= 0.0 || self.text_width_pt() <= 0.0 {
            return Err(TemplateError::NoPrintableArea);
        }
        Ok(())
    }

    /// Display title for a section: the override if present, else the default label.
    pub fn title_for(&self, key: SectionKey) -> &str {
        self.section_titles
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_title())
    }

    /// Printable height of one page, in points.
    pub fn page_budget(&self) -> f32 {
        PAGE_HEIGHT_PT - (self.margins.top + self.margins.bottom) * POINTS_PER_INCH
    }

    /// Printable width of one page, in points.
    pub fn text_width_pt(&self) -> f32 {
        PAGE_WIDTH_PT - (self.margins.left + self.margins.right) * POINTS_PER_INCH
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::harvard()
    }
}
