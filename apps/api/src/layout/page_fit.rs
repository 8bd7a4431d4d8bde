//! Height estimation and deterministic page-fit trimming.
//!
//! # Trim policy
//! While the page overflows, drop the last bullet of the oldest experience
//! entry (by parsed start date, ties in entry order, undated entries last)
//! that still has two or more bullets. Headers, titles, contact lines and
//! links are never touched. When nothing is left to trim the layout is
//! returned with `fits = false`.
//!
//! Rendering is CPU-bound; async callers run it inside `spawn_blocking`.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use crate::canonical::dates::parse_resume_date;
use crate::layout::blocks::{emit_blocks, LayoutBlock, StyleTag};
use crate::layout::font_metrics::get_metrics;
use crate::layout::template::TemplateConfig;
use crate::merge::MergedResume;
use crate::models::resume::SectionKey;

/// Vertical space added once per emitted section.
pub const SECTION_SPACING_PT: f32 = 6.0;
/// Line height as a multiple of font size.
pub const LINE_HEIGHT: f32 = 1.2;

const FIT_TOLERANCE_PT: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimmedBullet {
    /// Experience entry index, canonical order.
    pub entry: usize,
    pub company: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub blocks: Vec<LayoutBlock>,
    pub fits: bool,
    pub total_height: f32,
    pub page_budget: f32,
    /// Bullets removed to fit, in removal order.
    pub trimmed: Vec<TrimmedBullet>,
}

/// Renders `resume` with `template` against a one-page budget.
pub fn render(resume: &MergedResume, template: &TemplateConfig) -> Layout {
    render_with_budget(resume, template, template.page_budget())
}

/// Renders against an explicit height budget in points.
pub fn render_with_budget(resume: &MergedResume, template: &TemplateConfig, budget: f32) -> Layout {
    let mut blocks = emit_blocks(resume, template);
    for block in &mut blocks {
        block.height = estimate_height(&block.text, block.style, template);
    }

    let spacing = section_count(&blocks) as f32 * SECTION_SPACING_PT;
    let mut total = blocks.iter().map(|b| b.height).sum::<f32>() + spacing;
    let trim_order = trim_order(resume);
    let mut trimmed = Vec::new();

    while total > budget + FIT_TOLERANCE_PT {
        let Some(entry) = trim_order
            .iter()
            .copied()
            .find(|&entry| bullet_count(&blocks, entry) >= 2)
        else {
            break;
        };
        let Some(pos) = blocks
            .iter()
            .rposition(|b| b.is_trimmable() && b.owner.entry == Some(entry))
        else {
            break;
        };

        let removed = blocks.remove(pos);
        total -= removed.height;
        trimmed.push(TrimmedBullet {
            entry,
            company: resume.experience[entry].company.clone(),
            text: removed.text,
        });
    }

    let fits = total <= budget + FIT_TOLERANCE_PT;
    if fits {
        debug!(
            total_height = total,
            budget,
            trimmed = trimmed.len(),
            "Layout fits page budget"
        );
    } else {
        warn!(
            total_height = total,
            budget,
            trimmed = trimmed.len(),
            "Layout overflows page budget after trimming"
        );
    }

    Layout {
        blocks,
        fits,
        total_height: total,
        page_budget: budget,
        trimmed,
    }
}

/// Height of one block: wrapped line count × line height + paragraph spacing.
pub fn estimate_height(text: &str, style: StyleTag, template: &TemplateConfig) -> f32 {
    let size = template.font_size * style.size_factor();
    let width_em = (template.text_width_pt() - style.indent_pt()) / size;
    let lines = get_metrics(template.font).estimated_lines(text, width_em);
    lines as f32 * size * LINE_HEIGHT + style.space_after_pt()
}

/// Experience entry indices, oldest start date first. Stable, so equal dates
/// keep entry order; entries without a parseable start date come last.
fn trim_order(resume: &MergedResume) -> Vec<usize> {
    let dates: Vec<_> = resume
        .experience
        .iter()
        .map(|e| parse_resume_date(&e.start_date))
        .collect();
    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by(|&a, &b| match (dates[a], dates[b]) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order
}

fn bullet_count(blocks: &[LayoutBlock], entry: usize) -> usize {
    blocks
        .iter()
        .filter(|b| b.is_trimmable() && b.owner.entry == Some(entry))
        .count()
}

fn section_count(blocks: &[LayoutBlock]) -> usize {
    let mut sections: Vec<SectionKey> = blocks.iter().map(|b| b.owner.section).collect();
    sections.dedup();
    sections.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::validate;
    use crate::merge::merge;
    use crate::models::resume::{ContactInfo, ExperienceEntry, StructuredGuess};

    const BULLET: &str = "Delivered the quarterly platform roadmap";

    fn entry(company: &str, start: &str, bullets: usize) -> ExperienceEntry {
        ExperienceEntry {
            company: company.to_string(),
            position: "Engineer".to_string(),
            start_date: start.to_string(),
            achievements: vec![BULLET.to_string(); bullets],
            ..Default::default()
        }
    }

    fn resume(experience: Vec<ExperienceEntry>) -> MergedResume {
        let guess = StructuredGuess {
            contact_info: ContactInfo {
                full_name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                ..Default::default()
            },
            experience,
            ..Default::default()
        };
        with_github_link(guess)
    }

    fn with_github_link(mut guess: StructuredGuess) -> MergedResume {
        guess
            .links
            .insert("GitHub".to_string(), "github.com/jane".to_string());
        merge(&validate("", guess).unwrap(), None)
    }

    /// Career listed newest first, as resumes usually are.
    fn four_entries() -> MergedResume {
        resume(vec![
            entry("D", "2023-01", 3),
            entry("C", "2020-01", 3),
            entry("B", "2018-01", 3),
            entry("A", "2015-01", 3),
        ])
    }

    fn bullet_height(template: &TemplateConfig) -> f32 {
        estimate_height(BULLET, StyleTag::Bullet, template)
    }

    /// A budget that forces exactly `k` bullet removals.
    fn budget_for_removals(resume: &MergedResume, template: &TemplateConfig, k: usize) -> f32 {
        let full = render_with_budget(resume, template, f32::MAX).total_height;
        let h = bullet_height(template);
        full - k as f32 * h + h / 2.0
    }

    fn bullets_left(layout: &Layout, resume: &MergedResume) -> Vec<(String, usize)> {
        resume
            .experience
            .iter()
            .enumerate()
            .map(|(i, e)| (e.company.clone(), bullet_count(&layout.blocks, i)))
            .collect()
    }

    #[test]
    fn test_harvard_short_resume_fits() {
        let r = four_entries();
        let layout = render(&r, &TemplateConfig::harvard());
        assert!(layout.fits);
        assert!(layout.trimmed.is_empty());
        assert!((layout.page_budget - 648.0).abs() < 1e-3);
    }

    #[test]
    fn test_height_estimate_is_lines_times_leading_plus_spacing() {
        let t = TemplateConfig::harvard();
        let h = estimate_height("Short line", StyleTag::Body, &t);
        assert!((h - (11.0 * 1.2 + 2.0)).abs() < 1e-3);

        let long = "word ".repeat(200);
        let h = estimate_height(&long, StyleTag::Body, &t);
        assert!(h > 3.0 * 11.0 * 1.2);
    }

    #[test]
    fn test_total_includes_section_spacing() {
        let r = resume(vec![entry("A", "2015-01", 1)]);
        let t = TemplateConfig::harvard();
        let layout = render(&r, &t);
        let blocks_sum: f32 = layout.blocks.iter().map(|b| b.height).sum();
        // contact_info, links, experience, languages
        assert!((layout.total_height - (blocks_sum + 4.0 * SECTION_SPACING_PT)).abs() < 1e-3);
    }

    #[test]
    fn test_trims_oldest_entries_first() {
        let r = four_entries();
        let t = TemplateConfig::harvard();

        let layout = render_with_budget(&r, &t, budget_for_removals(&r, &t, 3));
        assert!(layout.fits);
        assert_eq!(layout.trimmed.len(), 3);
        assert_eq!(
            bullets_left(&layout, &r),
            vec![
                ("D".to_string(), 3),
                ("C".to_string(), 3),
                ("B".to_string(), 2),
                ("A".to_string(), 1),
            ]
        );

        let layout = render_with_budget(&r, &t, budget_for_removals(&r, &t, 5));
        assert!(layout.fits);
        let companies: Vec<&str> = layout.trimmed.iter().map(|b| b.company.as_str()).collect();
        assert_eq!(companies, vec!["A", "A", "B", "B", "C"]);
        assert_eq!(
            bullets_left(&layout, &r),
            vec![
                ("D".to_string(), 3),
                ("C".to_string(), 2),
                ("B".to_string(), 1),
                ("A".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_equal_dates_keep_entry_order_and_undated_go_last() {
        let r = resume(vec![
            entry("Undated", "", 2),
            entry("First", "2018-01", 2),
            entry("Second", "Jan 2018", 2),
        ]);
        assert_eq!(trim_order(&r), vec![1, 2, 0]);
    }

    #[test]
    fn test_overflow_keeps_one_bullet_and_all_headers() {
        let r = four_entries();
        let t = TemplateConfig::harvard();
        let untrimmed = render_with_budget(&r, &t, f32::MAX);
        let layout = render_with_budget(&r, &t, 50.0);

        assert!(!layout.fits);
        assert_eq!(layout.trimmed.len(), 8);
        assert!(bullets_left(&layout, &r).iter().all(|(_, n)| *n == 1));

        let kept_non_bullets: Vec<&LayoutBlock> =
            layout.blocks.iter().filter(|b| !b.is_trimmable()).collect();
        let all_non_bullets: Vec<&LayoutBlock> =
            untrimmed.blocks.iter().filter(|b| !b.is_trimmable()).collect();
        assert_eq!(kept_non_bullets, all_non_bullets);
        assert!(layout
            .blocks
            .iter()
            .any(|b| b.style == StyleTag::Contact && b.text.starts_with("GitHub")));
    }

    #[test]
    fn test_single_bullet_entries_are_never_emptied() {
        let r = resume(vec![entry("A", "2015-01", 1), entry("B", "2016-01", 1)]);
        let layout = render_with_budget(&r, &TemplateConfig::harvard(), 10.0);
        assert!(!layout.fits);
        assert!(layout.trimmed.is_empty());
    }
}
