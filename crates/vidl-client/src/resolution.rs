//! Default format selection from a probed format list.
//!
//! Everything here is a pure function of its input except [`FormatChoice`],
//! which remembers whether a value has already been chosen so automatic
//! selection fires at most once.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use vidl_core::Format;

pub const DEFAULT_TARGET_HEIGHT: u32 = 1080;

fn dimensions_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)x(\d+)").expect("static dimensions pattern"))
}

fn dimensions(resolution: &str) -> Option<(u64, u64)> {
    let captures = dimensions_pattern().captures(resolution)?;
    let width = captures.get(1)?.as_str().parse().ok()?;
    let height = captures.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}

/// `W*H` for a `"WxH"` string, 0 when it does not parse.
pub fn pixel_count(resolution: &str) -> u64 {
    dimensions(resolution).map_or(0, |(width, height)| width.saturating_mul(height))
}

pub fn resolution_height(resolution: &str) -> Option<u64> {
    dimensions(resolution).map(|(_, height)| height)
}

/// `"1920x1080"` becomes `"1080p"`; anything else is returned as is.
pub fn resolution_label(resolution: &str) -> String {
    match resolution_height(resolution) {
        Some(height) => format!("{height}p"),
        None => resolution.to_string(),
    }
}

/// Binary units, two decimals, capped at GB.
pub fn format_filesize(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let Some(bytes) = bytes.filter(|bytes| *bytes > 0) else {
        return "unknown size".to_string();
    };
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}

/// Video-only streams need the best audio merged in by the engine.
pub fn needs_audio_merge(format: &Format) -> bool {
    format.vcodec != "none" && format.acodec == "none"
}

/// Descending by pixel count. Stable, so equal counts keep input order.
pub fn sorted_by_pixels(formats: &[Format]) -> Vec<&Format> {
    let mut sorted: Vec<&Format> = formats.iter().collect();
    sorted.sort_by_key(|format| std::cmp::Reverse(pixel_count(&format.resolution)));
    sorted
}

/// Display row for one format in the resolution picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOption {
    pub format_id: String,
    pub label: String,
    pub ext: String,
    pub size: String,
    pub fps: Option<f64>,
    pub needs_audio_merge: bool,
}

pub fn sorted_options(formats: &[Format]) -> Vec<FormatOption> {
    sorted_by_pixels(formats)
        .into_iter()
        .map(|format| FormatOption {
            format_id: format.format_id.clone(),
            label: resolution_label(&format.resolution),
            ext: format.ext.clone(),
            size: format_filesize(format.filesize),
            fps: format.fps,
            needs_audio_merge: needs_audio_merge(format),
        })
        .collect()
}

/// Default choice for a 1080p target.
pub fn select_default(formats: &[Format]) -> Option<String> {
    select_default_for_height(formats, DEFAULT_TARGET_HEIGHT)
}

/// Prefer a format whose height is exactly `height`; otherwise the one
/// whose pixel count is closest to a 16:9 frame of that height. Ties go to
/// the earliest entry in the sorted view.
pub fn select_default_for_height(formats: &[Format], height: u32) -> Option<String> {
    let sorted = sorted_by_pixels(formats);
    let height = u64::from(height);

    if let Some(exact) = sorted
        .iter()
        .find(|format| resolution_height(&format.resolution) == Some(height))
    {
        return Some(exact.format_id.clone());
    }

    let target = height * 16 / 9 * height;
    let mut best: Option<(&Format, u64)> = None;
    for format in sorted {
        let diff = pixel_count(&format.resolution).abs_diff(target);
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((format, diff));
        }
    }
    best.map(|(format, _)| format.format_id.clone())
}

/// The picker's current value. Automatic selection only fills an empty
/// choice; a value that is already set, automatic or manual, is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatChoice {
    selected: Option<String>,
}

impl FormatChoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run automatic selection if nothing is chosen yet. Returns the id that
    /// was auto-selected, if this call selected one.
    pub fn offer(&mut self, formats: &[Format], height: u32) -> Option<&str> {
        if self.is_chosen() {
            return None;
        }
        self.selected = select_default_for_height(formats, height);
        self.selected.as_deref()
    }

    /// A manual choice always wins.
    pub fn choose(&mut self, format_id: impl Into<String>) {
        self.selected = Some(format_id.into()).filter(|id| !id.is_empty());
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_chosen(&self) -> bool {
        self.selected.is_some()
    }
}
