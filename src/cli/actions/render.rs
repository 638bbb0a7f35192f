//! Terminal rendering for listings.

use crate::{api::types::GalleryItem, moderation::ModerationItem};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable size, one decimal below 10 in units above bytes.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else if value < 10.0 {
        format!("{value:.1} {}", UNITS[unit])
    } else {
        format!("{value:.0} {}", UNITS[unit])
    }
}

pub fn moderation_line(index: usize, item: &ModerationItem) -> String {
    format!(
        "{:>3}. {}  {}  {}{}",
        index,
        item.key,
        item.size.map_or_else(|| "-".to_string(), format_bytes),
        item.last_modified.as_deref().unwrap_or("-"),
        if item.preview_url.is_some() { "" } else { "  (no preview)" },
    )
}

pub fn gallery_line(item: &GalleryItem) -> String {
    format!(
        "{}  {}  {}",
        item.display_name(),
        item.size.map_or_else(|| "-".to_string(), format_bytes),
        item.url
    )
}
