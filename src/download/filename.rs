//! Local file layout: `<output>/<comic>/<chapter>/<index>.jpg`.

use std::path::{Path, PathBuf};

/// Longest file name component most filesystems accept, in bytes.
const MAX_COMPONENT_BYTES: usize = 255;

/// Cap on the comic directory path, in characters.
const MAX_COMIC_DIR_CHARS: usize = 110;

/// Zero-padding width for a chapter's image indices.
///
/// ```
/// use archiver_core::download::padding_width;
///
/// assert_eq!(padding_width(999), 3);
/// assert_eq!(padding_width(1000), 4);
/// ```
#[must_use]
pub fn padding_width(image_count: usize) -> usize {
    if image_count < 1000 { 3 } else { 4 }
}

/// File name for the image at 0-based `position`; indices on disk are 1-based.
#[must_use]
pub fn image_file_name(position: usize, width: usize) -> String {
    format!("{:0width$}.jpg", position + 1)
}

/// Makes a title safe to use as one path component.
///
/// Path and shell metacharacters become their full-width forms, spaces and
/// control characters are dropped and the result is cut to 255 bytes on a
/// character boundary.
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter(|c| *c != ' ' && !c.is_control())
        .map(|c| match c {
            '/' => '／',
            '\\' => '＼',
            '?' => '？',
            '|' => '︱',
            '"' => '＂',
            '*' => '＊',
            '<' => '＜',
            '>' => '＞',
            ':' => '：',
            '-' => '－',
            c => c,
        })
        .collect();

    let truncated = truncate_bytes(&mapped, MAX_COMPONENT_BYTES);
    if truncated.is_empty() || truncated.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    truncated.to_string()
}

/// Directory for a comic under `output_dir`, capped at 110 characters.
#[must_use]
pub fn comic_dir(output_dir: &Path, title: &str) -> PathBuf {
    let component = sanitize_component(title);
    let root_chars = output_dir.to_string_lossy().chars().count();
    let budget = MAX_COMIC_DIR_CHARS
        .saturating_sub(root_chars + 1)
        .max(1);
    let capped: String = component.chars().take(budget).collect();
    output_dir.join(capped)
}

/// Directory for one chapter inside its comic directory.
#[must_use]
pub fn chapter_dir(comic_dir: &Path, chapter_title: &str) -> PathBuf {
    comic_dir.join(sanitize_component(chapter_title))
}

fn truncate_bytes(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
