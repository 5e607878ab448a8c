//! Display and filename helpers shared by the TUI and text output.

/// Characters stripped from the output filename as the user types.
pub const FORBIDDEN_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Card filenames longer than this are elided.
pub const MAX_DISPLAY_NAME: usize = 28;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units and at most one decimal place.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, SIZE_UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, SIZE_UNITS[unit])
    }
}

/// Shorten `name` to at most `max` characters, keeping its extension visible.
pub fn elide_filename(name: &str, max: usize) -> String {
    let total = name.chars().count();
    if total <= max {
        return name.to_string();
    }
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    };
    let ext_len = ext.chars().count();
    let keep = max.saturating_sub(ext_len + 3);
    if keep == 0 {
        let head: String = name.chars().take(max.saturating_sub(3)).collect();
        return format!("{head}...");
    }
    let head: String = name.chars().take(keep).collect();
    format!("{head}...{ext}")
}

/// Remove every forbidden character; used on each keystroke of the filename editor.
pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c))
        .collect()
}

/// `merged_2_files.pdf` -> `merged_2_files`
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
        _ => name,
    }
}

pub fn ensure_pdf_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

pub fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_formatting_matches_expected_units() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn sizes_beyond_gigabytes_stay_in_gb() {
        assert_eq!(format_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn elide_keeps_extension() {
        let name = "quarterly-financial-report-final-version.pdf";
        let out = elide_filename(name, MAX_DISPLAY_NAME);
        assert_eq!(out.chars().count(), MAX_DISPLAY_NAME);
        assert!(out.ends_with("....pdf"), "{out}");
        assert!(out.starts_with("quarterly-financial"));
    }

    #[test]
    fn elide_leaves_short_names_alone() {
        assert_eq!(elide_filename("a.pdf", MAX_DISPLAY_NAME), "a.pdf");
    }

    #[test]
    fn sanitize_strips_every_forbidden_char() {
        let raw = r#"a<b>c:d"e/f\g|h?i*j"#;
        let out = sanitize_filename(raw);
        assert_eq!(out, "abcdefghij");
        assert!(!out.chars().any(|c| FORBIDDEN_FILENAME_CHARS.contains(&c)));
        assert_eq!(sanitize_filename("<>:\"/\\|?*"), "");
    }

    #[test]
    fn strip_extension_only_removes_last_suffix() {
        assert_eq!(strip_extension("merged_2_files.pdf"), "merged_2_files");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn pdf_extension_added_once() {
        assert_eq!(ensure_pdf_extension("out"), "out.pdf");
        assert_eq!(ensure_pdf_extension("out.PDF"), "out.PDF");
    }
}
