//! # Utility Functions Module
//!
//! Small helpers shared by the encoder and the reporting code.

/// Converts an iterable of string-like items to `Vec<String>`.
///
/// Keeps command line construction free of repetitive `.to_string()` calls:
///
/// ```rust,ignore
/// let args = to_string_vec(["--vb", &bitrate.to_string(), "--two-pass"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// File name for display, falling back to the full path
pub fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
