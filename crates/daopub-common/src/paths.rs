//! Path rules shared by discovery, sequencing and the pipeline.
//!
//! The image store mixes component directories with publication artifacts
//! (`c0031.pdf`, `c0031.xml`) and housekeeping files. Components are told
//! apart purely by name, using the rule in [`is_component_name`].

use std::path::{Path, PathBuf};

/// Width of the zero-padded index in sequenced image file names.
pub const SEQUENCE_WIDTH: usize = 8;

/// Decide whether a directory entry name denotes a component.
///
/// Rule: a component name is non-empty and contains no `.` character. Files
/// always carry an extension in the stores, so "no extension" stands in for
/// "is a directory". Hidden entries (`.DS_Store`, lock files) and names that
/// merely contain a dot (`v1.2`) are therefore never components.
///
/// # Examples
///
/// ```
/// use daopub_common::paths::is_component_name;
///
/// assert!(is_component_name("c0031"));
/// assert!(!is_component_name("c0031.pdf"));
/// assert!(!is_component_name(".DS_Store"));
/// assert!(!is_component_name(""));
/// ```
pub fn is_component_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.')
}

/// Check whether `path` has extension `ext` (ASCII case-insensitive).
///
/// A leading dot on `ext` is ignored, so `"jp2"` and `".jp2"` are equivalent.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    let ext = normalize_extension(ext);
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Strip a leading dot from an extension.
pub fn normalize_extension(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}

/// File name for position `index` in an image sequence.
///
/// # Examples
///
/// ```
/// use daopub_common::paths::sequence_file_name;
///
/// assert_eq!(sequence_file_name(4, "jp2"), "00000004.jp2");
/// assert_eq!(sequence_file_name(12, ".tif"), "00000012.tif");
/// ```
#[must_use]
pub fn sequence_file_name(index: u32, ext: &str) -> String {
    format!(
        "{:0width$}.{}",
        index,
        normalize_extension(ext),
        width = SEQUENCE_WIDTH
    )
}

/// Hidden sibling lock file guarding a component directory.
///
/// Lives next to the directory rather than inside it so converters that list
/// the directory never see it; the leading dot keeps discovery from treating
/// it as a component.
#[must_use]
pub fn lock_file_for(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "component".to_string());
    let lock_name = format!(".{name}.lock");
    match dir.parent() {
        Some(parent) => parent.join(lock_name),
        None => PathBuf::from(lock_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_rule_accepts_plain_names() {
        assert!(is_component_name("c0031"));
        assert!(is_component_name("Box_12"));
        assert!(is_component_name("c 0031"));
    }

    #[test]
    fn component_rule_rejects_artifacts() {
        assert!(!is_component_name("c0031.pdf"));
        assert!(!is_component_name("c0031.xml"));
        assert!(!is_component_name("C0022.EAD.xml"));
    }

    #[test]
    fn component_rule_rejects_hidden_and_dotted_names() {
        assert!(!is_component_name(".DS_Store"));
        assert!(!is_component_name(".c0031.lock"));
        assert!(!is_component_name("."));
        assert!(!is_component_name(".."));
        // A dot that is not an extension still disqualifies the name.
        assert!(!is_component_name("folder v1.2"));
        assert!(!is_component_name("c0031."));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("/x/00000001.jp2"), "jp2"));
        assert!(has_extension(Path::new("/x/SCAN.JP2"), ".jp2"));
        assert!(!has_extension(Path::new("/x/scan.jp2.bak"), "jp2"));
        assert!(!has_extension(Path::new("/x/jp2"), "jp2"));
    }

    #[test]
    fn sequence_names_are_zero_padded() {
        assert_eq!(sequence_file_name(1, "jp2"), "00000001.jp2");
        assert_eq!(sequence_file_name(99_999_999, "tif"), "99999999.tif");
    }

    #[test]
    fn lock_file_is_hidden_sibling() {
        let lock = lock_file_for(Path::new("/store/C0022/c0031"));
        assert_eq!(lock, Path::new("/store/C0022/.c0031.lock"));
        let name = lock.file_name().unwrap().to_str().unwrap();
        assert!(!is_component_name(name));
    }
}
