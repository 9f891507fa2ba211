use std::any::Any;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get file extension (lowercase)
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Case-insensitive match of the path's extension against a set of
/// lowercase extensions given without the leading dot.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    file_extension(path).is_some_and(|ext| extensions.iter().any(|e| *e == ext))
}

/// `photo.JPG` -> `photo.webp`
pub fn webp_file_name(path: &Path) -> Option<OsString> {
    let stem = path.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".webp");
    Some(name)
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn exts() -> Vec<String> {
        vec!["jpg".into(), "jpeg".into(), "png".into()]
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("a/B.JPG"), &exts()));
        assert!(has_extension(Path::new("c.Jpeg"), &exts()));
        assert!(has_extension(Path::new("d.png"), &exts()));
        assert!(!has_extension(Path::new("e.gif"), &exts()));
        assert!(!has_extension(Path::new("README"), &exts()));
        assert!(!has_extension(Path::new("jpg"), &exts()));
    }

    #[test]
    fn webp_name_replaces_only_last_extension() {
        assert_eq!(webp_file_name(Path::new("x/a.jpg")), Some("a.webp".into()));
        assert_eq!(
            webp_file_name(&PathBuf::from("holiday.2024.PNG")),
            Some("holiday.2024.webp".into())
        );
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
