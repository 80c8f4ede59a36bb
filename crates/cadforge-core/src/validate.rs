//! Pure validation predicates on file metadata

use crate::config::ForgeConfig;
use crate::error::{ForgeError, Result};

/// Case-insensitive suffix match against an allowed extension list.
pub fn is_accepted_extension(name: &str, allowed: &[String]) -> bool {
    let lower = name.to_lowercase();
    allowed
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

/// Inclusive boundary: a file exactly at the limit passes.
pub fn is_within_size_limit(size_bytes: u64, max_size_bytes: u64) -> bool {
    size_bytes <= max_size_bytes
}

/// Human-readable size using base-1024 units, at most two decimals.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut scaled = format!("{:.2}", value);
    while scaled.ends_with('0') {
        scaled.pop();
    }
    if scaled.ends_with('.') {
        scaled.pop();
    }

    format!("{} {}", scaled, UNITS[unit])
}

/// Gate an upload before any entry is created. Rejections here are
/// synchronous and leave no trace in the registry.
pub fn validate_upload(name: &str, size_bytes: u64, config: &ForgeConfig) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ForgeError::Validation("File name is empty".to_string()));
    }

    if !is_accepted_extension(name, &config.allowed_extensions) {
        return Err(ForgeError::Validation(format!(
            "Unsupported file type: expected one of {}",
            config.allowed_extensions.join(", ")
        )));
    }

    if size_bytes == 0 {
        return Err(ForgeError::Validation(format!("{} is empty", name)));
    }

    if !is_within_size_limit(size_bytes, config.max_size_bytes) {
        return Err(ForgeError::Validation(format!(
            "{} exceeds the {} upload limit",
            name,
            format_size(config.max_size_bytes)
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn extension_match_is_case_insensitive() {
        let allowed = vec![".dwg".to_string()];
        assert!(is_accepted_extension("plan.dwg", &allowed));
        assert!(is_accepted_extension("PLAN.DWG", &allowed));
        assert!(!is_accepted_extension("plan.dxf", &allowed));
        assert!(!is_accepted_extension("plandwg", &allowed));
    }

    #[test]
    fn size_limit_boundary_is_inclusive() {
        let max = 50 * MIB;
        assert!(is_within_size_limit(max, max));
        assert!(is_within_size_limit(max - 1, max));
        assert!(!is_within_size_limit(max + 1, max));
    }

    #[test]
    fn format_size_known_values() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * MIB), "5 MB");
        assert_eq!(format_size(3 * 1024 * MIB), "3 GB");
    }

    #[test]
    fn validate_upload_rejects_before_registration() {
        let config = ForgeConfig::default();

        assert!(validate_upload("plan.dwg", MIB, &config).is_ok());
        assert!(matches!(
            validate_upload("plan.pdf", MIB, &config),
            Err(ForgeError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("", MIB, &config),
            Err(ForgeError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("plan.dwg", 0, &config),
            Err(ForgeError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("plan.dwg", 51 * MIB, &config),
            Err(ForgeError::Validation(_))
        ));
    }
}
