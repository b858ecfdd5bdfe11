//! Shared key generation for derivative uploads.
//!
//! Key format: `uploads/{owner_id}/{category}/{qualifier}_{timestamp}_{stem}.{ext}`,
//! where `stem` is the original filename with its extension stripped and
//! unsafe characters replaced. The embedded timestamp makes keys unique,
//! so storage writes never overwrite each other.

use chrono::Utc;
use uuid::Uuid;

/// Strip the extension from a filename and replace every character
/// outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_stem(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => filename,
    };

    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate a storage key for one derivative of an owner's asset.
///
/// `category` groups derivatives (`thumbs`, `videos`); `qualifier` names
/// the concrete variant (`thumb_150`, a quality tier like `720p`).
pub fn derivative_key(
    owner_id: Uuid,
    category: &str,
    qualifier: &str,
    filename: &str,
    ext: &str,
) -> String {
    let timestamp = Utc::now().timestamp_millis();
    format!(
        "uploads/{}/{}/{}_{}_{}.{}",
        owner_id,
        category,
        qualifier,
        timestamp,
        sanitize_stem(filename),
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_extension() {
        assert_eq!(sanitize_stem("holiday video.mp4"), "holiday_video");
        assert_eq!(sanitize_stem("report.final.pdf"), "report.final");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        // f + two non-ascii chars + space = three replacements.
        assert_eq!(sanitize_stem("föö bar/baz?.png"), "f___bar_baz_");
        assert_eq!(sanitize_stem("ok-name_1.2.jpg"), "ok-name_1.2");
    }

    #[test]
    fn test_sanitize_without_extension() {
        assert_eq!(sanitize_stem("noext"), "noext");
        assert_eq!(sanitize_stem(".hidden"), ".hidden");
    }

    #[test]
    fn test_derivative_key_layout() {
        let owner = Uuid::nil();
        let key = derivative_key(owner, "videos", "720p", "my clip.mov", "mp4");

        assert!(key.starts_with(&format!("uploads/{}/videos/720p_", owner)));
        assert!(key.ends_with("_my_clip.mp4"));
        // No characters outside the sanctioned set past the prefix.
        assert!(!key.contains(' '));
    }

    #[test]
    fn test_derivative_keys_are_unique_per_timestamp() {
        let owner = Uuid::new_v4();
        let a = derivative_key(owner, "thumbs", "thumb_150", "a.png", "webp");
        assert!(a.contains("/thumbs/thumb_150_"));
    }
}
