//! Upload validation and input sanitization.

pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;
pub const MAX_FILENAME_LEN: usize = 255;
pub const MAX_INPUT_LEN: usize = 10_000;

const ALLOWED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

/// Metadata about a file the client wants to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

impl FileUpload {
    /// Check the upload request, collecting every violation.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.filename.is_empty() {
            issues.push("filename: empty".to_string());
        } else if self.filename.len() > MAX_FILENAME_LEN {
            issues.push(format!(
                "filename: {} chars exceeds limit of {MAX_FILENAME_LEN}",
                self.filename.len()
            ));
        }

        if !ALLOWED_VIDEO_TYPES.contains(&self.content_type.as_str()) {
            issues.push(format!(
                "contentType: {} is not an accepted video type",
                self.content_type
            ));
        }

        if self.size == 0 {
            issues.push("size: empty file".to_string());
        } else if self.size > MAX_UPLOAD_BYTES {
            issues.push(format!(
                "size: {} bytes exceeds limit of {MAX_UPLOAD_BYTES}",
                self.size
            ));
        }

        issues
    }
}

/// Strip characters that could escape into HTML or shell templates,
/// trim, and cap the length.
pub fn sanitize_input(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '`' | '$' | '{' | '}'))
        .collect();
    cleaned.trim().chars().take(MAX_INPUT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_upload(size: u64) -> FileUpload {
        FileUpload {
            filename: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            size,
        }
    }

    #[test]
    fn accepts_normal_mp4() {
        assert!(mp4_upload(10 * 1024 * 1024).validate().is_empty());
    }

    #[test]
    fn rejects_oversized_file() {
        let issues = mp4_upload(MAX_UPLOAD_BYTES + 1).validate();
        assert!(issues.iter().any(|i| i.starts_with("size")));
    }

    #[test]
    fn rejects_non_video_content_type() {
        let upload = FileUpload {
            content_type: "application/pdf".to_string(),
            ..mp4_upload(1024)
        };
        let issues = upload.validate();
        assert!(issues.iter().any(|i| i.starts_with("contentType")));
    }

    #[test]
    fn sanitize_strips_template_characters() {
        assert_eq!(
            sanitize_input("  <b>hello</b> ${world} `rm -rf`  "),
            "bhello/b world rm -rf"
        );
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(MAX_INPUT_LEN + 100);
        assert_eq!(sanitize_input(&long).len(), MAX_INPUT_LEN);
    }
}
