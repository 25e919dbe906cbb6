//! Object key layout for the video buckets.
//!
//! Raw uploads and rendered outputs live under `{user_id}/{job_id}/...`
//! so everything belonging to a job can be listed or deleted by prefix.

use crate::error::{StorageError, StorageResult};

/// Key for the raw uploaded video.
pub fn input_key(user_id: &str, job_id: &str, extension: &str) -> String {
    format!("{user_id}/{job_id}/input.{extension}")
}

/// Key for the rendered output video.
pub fn output_key(user_id: &str, job_id: &str) -> String {
    format!("{user_id}/{job_id}/output.mp4")
}

/// Prefix covering every object a job owns.
pub fn job_prefix(user_id: &str, job_id: &str) -> String {
    format!("{user_id}/{job_id}/")
}

/// Reject keys that could escape the per-user prefix.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("empty key"));
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(StorageError::invalid_key(format!(
            "key must be a relative path without traversal: {key}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_share_the_job_prefix() {
        let input = input_key("u1", "j1", "mp4");
        let output = output_key("u1", "j1");
        let prefix = job_prefix("u1", "j1");
        assert!(input.starts_with(&prefix));
        assert!(output.starts_with(&prefix));
        assert_eq!(output, "u1/j1/output.mp4");
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key("u1/j1/input.mp4").is_ok());
        assert!(validate_key("../other-user/secret.mp4").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("").is_err());
    }
}
