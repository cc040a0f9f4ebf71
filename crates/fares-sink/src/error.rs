use std::path::PathBuf;
use thiserror::Error;

/// Failures writing or uploading one date group.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("CSV error: {0}")]
    Serialize(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload of {} to {key} failed: {reason}", path.display())]
    Upload {
        path: PathBuf,
        key: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SinkError::Upload {
            path: PathBuf::from("/tmp/latam_GRU_BPS_2025-07-03.csv"),
            key: "latam/2025-07-03/latam_GRU_BPS_2025-07-03.csv".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upload of /tmp/latam_GRU_BPS_2025-07-03.csv to latam/2025-07-03/latam_GRU_BPS_2025-07-03.csv failed: permission denied"
        );
    }
}
