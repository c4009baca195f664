//! Error types for voxcmd.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxcmdError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Recording errors
    #[error("Audio capture unavailable: {message}")]
    CaptureUnavailable { message: String },

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    // Processing errors
    #[error("Failed to decode audio: {message}")]
    DecodeFailed { message: String },

    #[error("Failed to encode audio: {message}")]
    EncodeFailed { message: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedAudioFormat { format: String },

    #[error("Audio input too large: {size} bytes (limit {limit})")]
    AudioTooLarge { size: u64, limit: u64 },

    // Registry errors
    #[error("Command name must not be empty")]
    InvalidCommandName,

    #[error("Command not found: {name}")]
    CommandNotFound { name: String },

    #[error("Failed to persist commands: {message}")]
    PersistFailed { message: String },

    // Playback errors
    #[error("Playback failed: {message}")]
    Playback { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxcmdError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_parse_display() {
        let error = VoxcmdError::ConfigParse {
            message: "invalid TOML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration: invalid TOML syntax"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoxcmdError::ConfigInvalidValue {
            key: "sample_rate".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for sample_rate: must be positive"
        );
    }

    #[test]
    fn test_capture_unavailable_display() {
        let error = VoxcmdError::CaptureUnavailable {
            message: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio capture unavailable: permission denied"
        );
    }

    #[test]
    fn test_already_recording_display() {
        assert_eq!(
            VoxcmdError::AlreadyRecording.to_string(),
            "A recording is already in progress"
        );
    }

    #[test]
    fn test_not_recording_display() {
        assert_eq!(
            VoxcmdError::NotRecording.to_string(),
            "No recording in progress"
        );
    }

    #[test]
    fn test_decode_failed_display() {
        let error = VoxcmdError::DecodeFailed {
            message: "empty recording".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to decode audio: empty recording");
    }

    #[test]
    fn test_encode_failed_display() {
        let error = VoxcmdError::EncodeFailed {
            message: "payload too large".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to encode audio: payload too large"
        );
    }

    #[test]
    fn test_unsupported_audio_format_display() {
        let error = VoxcmdError::UnsupportedAudioFormat {
            format: "mp3".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported audio format: mp3");
    }

    #[test]
    fn test_audio_too_large_display() {
        let error = VoxcmdError::AudioTooLarge {
            size: 20,
            limit: 10,
        };
        assert_eq!(
            error.to_string(),
            "Audio input too large: 20 bytes (limit 10)"
        );
    }

    #[test]
    fn test_invalid_command_name_display() {
        assert_eq!(
            VoxcmdError::InvalidCommandName.to_string(),
            "Command name must not be empty"
        );
    }

    #[test]
    fn test_command_not_found_display() {
        let error = VoxcmdError::CommandNotFound {
            name: "lights on".to_string(),
        };
        assert_eq!(error.to_string(), "Command not found: lights on");
    }

    #[test]
    fn test_persist_failed_display() {
        let error = VoxcmdError::PersistFailed {
            message: "disk full".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to persist commands: disk full");
    }

    #[test]
    fn test_playback_display() {
        let error = VoxcmdError::Playback {
            message: "no output device".to_string(),
        };
        assert_eq!(error.to_string(), "Playback failed: no output device");
    }

    #[test]
    fn test_other_display() {
        let error = VoxcmdError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxcmdError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: VoxcmdError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);

        fn returns_error() -> Result<i32> {
            Err(VoxcmdError::Other("test error".to_string()))
        }
        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: VoxcmdError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxcmdError>();
        assert_sync::<VoxcmdError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = VoxcmdError::CommandNotFound {
            name: "open door".to_string(),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("CommandNotFound"));
        assert!(debug_str.contains("open door"));
    }
}
