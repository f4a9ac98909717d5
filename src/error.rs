//! Error types for the swarm simulator
//!
//! This module defines the error types shared by the tracker, the peers and
//! the surrounding tooling.

use std::fmt;

/// Comprehensive error type for swarm simulation operations
#[derive(Debug, Clone)]
pub enum SwarmError {
    /// Peer input file parsing errors
    ParseError {
        message: String,
        source: Option<String>,
    },

    /// Coordination protocol errors (unexpected message, bad frame)
    ProtocolError {
        message: String,
        source: Option<String>,
    },

    /// Message transport errors (closed lane, failed rendezvous)
    TransportError {
        message: String,
        endpoint: Option<String>,
        source: Option<String>,
    },

    /// Tracker state errors (unknown file, out-of-range indices)
    TrackerError {
        message: String,
        source: Option<String>,
    },

    /// Output sink and file I/O errors
    StorageError {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },

    /// Configuration errors
    ConfigError {
        message: String,
        field: Option<String>,
    },

    /// Validation errors
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// Worker lifecycle errors (a peer worker failed to run to completion)
    WorkerError {
        message: String,
        worker: Option<String>,
        source: Option<String>,
    },
}

impl SwarmError {
    /// Create a new ParseError
    pub fn parse_error(message: impl Into<String>) -> Self {
        SwarmError::ParseError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new ParseError with source
    pub fn parse_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        SwarmError::ParseError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new ProtocolError
    pub fn protocol_error(message: impl Into<String>) -> Self {
        SwarmError::ProtocolError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new ProtocolError with source
    pub fn protocol_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        SwarmError::ProtocolError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new TransportError
    pub fn transport_error(message: impl Into<String>) -> Self {
        SwarmError::TransportError {
            message: message.into(),
            endpoint: None,
            source: None,
        }
    }

    /// Create a new TransportError with the endpoint it concerns
    pub fn transport_error_with_endpoint(message: impl Into<String>, endpoint: impl Into<String>) -> Self {
        SwarmError::TransportError {
            message: message.into(),
            endpoint: Some(endpoint.into()),
            source: None,
        }
    }

    /// Create a new TrackerError
    pub fn tracker_error(message: impl Into<String>) -> Self {
        SwarmError::TrackerError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new TrackerError with source
    pub fn tracker_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        SwarmError::TrackerError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new StorageError
    pub fn storage_error(message: impl Into<String>) -> Self {
        SwarmError::StorageError {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a new StorageError with path
    pub fn storage_error_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        SwarmError::StorageError {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a new StorageError with path and source
    pub fn storage_error_full(message: impl Into<String>, path: impl Into<String>, source: impl Into<String>) -> Self {
        SwarmError::StorageError {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new ConfigError
    pub fn config_error(message: impl Into<String>) -> Self {
        SwarmError::ConfigError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ConfigError with field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        SwarmError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new ValidationError
    pub fn validation_error(message: impl Into<String>) -> Self {
        SwarmError::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ValidationError with field
    pub fn validation_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        SwarmError::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new WorkerError
    pub fn worker_error(message: impl Into<String>) -> Self {
        SwarmError::WorkerError {
            message: message.into(),
            worker: None,
            source: None,
        }
    }

    /// Create a new WorkerError naming the worker
    pub fn worker_error_full(message: impl Into<String>, worker: impl Into<String>, source: impl Into<String>) -> Self {
        SwarmError::WorkerError {
            message: message.into(),
            worker: Some(worker.into()),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::ParseError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Parse error: {} (source: {})", message, src)
                } else {
                    write!(f, "Parse error: {}", message)
                }
            }
            SwarmError::ProtocolError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Protocol error: {} (source: {})", message, src)
                } else {
                    write!(f, "Protocol error: {}", message)
                }
            }
            SwarmError::TransportError { message, endpoint, source } => {
                match (endpoint, source) {
                    (Some(e), Some(s)) => write!(f, "Transport error: {} (endpoint: {}, source: {})", message, e, s),
                    (Some(e), None) => write!(f, "Transport error: {} (endpoint: {})", message, e),
                    (None, Some(s)) => write!(f, "Transport error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Transport error: {}", message),
                }
            }
            SwarmError::TrackerError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Tracker error: {} (source: {})", message, src)
                } else {
                    write!(f, "Tracker error: {}", message)
                }
            }
            SwarmError::StorageError { message, path, source } => {
                match (path, source) {
                    (Some(p), Some(s)) => write!(f, "Storage error: {} (path: {}, source: {})", message, p, s),
                    (Some(p), None) => write!(f, "Storage error: {} (path: {})", message, p),
                    (None, Some(s)) => write!(f, "Storage error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Storage error: {}", message),
                }
            }
            SwarmError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
            SwarmError::ValidationError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Validation error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Validation error: {}", message)
                }
            }
            SwarmError::WorkerError { message, worker, source } => {
                match (worker, source) {
                    (Some(w), Some(s)) => write!(f, "Worker error: {} (worker: {}, source: {})", message, w, s),
                    (Some(w), None) => write!(f, "Worker error: {} (worker: {})", message, w),
                    (None, Some(s)) => write!(f, "Worker error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Worker error: {}", message),
                }
            }
        }
    }
}

impl std::error::Error for SwarmError {}

// Implement From traits for common error types

impl From<std::io::Error> for SwarmError {
    fn from(err: std::io::Error) -> Self {
        SwarmError::storage_error_full(err.to_string(), "unknown".to_string(), err.kind().to_string())
    }
}

impl From<serde_json::Error> for SwarmError {
    fn from(err: serde_json::Error) -> Self {
        SwarmError::storage_error_full("Failed to serialize JSON data", "unknown".to_string(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let err = SwarmError::parse_error("Invalid peer input");
        assert_eq!(err.to_string(), "Parse error: Invalid peer input");
    }

    #[test]
    fn test_parse_error_with_source() {
        let err = SwarmError::parse_error_with_source("Invalid peer input", "bad segment count");
        assert!(err.to_string().contains("Parse error"));
        assert!(err.to_string().contains("Invalid peer input"));
        assert!(err.to_string().contains("bad segment count"));
    }

    #[test]
    fn test_transport_error_with_endpoint() {
        let err = SwarmError::transport_error_with_endpoint("Lane closed", "peer 3");
        assert!(err.to_string().contains("Transport error"));
        assert!(err.to_string().contains("Lane closed"));
        assert!(err.to_string().contains("peer 3"));
    }

    #[test]
    fn test_tracker_error() {
        let err = SwarmError::tracker_error_with_source("Unknown file", "file index 9");
        assert!(err.to_string().contains("Tracker error"));
        assert!(err.to_string().contains("file index 9"));
    }

    #[test]
    fn test_storage_error_with_path() {
        let err = SwarmError::storage_error_with_path("File not found", "/path/to/in1.txt");
        assert!(err.to_string().contains("Storage error"));
        assert!(err.to_string().contains("File not found"));
        assert!(err.to_string().contains("/path/to/in1.txt"));
    }

    #[test]
    fn test_config_error_with_field() {
        let err = SwarmError::config_error_with_field("Invalid value", "peers");
        assert!(err.to_string().contains("Config error"));
        assert!(err.to_string().contains("peers"));
    }

    #[test]
    fn test_validation_error_with_field() {
        let err = SwarmError::validation_error_with_field("Value out of range", "segment_index");
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("segment_index"));
    }

    #[test]
    fn test_worker_error_full() {
        let err = SwarmError::worker_error_full("Worker did not finish", "upload", "task panicked");
        assert!(err.to_string().contains("Worker error"));
        assert!(err.to_string().contains("upload"));
        assert!(err.to_string().contains("task panicked"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SwarmError = io_err.into();
        assert!(matches!(err, SwarmError::StorageError { .. }));
    }
}
