// src/error.rs
//! Error types for the navigation engine

use std::fmt;

pub type Result<T> = std::result::Result<T, NavError>;

#[derive(Debug)]
pub enum NavError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidCoordinate { lat: f64, lon: f64 },
    InvalidInput(String),
    InvalidState(String),
    CorruptIndex(String),
    Parse(String),
    Config(String),
    Other(String),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Io(e) => write!(f, "IO error: {}", e),
            NavError::Json(e) => write!(f, "JSON error: {}", e),
            NavError::InvalidCoordinate { lat, lon } => {
                write!(f, "Invalid coordinate: lat={}, lon={}", lat, lon)
            }
            NavError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            NavError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            NavError::CorruptIndex(msg) => write!(f, "Corrupt region index: {}", msg),
            NavError::Parse(msg) => write!(f, "Parse error: {}", msg),
            NavError::Config(msg) => write!(f, "Config error: {}", msg),
            NavError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for NavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavError::Io(e) => Some(e),
            NavError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NavError {
    fn from(error: std::io::Error) -> Self {
        NavError::Io(error)
    }
}

impl From<serde_json::Error> for NavError {
    fn from(error: serde_json::Error) -> Self {
        NavError::Json(error)
    }
}

impl From<anyhow::Error> for NavError {
    fn from(error: anyhow::Error) -> Self {
        NavError::Other(error.to_string())
    }
}
