use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DaqLineError {
    #[error("DAQ line is missing field {0}")]
    MissingField(usize),
    #[error("Invalid hex token {token:?} found in DAQ line field {field}")]
    BadHex {
        field: usize,
        token: String,
        source: std::num::ParseIntError,
    },
    #[error("Invalid GPS time of day {0:?} found in DAQ line")]
    BadGpsTime(String),
    #[error("Invalid GPS correction {0:?} found in DAQ line")]
    BadCorrection(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Counter record {0:?} is missing scaler S{1}")]
    MissingScaler(String, usize),
    #[error("Counter record has an invalid scaler token {0:?}")]
    BadScaler(String),
    #[error("Temperature record {0:?} could not be parsed")]
    BadTemperature(String),
    #[error("Pressure record {0:?} could not be parsed")]
    BadPressure(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config value {name} is invalid: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Writer failed to format a timestamp: {0}")]
    FormatError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Writer error: {0}")]
    WriterError(#[from] WriterError),
    #[error("Processor could not open input {0:?}")]
    BadInputPath(PathBuf),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor lost the {0} consumer")]
    ConsumerHungUp(&'static str),
    #[error("Processor {0} consumer panicked")]
    ConsumerPanicked(&'static str),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
