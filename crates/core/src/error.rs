use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output directory: {0}")]
    OutputDirCreation(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("data file error: {0}")]
    OpenErp(#[from] openerp::OpenErpError),

    #[error("record id '{0}' does not match nhc_demo_patient_<n>")]
    PatientIdMismatch(String),
    #[error("location '{0}' is not a ward or bed reference")]
    LocationMismatch(String),
    #[error("patient record '{record}' has no '{field}' reference")]
    MissingLocation { record: String, field: &'static str },
    #[error("expected {expected} admission offsets (one per patient), got {actual}")]
    OffsetCountMismatch { expected: usize, actual: usize },
    #[error("risk distribution exhausted before patient {0}")]
    RiskExhausted(String),
    #[error("unknown risk category '{0}' (expected high, medium, low or none)")]
    UnknownRisk(String),
}

pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;
