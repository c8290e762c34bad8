use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeasedbErrorCode {
    LeaseUnavailable,
    ReleaseFailed,
    MigrationFailed,
    SchemaAhead,
    Store,
    InvalidConfig,
    EngineInit,
    Io,
    WorkerPanicked,
}

impl LeasedbErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            LeasedbErrorCode::LeaseUnavailable => "lease_unavailable",
            LeasedbErrorCode::ReleaseFailed => "release_failed",
            LeasedbErrorCode::MigrationFailed => "migration_failed",
            LeasedbErrorCode::SchemaAhead => "schema_ahead",
            LeasedbErrorCode::Store => "store",
            LeasedbErrorCode::InvalidConfig => "invalid_config",
            LeasedbErrorCode::EngineInit => "engine_init",
            LeasedbErrorCode::Io => "io",
            LeasedbErrorCode::WorkerPanicked => "worker_panicked",
        }
    }
}

#[derive(Debug, Error)]
pub enum LeasedbError {
    #[error("write lease unavailable: {0}")]
    LeaseUnavailable(String),
    #[error("lease release failed: {0}")]
    ReleaseFailed(String),
    #[error("migration {index} failed: {reason}")]
    MigrationFailed { index: i64, reason: String },
    #[error("store schema version {persisted} is ahead of latest known migration {known}")]
    SchemaAhead { persisted: i64, known: i64 },
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("engine init failed: {0}")]
    EngineInit(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store worker panicked: {0}")]
    WorkerPanicked(String),
}

impl LeasedbError {
    pub fn code(&self) -> LeasedbErrorCode {
        match self {
            LeasedbError::LeaseUnavailable(_) => LeasedbErrorCode::LeaseUnavailable,
            LeasedbError::ReleaseFailed(_) => LeasedbErrorCode::ReleaseFailed,
            LeasedbError::MigrationFailed { .. } => LeasedbErrorCode::MigrationFailed,
            LeasedbError::SchemaAhead { .. } => LeasedbErrorCode::SchemaAhead,
            LeasedbError::Store(_) => LeasedbErrorCode::Store,
            LeasedbError::InvalidConfig { .. } => LeasedbErrorCode::InvalidConfig,
            LeasedbError::EngineInit(_) => LeasedbErrorCode::EngineInit,
            LeasedbError::Io(_) => LeasedbErrorCode::Io,
            LeasedbError::WorkerPanicked(_) => LeasedbErrorCode::WorkerPanicked,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
