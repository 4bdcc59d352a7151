use crate::model::ColumnType;
use dbsync_core_types::RequestId;
use thiserror::Error;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Status code returned across the boundary for a successful call
pub const STATUS_OK: i32 = 0;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure that leaves the engine is classified into exactly one of
/// these kinds. Each kind maps to a stable string code and a stable,
/// distinct nonzero status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    /// Null/missing required input (empty path, empty schema, absent payload)
    InvalidArgument,
    /// Malformed wire payload
    ParseError,
    /// Invalid or mismatched schema, or a row that does not fit the schema
    SchemaError,
    /// Two input rows share a primary key
    DuplicateKey,
    /// Unknown or already released handle
    InvalidHandle,
    /// Backend open/read/write/commit failure
    StorageError,
    /// Catch-all for unanticipated failures
    UnknownError,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::ParseError => "ERR_PARSE",
            ExErrorKind::SchemaError => "ERR_SCHEMA",
            ExErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ExErrorKind::InvalidHandle => "ERR_INVALID_HANDLE",
            ExErrorKind::StorageError => "ERR_STORAGE",
            ExErrorKind::UnknownError => "ERR_UNKNOWN",
        }
    }

    /// Get the numeric status code returned across the boundary
    pub fn status_code(&self) -> i32 {
        match self {
            ExErrorKind::InvalidArgument => -1,
            ExErrorKind::ParseError => -2,
            ExErrorKind::SchemaError => -3,
            ExErrorKind::DuplicateKey => -4,
            ExErrorKind::InvalidHandle => -5,
            ExErrorKind::StorageError => -6,
            ExErrorKind::UnknownError => -99,
        }
    }
}

/// Canonical structured error type
///
/// Carries the taxonomy kind plus optional context for programmatic
/// handling. `detail_code` holds the distinguishing parse category or the
/// code reported by the storage backend.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    handle: Option<String>,
    table: Option<String>,
    column: Option<String>,
    key: Option<String>,
    detail_code: Option<i32>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            handle: None,
            table: None,
            column: None,
            key: None,
            detail_code: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add handle context
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add column context
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Add primary key context (rendered form)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add the parse category or backend-reported code
    pub fn with_detail_code(mut self, code: i32) -> Self {
        self.detail_code = Some(code);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the numeric boundary status code
    pub fn status_code(&self) -> i32 {
        self.kind.status_code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the handle context, if any
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the column context, if any
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Get the primary key context, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Get the parse category or backend code, if any
    pub fn detail_code(&self) -> Option<i32> {
        self.detail_code
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(code) = self.detail_code {
            write!(f, " (code: {})", code)?;
        }
        if let Some(handle) = &self.handle {
            write!(f, " (handle: {})", handle)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

/// Map a serde_json error category onto its distinguishing parse code
pub fn json_category_code(err: &serde_json::Error) -> i32 {
    use serde_json::error::Category;
    match err.classify() {
        Category::Io => 1,
        Category::Syntax => 2,
        Category::Data => 3,
        Category::Eof => 4,
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::ParseError)
            .with_detail_code(json_category_code(&err))
            .with_message(format!("json error: {}", err))
    }
}

// ========== End Error Facility ==========

/// Validation and diff failures raised by the schema manager and differ
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    // ===== Schema declaration =====
    /// Schema text is empty or structurally malformed
    #[error("Invalid schema: {reason}")]
    InvalidSchema { reason: String },

    /// The same column is declared twice
    #[error("Duplicate column in schema: {column}")]
    DuplicateColumn { column: String },

    /// No primary key declared
    #[error("Table {table} declares no primary key")]
    MissingPrimaryKey { table: String },

    /// Column type name has no known affinity
    #[error("Unsupported type '{type_name}' for column {column}")]
    UnsupportedType { column: String, type_name: String },

    /// A primary key constraint names a column that is not declared
    #[error("Primary key references unknown column: {column}")]
    UnknownKeyColumn { column: String },

    // ===== Row shape =====
    /// Row carries a column that is not in the schema
    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    /// Row lacks a primary key column, or carries null for one
    #[error("Missing primary key column: {column}")]
    MissingKey { column: String },

    /// Value cannot be coerced to the column type
    #[error("Type mismatch for column {column}: expected {expected:?}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: String,
    },

    /// NOT NULL column resolved to null
    #[error("Column {column} is NOT NULL")]
    NullViolation { column: String },

    /// Payload names a different table than the handle's schema
    #[error("Payload targets table {found}, handle manages {expected}")]
    TableMismatch { expected: String, found: String },

    /// A row in the payload is not a JSON object
    #[error("Row {index} is not a JSON object")]
    NotAnObject { index: usize },

    /// Payload is neither a row array nor a `{"table", "data"}` object
    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    // ===== Snapshot =====
    /// Two rows in one snapshot share a primary key
    #[error("Duplicate primary key in snapshot: {key}")]
    DuplicateKey { key: String },
}

impl SyncError {
    /// Column the failure refers to, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            SyncError::DuplicateColumn { column }
            | SyncError::UnsupportedType { column, .. }
            | SyncError::UnknownKeyColumn { column }
            | SyncError::UnknownColumn { column }
            | SyncError::MissingKey { column }
            | SyncError::TypeMismatch { column, .. }
            | SyncError::NullViolation { column } => Some(column),
            _ => None,
        }
    }

    /// Taxonomy kind this failure is reported under
    pub fn kind(&self) -> ExErrorKind {
        match self {
            SyncError::DuplicateKey { .. } => ExErrorKind::DuplicateKey,
            SyncError::NotAnObject { .. } | SyncError::MalformedPayload { .. } => {
                ExErrorKind::ParseError
            }
            _ => ExErrorKind::SchemaError,
        }
    }
}

/// Conversion from SyncError to ExError
impl From<SyncError> for ExError {
    fn from(err: SyncError) -> Self {
        let mut ex = ExError::new(err.kind()).with_message(err.to_string());
        if let Some(column) = err.column() {
            ex = ex.with_column(column);
        }
        match &err {
            SyncError::DuplicateKey { key } => ex.with_key(key.clone()),
            SyncError::MissingPrimaryKey { table } => ex.with_table(table.clone()),
            SyncError::TableMismatch { found, .. } => ex.with_table(found.clone()),
            // data category, matching serde_json's classification of shape errors
            SyncError::NotAnObject { .. } | SyncError::MalformedPayload { .. } => {
                ex.with_detail_code(3)
            }
            _ => ex,
        }
    }
}
