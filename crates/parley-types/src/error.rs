use thiserror::Error;

/// A role string that is not one of `system`, `user`, `assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role '{0}': expected one of system, user, assistant")]
pub struct RoleError(pub String);

/// Errors raised while validating a persisted session record.
///
/// Field paths are dotted (`budget.ceiling`, `turns[2].role`) so the caller
/// can point at the exact offending value.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' has the wrong type: expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field '{field}' has an invalid role '{role}'")]
    BadRole { field: String, role: String },

    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from setting a model parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),

    #[error("parameter '{name}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },

    #[error("parameter '{name}' expects {expected}, got '{value}'")]
    BadValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Errors from the template registry.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("template '{0}' already exists")]
    Duplicate(String),

    #[error("bad template: {0}")]
    Invalid(String),
}

/// Errors from a save store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save '{0}' already exists")]
    Exists(String),

    #[error("save '{0}' not found")]
    NotFound(String),

    #[error("invalid save name '{0}'")]
    BadName(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_error_display() {
        let err = RoleError("robot".to_string());
        assert_eq!(
            err.to_string(),
            "invalid role 'robot': expected one of system, user, assistant"
        );
    }

    #[test]
    fn test_record_error_names_field() {
        let err = RecordError::WrongType {
            field: "budget.ceiling".to_string(),
            expected: "non-negative integer",
        };
        assert!(err.to_string().contains("budget.ceiling"));
        assert!(err.to_string().contains("non-negative integer"));
    }

    #[test]
    fn test_param_error_display() {
        let err = ParamError::OutOfRange {
            name: "temperature",
            min: 0.0,
            max: 2.0,
            value: 3.5,
        };
        assert_eq!(
            err.to_string(),
            "parameter 'temperature' must be between 0 and 2, got 3.5"
        );
    }

    #[test]
    fn test_store_error_wraps_record_error() {
        let err: StoreError = RecordError::MissingField("model".to_string()).into();
        assert_eq!(err.to_string(), "missing required field 'model'");
    }
}
