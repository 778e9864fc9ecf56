//! SaveStore trait definition.
//!
//! Named persistence for session records. Follows the same RPITIT pattern
//! as the provider port; the JSON directory implementation lives in
//! parley-infra.

use parley_types::error::StoreError;
use parley_types::record::SessionRecord;

/// Storage for named session records.
pub trait SaveStore: Send + Sync {
    /// Whether a save with this name exists.
    fn exists(&self, name: &str) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Write a record. Fails with [`StoreError::Exists`] if the name is taken
    /// and `overwrite` is false.
    fn write(
        &self,
        name: &str,
        record: &SessionRecord,
        overwrite: bool,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Read and validate a record.
    fn read(&self, name: &str) -> impl std::future::Future<Output = Result<SessionRecord, StoreError>> + Send;

    /// All save names, sorted.
    fn names(&self) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Delete a save. Fails with [`StoreError::NotFound`] if it is absent.
    fn delete(&self, name: &str) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// Check that `name` is usable as a save name.
///
/// Allowed: ASCII letters, digits, `_`, `-` and `.`; not empty, and not `.`
/// or `..`.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.');
    if name.is_empty() || name == "." || name == ".." || !name.chars().all(allowed) {
        return Err(StoreError::BadName(name.to_string()));
    }
    Ok(())
}
