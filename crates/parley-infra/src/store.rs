//! JSON file save store.
//!
//! Each save is `<dir>/<name>.json`. The directory is created on the first
//! write; a missing directory simply has no saves.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parley_core::chat::store::{SaveStore, validate_name};
use parley_types::error::StoreError;
use parley_types::record::SessionRecord;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }
}

impl SaveStore for JsonDirStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn write(
        &self,
        name: &str,
        record: &SessionRecord,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let path = self.path(name)?;
        if !overwrite && tokio::fs::try_exists(&path).await? {
            return Err(StoreError::Exists(name.to_string()));
        }
        let json = record.to_json_pretty()?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Atomic replace.
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, json).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "could not remove temp save");
            }
            return Err(err.into());
        }
        tracing::debug!(path = %path.display(), turns = record.turns.len(), "wrote save");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<SessionRecord, StoreError> {
        let path = self.path(name)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(SessionRecord::from_json(&text)?)
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted save");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_types::budget::BudgetParams;
    use parley_types::error::RecordError;
    use parley_types::llm::{Message, Role};
    use tempfile::TempDir;

    use super::*;

    fn record(text: &str) -> SessionRecord {
        let json = serde_json::json!({
            "model": "gpt-4",
            "budget": {"ceiling": 8000},
            "turns": [{"role": "user", "content": text}],
        });
        SessionRecord::from_value(&json).unwrap()
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path().join("saves"));
        let mut saved = record("hello");
        saved.turns.push(Message::new(Role::Assistant, "hi there"));
        saved.budget = BudgetParams::new(4_000, 500, 100, Some(10));

        store.write("chat_1", &saved, false).await.unwrap();
        assert!(tmp.path().join("saves/chat_1.json").exists());

        let loaded = store.read("chat_1").await.unwrap();
        assert_eq!(loaded.turns, saved.turns);
        assert_eq!(loaded.budget, saved.budget);
        assert_eq!(loaded.session_id, saved.session_id);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        // A non-empty directory where the save file should go.
        std::fs::create_dir_all(tmp.path().join("blocked.json/inner")).unwrap();

        let err = store.write("blocked", &record("x"), true).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "{err:?}");
        assert!(!tmp.path().join("blocked.json.tmp").exists());
        assert!(tmp.path().join("blocked.json").is_dir());
    }

    #[tokio::test]
    async fn test_write_existing_without_overwrite_fails() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        store.write("a", &record("one"), false).await.unwrap();

        let err = store.write("a", &record("two"), false).await.unwrap_err();
        assert!(matches!(err, StoreError::Exists(ref n) if n == "a"));

        store.write("a", &record("two"), true).await.unwrap();
        assert_eq!(store.read("a").await.unwrap().turns[0].content, "two");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        let err = store.read("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bad_names_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        for name in ["", ".", "..", "../escape", "a/b", "with space"] {
            let err = store.write(name, &record("x"), true).await.unwrap_err();
            assert!(matches!(err, StoreError::BadName(_)), "accepted {name:?}");
        }
    }

    #[tokio::test]
    async fn test_names_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        assert!(store.names().await.unwrap().is_empty());

        store.write("zeta", &record("z"), false).await.unwrap();
        store.write("alpha", &record("a"), false).await.unwrap();
        tokio::fs::write(tmp.path().join("notes.txt"), "ignored").await.unwrap();

        assert_eq!(store.names().await.unwrap(), ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_missing_dir_has_no_saves() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path().join("never_created"));
        assert!(store.names().await.unwrap().is_empty());
        assert!(!store.exists("anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        store.write("gone", &record("x"), false).await.unwrap();
        store.delete("gone").await.unwrap();
        assert!(!store.exists("gone").await.unwrap());
        assert!(matches!(
            store.delete("gone").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_record_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = JsonDirStore::new(tmp.path());
        tokio::fs::write(tmp.path().join("broken.json"), r#"{"model": "gpt-4"}"#)
            .await
            .unwrap();
        let err = store.read("broken").await.unwrap_err();
        assert!(matches!(err, StoreError::Record(RecordError::MissingField(_))));
    }
}
