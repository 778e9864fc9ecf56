//! Rotating autosave.
//!
//! Saves cycle through `slots` entries named `{name}_0`, `{name}_1`, ...,
//! overwriting the oldest. The most recent slot is found by comparing the
//! `saved_at` stamp inside each record, so it survives restarts.

use parley_types::config::AutosaveConfig;
use parley_types::error::StoreError;
use parley_types::record::SessionRecord;

use super::store::SaveStore;

#[derive(Debug, Clone)]
pub struct Autosave {
    name: String,
    slots: u32,
    frequency: u32,
    ticks: u32,
    next_slot: u32,
}

impl Autosave {
    pub fn new(config: &AutosaveConfig) -> Self {
        Self {
            name: config.name.clone(),
            slots: config.slots.max(1),
            frequency: config.frequency,
            ticks: 0,
            next_slot: 0,
        }
    }

    pub fn slot_name(&self, index: u32) -> String {
        format!("{}_{index}", self.name)
    }

    pub fn backup_name(&self, index: u32) -> String {
        format!("{}_backup_{index}", self.name)
    }

    pub fn slot_names(&self) -> Vec<String> {
        (0..self.slots).map(|i| self.slot_name(i)).collect()
    }

    /// Count one turn. Returns `true` when a save is due.
    ///
    /// A frequency of zero never fires.
    pub fn tick(&mut self) -> bool {
        if self.frequency == 0 {
            return false;
        }
        self.ticks += 1;
        if self.ticks >= self.frequency {
            self.ticks = 0;
            return true;
        }
        false
    }

    /// Write `record` into the next slot, overwriting it.
    pub async fn save_now<S: SaveStore>(
        &mut self,
        store: &S,
        record: &SessionRecord,
    ) -> Result<String, StoreError> {
        let name = self.slot_name(self.next_slot);
        store.write(&name, record, true).await?;
        self.next_slot = (self.next_slot + 1) % self.slots;
        tracing::debug!(slot = %name, "autosaved session");
        Ok(name)
    }

    /// The slot holding the newest record, if any slot exists.
    ///
    /// Also moves the rotation past that slot so the next save does not
    /// overwrite it. Slots that fail to read are skipped with a warning.
    pub async fn most_recent<S: SaveStore>(
        &mut self,
        store: &S,
    ) -> Result<Option<(String, SessionRecord)>, StoreError> {
        let mut newest: Option<(u32, SessionRecord)> = None;
        for index in 0..self.slots {
            let name = self.slot_name(index);
            if !store.exists(&name).await? {
                continue;
            }
            let record = match store.read(&name).await {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(slot = %name, error = %err, "skipping unreadable autosave");
                    continue;
                }
            };
            let is_newer = match &newest {
                None => true,
                Some((_, best)) => record.saved_at > best.saved_at,
            };
            if is_newer {
                newest = Some((index, record));
            }
        }
        Ok(newest.map(|(index, record)| {
            self.next_slot = (index + 1) % self.slots;
            (self.slot_name(index), record)
        }))
    }

    /// Copy each existing slot to `{name}_backup_{i}`. Returns how many were
    /// copied; unreadable slots are skipped with a warning.
    pub async fn backup<S: SaveStore>(&self, store: &S) -> Result<usize, StoreError> {
        let mut copied = 0;
        for index in 0..self.slots {
            let name = self.slot_name(index);
            if !store.exists(&name).await? {
                continue;
            }
            let record = match store.read(&name).await {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(slot = %name, error = %err, "skipping unreadable autosave in backup");
                    continue;
                }
            };
            store.write(&self.backup_name(index), &record, true).await?;
            copied += 1;
        }
        tracing::info!(copied, "backed up autosave slots");
        Ok(copied)
    }

    /// Delete every existing slot. Returns how many were deleted.
    pub async fn clear<S: SaveStore>(&mut self, store: &S) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for name in self.slot_names() {
            if store.exists(&name).await? {
                store.delete(&name).await?;
                deleted += 1;
            }
        }
        self.ticks = 0;
        self.next_slot = 0;
        tracing::info!(deleted, "cleared autosave slots");
        Ok(deleted)
    }
}
