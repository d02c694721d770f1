//! Radio station repository.

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::radio::model::Radio;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("radio '{0}' not found")]
    NotFound(String),
}

/// Storage for radio station records.
pub trait RadioRepository: Send + Sync {
    /// All stations, sorted by name.
    fn get_all(&self) -> Vec<Radio>;

    fn get(&self, id: &str) -> Option<Radio>;

    /// Insert a new station (empty `id`, one is generated) or replace an
    /// existing one. Returns the stored record.
    fn put(&self, radio: Radio) -> Result<Radio, StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Process-local repository. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRadioRepository {
    radios: DashMap<String, Radio>,
}

impl InMemoryRadioRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RadioRepository for InMemoryRadioRepository {
    fn get_all(&self) -> Vec<Radio> {
        let mut all: Vec<Radio> = self.radios.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id)));
        all
    }

    fn get(&self, id: &str) -> Option<Radio> {
        self.radios.get(id).map(|r| r.value().clone())
    }

    fn put(&self, mut radio: Radio) -> Result<Radio, StoreError> {
        if radio.id.is_empty() {
            radio.id = Uuid::new_v4().to_string();
        } else if !self.radios.contains_key(&radio.id) {
            return Err(StoreError::NotFound(radio.id));
        }
        self.radios.insert(radio.id.clone(), radio.clone());
        Ok(radio)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.radios
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
