//! Subject identity persisted in the key-value store.

use crate::domain::error::AbTestError;
use crate::ports::identity_port::IdentityPort;
use crate::ports::storage_port::StoragePort;
use std::sync::Arc;
use uuid::Uuid;

pub const SUBJECT_ID_KEY: &str = "ab_test_user_id";

pub struct StoredIdentity {
    storage: Arc<dyn StoragePort>,
}

impl StoredIdentity {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }
}

impl IdentityPort for StoredIdentity {
    fn subject_id(&self) -> Result<String, AbTestError> {
        if let Some(id) = self
            .storage
            .get(SUBJECT_ID_KEY)?
            .filter(|id| !id.trim().is_empty())
        {
            return Ok(id);
        }
        let id = format!("user_{}", Uuid::new_v4().simple());
        self.storage.set(SUBJECT_ID_KEY, &id)?;
        Ok(id)
    }
}
