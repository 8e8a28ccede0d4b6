// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use ccm_events::CorrelationId;

use crate::{session::Session, AggregatorError, Registration};

/// Table of live sessions keyed by correlation id.
///
/// The table lock only guards membership; each session carries its own lock so messages for
/// different correlation ids never contend.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<CorrelationId, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CorrelationId, Arc<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CorrelationId, Arc<Session>>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a new pending session. A terminal session under the same id is replaced.
    pub(crate) fn insert(&self, registration: Registration) -> Result<Arc<Session>, AggregatorError> {
        let session = Arc::new(Session::new(registration)?);
        let mut sessions = self.write();
        if let Some(existing) = sessions.get(session.id()) {
            if existing.is_pending() {
                return Err(AggregatorError::DuplicateCorrelation(session.id().clone()));
            }
        }
        sessions.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    pub(crate) fn get(&self, id: &CorrelationId) -> Option<Arc<Session>> {
        self.read().get(id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<Session>> {
        self.read().values().cloned().collect()
    }

    pub(crate) fn remove_if(&self, id: &CorrelationId, pred: impl Fn(&Session) -> bool) -> bool {
        let mut sessions = self.write();
        match sessions.get(id) {
            Some(session) if pred(session) => {
                sessions.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.read().contains_key(id)
    }
}
