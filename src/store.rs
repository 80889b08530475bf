use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};

use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::message::Message;
use crate::model::{ContentRecord, DataType, Facility, HandoffRecord, Settings, UserSession};
use crate::pipeline::EventContext;

pub trait ContentStore: Send + Sync {
    fn get_by_id(&self, partition: &str, data_id: &str) -> EngineResult<Option<ContentRecord>>;
    fn get_by_type(&self, partition: &str, data_type: &DataType) -> EngineResult<Vec<ContentRecord>>;
    fn get_partition(&self, partition: &str) -> EngineResult<Vec<ContentRecord>>;
}

pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> EngineResult<Option<Settings>>;
    fn save_settings(&self, settings: &Settings) -> EngineResult<()>;
}

pub trait SessionStore: Send + Sync {
    fn get_locale(&self, user_id: &str) -> EngineResult<Option<String>>;
    fn set_active_special_flow(&self, user_id: &str, flow: Option<&str>) -> EngineResult<()>;
    fn set_last_content_id(&self, user_id: &str, data_id: &str) -> EngineResult<()>;
}

pub trait FacilityStore: Send + Sync {
    fn facility_by_name(&self, name: &str) -> EngineResult<Option<Facility>>;
}

pub trait HandoffLog: Send + Sync {
    fn open_handoffs(&self, user_id: &str) -> EngineResult<Vec<HandoffRecord>>;
    fn upsert(&self, record: HandoffRecord) -> EngineResult<()>;
}

/// Gets first refusal on every event. Returning `Some` with messages ends
/// resolution.
pub trait SpecialFlowHandler: Send + Sync {
    fn handle(&self, event: &Event, ctx: &EventContext) -> EngineResult<Option<Vec<Message>>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpecialFlow;

impl SpecialFlowHandler for NoSpecialFlow {
    fn handle(&self, _event: &Event, _ctx: &EventContext) -> EngineResult<Option<Vec<Message>>> {
        Ok(None)
    }
}

/// Platform calls made by administrative operations.
pub trait Transmitter {
    fn broadcast(&self, messages: &[Message]) -> EngineResult<()>;
    fn set_default_menu(&self, menu_id: &str) -> EngineResult<()>;
    fn cancel_default_menu(&self) -> EngineResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    /// partition key -> data id -> record
    content: BTreeMap<String, BTreeMap<String, ContentRecord>>,
    facilities: BTreeMap<String, Facility>,
    settings: Option<Settings>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    sessions: Mutex<BTreeMap<String, UserSession>>,
    handoffs: Mutex<Vec<HandoffRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a record, returning the one it replaced.
    pub fn insert_record(&self, record: ContentRecord) -> Option<ContentRecord> {
        self.write()
            .content
            .entry(record.scenario.clone())
            .or_default()
            .insert(record.data_id.clone(), record)
    }

    pub fn insert_facility(&self, facility: Facility) {
        self.write()
            .facilities
            .insert(facility.facility_name.clone(), facility);
    }

    pub fn set_settings(&self, settings: Settings) {
        self.write().settings = Some(settings);
    }

    pub fn set_session(&self, user_id: impl Into<String>, session: UserSession) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.into(), session);
    }

    pub fn set_locale(&self, user_id: &str, locale: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .locale = Some(locale.to_string());
    }

    pub fn session(&self, user_id: &str) -> Option<UserSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    pub fn handoffs(&self) -> Vec<HandoffRecord> {
        self.handoffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn record_count(&self) -> usize {
        self.read().content.values().map(BTreeMap::len).sum()
    }

    pub fn facility_count(&self) -> usize {
        self.read().facilities.len()
    }

    pub fn current_settings(&self) -> Option<Settings> {
        self.read().settings.clone()
    }
}

impl ContentStore for MemoryStore {
    fn get_by_id(&self, partition: &str, data_id: &str) -> EngineResult<Option<ContentRecord>> {
        Ok(self
            .read()
            .content
            .get(partition)
            .and_then(|records| records.get(data_id))
            .cloned())
    }

    fn get_by_type(&self, partition: &str, data_type: &DataType) -> EngineResult<Vec<ContentRecord>> {
        Ok(self
            .read()
            .content
            .get(partition)
            .map(|records| {
                records
                    .values()
                    .filter(|record| &record.data_type == data_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_partition(&self, partition: &str) -> EngineResult<Vec<ContentRecord>> {
        Ok(self
            .read()
            .content
            .get(partition)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

impl SettingsStore for MemoryStore {
    fn settings(&self) -> EngineResult<Option<Settings>> {
        Ok(self.current_settings())
    }

    fn save_settings(&self, settings: &Settings) -> EngineResult<()> {
        self.set_settings(settings.clone());
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn get_locale(&self, user_id: &str) -> EngineResult<Option<String>> {
        Ok(self.session(user_id).and_then(|session| session.locale))
    }

    fn set_active_special_flow(&self, user_id: &str, flow: Option<&str>) -> EngineResult<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get_mut(user_id) {
            session.special_flow = flow.map(str::to_string);
        } else if let Some(flow) = flow {
            sessions.insert(
                user_id.to_string(),
                UserSession {
                    special_flow: Some(flow.to_string()),
                    ..UserSession::default()
                },
            );
        }
        Ok(())
    }

    fn set_last_content_id(&self, user_id: &str, data_id: &str) -> EngineResult<()> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .last_content_id = Some(data_id.to_string());
        Ok(())
    }
}

impl FacilityStore for MemoryStore {
    fn facility_by_name(&self, name: &str) -> EngineResult<Option<Facility>> {
        Ok(self.read().facilities.get(name).cloned())
    }
}

impl HandoffLog for MemoryStore {
    fn open_handoffs(&self, user_id: &str) -> EngineResult<Vec<HandoffRecord>> {
        Ok(self
            .handoffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.user_id == user_id && record.is_open())
            .cloned()
            .collect())
    }

    fn upsert(&self, record: HandoffRecord) -> EngineResult<()> {
        if record.id.is_empty() {
            return Err(EngineError::Store("hand-off record without id".into()));
        }
        let mut handoffs = self.handoffs.lock().unwrap_or_else(PoisonError::into_inner);
        match handoffs.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => handoffs.push(record),
        }
        Ok(())
    }
}
