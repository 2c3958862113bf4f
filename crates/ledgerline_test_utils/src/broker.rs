//! Broker fake that records every session.

use ledgerline_protocol::{
    Broker, BrokerConfig, BrokerSession, Record, ServiceError, ServiceResult,
};
use std::sync::{Arc, Mutex};

use crate::lock;

#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub config: BrokerConfig,
    pub records: Vec<(String, Record)>,
    pub flushes: usize,
    pub closed: bool,
}

#[derive(Debug, Default, Clone)]
pub struct RecordingBroker {
    sessions: Arc<Mutex<Vec<RecordedSession>>>,
    refuse_connections: bool,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `connect` fails.
    pub fn refusing() -> Self {
        Self {
            refuse_connections: true,
            ..Self::default()
        }
    }

    pub fn sessions(&self) -> Vec<RecordedSession> {
        lock(&self.sessions).clone()
    }
}

impl Broker for RecordingBroker {
    fn connect(&self, config: &BrokerConfig) -> ServiceResult<Box<dyn BrokerSession>> {
        if self.refuse_connections {
            return Err(ServiceError::failed("connection refused"));
        }
        let mut sessions = lock(&self.sessions);
        sessions.push(RecordedSession {
            config: config.clone(),
            records: Vec::new(),
            flushes: 0,
            closed: false,
        });
        Ok(Box::new(RecordingSession {
            index: sessions.len() - 1,
            sessions: Arc::clone(&self.sessions),
        }))
    }
}

struct RecordingSession {
    index: usize,
    sessions: Arc<Mutex<Vec<RecordedSession>>>,
}

impl RecordingSession {
    fn with_session(&self, f: impl FnOnce(&mut RecordedSession)) -> ServiceResult<()> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(self.index)
            .ok_or_else(|| ServiceError::failed("session vanished"))?;
        if session.closed {
            return Err(ServiceError::failed("session already closed"));
        }
        f(session);
        Ok(())
    }
}

impl BrokerSession for RecordingSession {
    fn publish(&mut self, topic: &str, record: &Record) -> ServiceResult<()> {
        self.with_session(|s| s.records.push((topic.to_string(), record.clone())))
    }

    fn flush(&mut self) -> ServiceResult<()> {
        self.with_session(|s| s.flushes += 1)
    }

    fn close(self: Box<Self>) -> ServiceResult<()> {
        self.with_session(|s| s.closed = true)
    }
}
