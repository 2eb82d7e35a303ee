use crate::models::history::OutcomeRecord;
use crate::wal::wal::{Wal, WalOperation};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded, journaled log of download outcomes, oldest first
pub struct OutcomeHistory {
    records: Mutex<VecDeque<OutcomeRecord>>,
    capacity: usize,
    wal: Option<Arc<Wal>>,
}

impl OutcomeHistory {
    pub fn new(capacity: usize, wal: Arc<Wal>) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            wal: Some(wal),
        }
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            wal: None,
        }
    }

    pub fn record(&self, record: OutcomeRecord) -> Result<()> {
        let mut records = self.records.lock();

        if let Some(wal) = &self.wal {
            wal.log_operation(&WalOperation::Outcome { record: record.clone() })?;
        }

        push_bounded(&mut records, record, self.capacity);
        Ok(())
    }

    /// Apply a replayed journal entry without journaling it again
    pub fn restore(&self, record: OutcomeRecord) {
        let mut records = self.records.lock();
        push_bounded(&mut records, record, self.capacity);
    }

    pub fn all(&self) -> Vec<OutcomeRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// The newest `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<OutcomeRecord> {
        self.records.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Every record for one identifier, oldest first
    pub fn for_identifier(&self, info_hash: &str) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.info_hash == info_hash)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn push_bounded(records: &mut VecDeque<OutcomeRecord>, record: OutcomeRecord, capacity: usize) {
    records.push_back(record);
    while records.len() > capacity {
        records.pop_front();
    }
}
