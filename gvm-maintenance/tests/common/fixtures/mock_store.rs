//! Scripted relational store
//!
//! Text and count queries are answered by the first registered fragment the
//! SQL contains. Maintenance statements are keyed by their first word.

use async_trait::async_trait;
use gvm_maintenance::database::{SqlStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum ExecuteBehavior {
    Succeed,
    StatementError(String),
    Unavailable(String),
    /// Never completes, so only the caller's timeout ends it
    Hang,
}

#[derive(Default)]
pub struct MockStore {
    texts: Vec<(String, String)>,
    counts: Vec<(String, i64)>,
    statements: HashMap<String, ExecuteBehavior>,
    unavailable: bool,
    executed: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection refused for every call.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, fragment: &str, value: &str) -> Self {
        self.texts.push((fragment.to_string(), value.to_string()));
        self
    }

    pub fn with_count(mut self, fragment: &str, value: i64) -> Self {
        self.counts.push((fragment.to_string(), value));
        self
    }

    pub fn with_statement(mut self, keyword: &str, behavior: ExecuteBehavior) -> Self {
        self.statements.insert(keyword.to_string(), behavior);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn refuse(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SqlStore for MockStore {
    async fn fetch_text(&self, sql: &str) -> Result<Option<String>, StoreError> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.refuse()?;
        Ok(self
            .texts
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, value)| value.clone()))
    }

    async fn fetch_count(&self, sql: &str) -> Result<i64, StoreError> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.refuse()?;
        Ok(self
            .counts
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, value)| *value)
            .unwrap_or(0))
    }

    async fn execute(&self, sql: &str) -> Result<(), StoreError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.refuse()?;

        let keyword = sql.split_whitespace().next().unwrap_or_default();
        match self.statements.get(keyword).cloned().unwrap_or(ExecuteBehavior::Succeed) {
            ExecuteBehavior::Succeed => Ok(()),
            ExecuteBehavior::StatementError(msg) => Err(StoreError::Statement(msg)),
            ExecuteBehavior::Unavailable(msg) => Err(StoreError::Unavailable(msg)),
            ExecuteBehavior::Hang => std::future::pending().await,
        }
    }
}
