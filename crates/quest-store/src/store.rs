//! Local progress store
//!
//! Persists each identity's tasks and goals as JSON arrays under
//! `tasks_<address>` and `goals_<address>`. The store knows nothing about
//! the ledger; it is authoritative only for what the user authored.
//!
//! Completion is two-phase: `begin_*` marks a record pending, and only
//! `commit_*` flips it to completed. `abort_*` returns it to open so the
//! user can retry.

use crate::backend::StoreBackend;
use crate::error::{RecordKind, StoreError, StoreResult};
use crate::snapshot::derive_snapshot;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use quest_types::{Address, Goal, LocalSnapshot, NewGoal, NewTask, RecordId, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Common shape of tasks and goals
trait Record: Serialize + DeserializeOwned + Clone {
    const KIND: RecordKind;
    const PREFIX: &'static str;

    fn id(&self) -> RecordId;
    fn completed(&self) -> bool;
    fn pending(&self) -> bool;
    fn set_pending(&mut self, pending: bool);
    fn mark_completed(&mut self, at: DateTime<Utc>);
}

impl Record for Task {
    const KIND: RecordKind = RecordKind::Task;
    const PREFIX: &'static str = "tasks";

    fn id(&self) -> RecordId {
        self.id
    }
    fn completed(&self) -> bool {
        self.completed
    }
    fn pending(&self) -> bool {
        self.pending
    }
    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
    fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.pending = false;
        self.completed = true;
        self.completed_at = Some(at);
    }
}

impl Record for Goal {
    const KIND: RecordKind = RecordKind::Goal;
    const PREFIX: &'static str = "goals";

    fn id(&self) -> RecordId {
        self.id
    }
    fn completed(&self) -> bool {
        self.completed
    }
    fn pending(&self) -> bool {
        self.pending
    }
    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
    fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.pending = false;
        self.completed = true;
        self.completed_at = Some(at);
    }
}

const SEQ_PREFIX: &str = "seq";

fn key(prefix: &str, identity: &Address) -> String {
    format!("{prefix}_{identity}")
}

/// Per-identity store of tasks and goals
#[derive(Debug, Clone)]
pub struct ProgressStore {
    backend: Arc<dyn StoreBackend>,
    /// Serialises read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
}

impl ProgressStore {
    /// Create store over a backend
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    // ---- tasks ----

    /// All tasks of `identity`, in creation order
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn tasks(&self, identity: &Address) -> StoreResult<Vec<Task>> {
        self.load(identity)
    }

    /// One task by id
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn task(&self, identity: &Address, id: RecordId) -> StoreResult<Option<Task>> {
        Ok(self.tasks(identity)?.into_iter().find(|t| t.id == id))
    }

    /// Create a task and allocate its ledger id
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn add_task(&self, identity: &Address, new: NewTask) -> StoreResult<Task> {
        let _guard = self.write_lock.lock();
        let mut tasks: Vec<Task> = self.load(identity)?;
        let task = Task {
            id: RecordId::new(),
            ledger_id: self.next_ledger_id(identity)?,
            title: new.title,
            description: new.description,
            priority: new.priority,
            due_date: new.due_date,
            completed: false,
            pending: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        tasks.push(task.clone());
        self.save(identity, &tasks)?;
        tracing::debug!(identity = %identity, task_id = %task.id, ledger_id = task.ledger_id, "task added");
        Ok(task)
    }

    /// Replace the user-authored fields of an open task
    ///
    /// # Errors
    /// Returns [`StoreError::CompletionPending`] while a completion is in
    /// flight, or a storage error
    pub fn update_task_details(&self, identity: &Address, id: RecordId, details: NewTask) -> StoreResult<Task> {
        self.modify::<Task, _>(identity, id, |task| {
            if task.pending {
                return Err(StoreError::CompletionPending {
                    kind: RecordKind::Task,
                    id,
                });
            }
            task.title = details.title;
            task.description = details.description;
            task.priority = details.priority;
            task.due_date = details.due_date;
            Ok(task.clone())
        })
    }

    /// Delete a task; returns whether it existed
    ///
    /// # Errors
    /// Returns [`StoreError::CompletionPending`] while a completion is in
    /// flight, or a storage error
    pub fn remove_task(&self, identity: &Address, id: RecordId) -> StoreResult<bool> {
        self.remove::<Task>(identity, id)
    }

    /// Mark an open task pending
    ///
    /// # Errors
    /// Returns `NotFound`, `AlreadyCompleted` or `CompletionPending`, or a
    /// storage error
    pub fn begin_task_completion(&self, identity: &Address, id: RecordId) -> StoreResult<Task> {
        self.begin(identity, id)
    }

    /// Flip a pending task to completed
    ///
    /// # Errors
    /// Returns `NotFound` or `NotPending`, or a storage error
    pub fn commit_task_completion(&self, identity: &Address, id: RecordId, at: DateTime<Utc>) -> StoreResult<Task> {
        self.commit(identity, id, at)
    }

    /// Return a pending task to open
    ///
    /// # Errors
    /// Returns `NotFound` or `NotPending`, or a storage error
    pub fn abort_task_completion(&self, identity: &Address, id: RecordId) -> StoreResult<Task> {
        self.abort(identity, id)
    }

    // ---- goals ----

    /// All goals of `identity`, in creation order
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn goals(&self, identity: &Address) -> StoreResult<Vec<Goal>> {
        self.load(identity)
    }

    /// One goal by id
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn goal(&self, identity: &Address, id: RecordId) -> StoreResult<Option<Goal>> {
        Ok(self.goals(identity)?.into_iter().find(|g| g.id == id))
    }

    /// Create a goal and allocate its ledger id
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn add_goal(&self, identity: &Address, new: NewGoal) -> StoreResult<Goal> {
        let _guard = self.write_lock.lock();
        let mut goals: Vec<Goal> = self.load(identity)?;
        let goal = Goal {
            id: RecordId::new(),
            ledger_id: self.next_ledger_id(identity)?,
            title: new.title,
            description: new.description,
            week_start: new.week_start,
            completed: false,
            pending: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        goals.push(goal.clone());
        self.save(identity, &goals)?;
        tracing::debug!(identity = %identity, goal_id = %goal.id, ledger_id = goal.ledger_id, "goal added");
        Ok(goal)
    }

    /// Delete a goal; returns whether it existed
    ///
    /// # Errors
    /// Returns [`StoreError::CompletionPending`] while a completion is in
    /// flight, or a storage error
    pub fn remove_goal(&self, identity: &Address, id: RecordId) -> StoreResult<bool> {
        self.remove::<Goal>(identity, id)
    }

    /// Mark an open goal pending
    ///
    /// # Errors
    /// Returns `NotFound`, `AlreadyCompleted` or `CompletionPending`, or a
    /// storage error
    pub fn begin_goal_completion(&self, identity: &Address, id: RecordId) -> StoreResult<Goal> {
        self.begin(identity, id)
    }

    /// Flip a pending goal to completed
    ///
    /// # Errors
    /// Returns `NotFound` or `NotPending`, or a storage error
    pub fn commit_goal_completion(&self, identity: &Address, id: RecordId, at: DateTime<Utc>) -> StoreResult<Goal> {
        self.commit(identity, id, at)
    }

    /// Return a pending goal to open
    ///
    /// # Errors
    /// Returns `NotFound` or `NotPending`, or a storage error
    pub fn abort_goal_completion(&self, identity: &Address, id: RecordId) -> StoreResult<Goal> {
        self.abort(identity, id)
    }

    // ---- identity-wide ----

    /// Clear pending flags left behind by an interrupted session
    ///
    /// Returns the number of records reopened.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn clear_stale_pending(&self, identity: &Address) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();
        let reopened = self.clear_pending::<Task>(identity)? + self.clear_pending::<Goal>(identity)?;
        if reopened > 0 {
            tracing::info!(identity = %identity, reopened, "cleared stale pending completions");
        }
        Ok(reopened)
    }

    /// Local counters as of today (UTC)
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn snapshot(&self, identity: &Address) -> StoreResult<LocalSnapshot> {
        self.snapshot_at(identity, Utc::now().date_naive())
    }

    /// Local counters as of `today`
    ///
    /// # Errors
    /// Returns [`StoreError`] if the backend fails or the value is corrupt
    pub fn snapshot_at(&self, identity: &Address, today: NaiveDate) -> StoreResult<LocalSnapshot> {
        Ok(derive_snapshot(&self.tasks(identity)?, &self.goals(identity)?, today))
    }

    // ---- internals ----

    fn load<R: Record>(&self, identity: &Address) -> StoreResult<Vec<R>> {
        let key = key(R::PREFIX, identity);
        match self.backend.get(&key)? {
            Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(Vec::new()),
        }
    }

    fn save<R: Record>(&self, identity: &Address, records: &[R]) -> StoreResult<()> {
        let key = key(R::PREFIX, identity);
        let text = serde_json::to_string(records).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;
        self.backend.set(&key, &text)
    }

    /// Caller must hold `write_lock`
    fn next_ledger_id(&self, identity: &Address) -> StoreResult<u64> {
        let key = key(SEQ_PREFIX, identity);
        let next: u64 = match self.backend.get(&key)? {
            Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: key.clone(),
                source,
            })?,
            None => 1,
        };
        self.backend.set(&key, &(next + 1).to_string())?;
        Ok(next)
    }

    fn modify<R: Record, T>(
        &self,
        identity: &Address,
        id: RecordId,
        f: impl FnOnce(&mut R) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _guard = self.write_lock.lock();
        let mut records: Vec<R> = self.load(identity)?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(StoreError::NotFound { kind: R::KIND, id })?;
        let out = f(record)?;
        self.save(identity, &records)?;
        Ok(out)
    }

    fn remove<R: Record>(&self, identity: &Address, id: RecordId) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        let mut records: Vec<R> = self.load(identity)?;
        let Some(idx) = records.iter().position(|r| r.id() == id) else {
            return Ok(false);
        };
        if records[idx].pending() {
            return Err(StoreError::CompletionPending { kind: R::KIND, id });
        }
        records.remove(idx);
        self.save(identity, &records)?;
        Ok(true)
    }

    fn begin<R: Record>(&self, identity: &Address, id: RecordId) -> StoreResult<R> {
        self.modify::<R, _>(identity, id, |record| {
            if record.completed() {
                return Err(StoreError::AlreadyCompleted { kind: R::KIND, id });
            }
            if record.pending() {
                return Err(StoreError::CompletionPending { kind: R::KIND, id });
            }
            record.set_pending(true);
            Ok(record.clone())
        })
    }

    fn commit<R: Record>(&self, identity: &Address, id: RecordId, at: DateTime<Utc>) -> StoreResult<R> {
        self.modify::<R, _>(identity, id, |record| {
            if !record.pending() {
                return Err(StoreError::NotPending { kind: R::KIND, id });
            }
            record.mark_completed(at);
            Ok(record.clone())
        })
    }

    fn abort<R: Record>(&self, identity: &Address, id: RecordId) -> StoreResult<R> {
        self.modify::<R, _>(identity, id, |record| {
            if !record.pending() {
                return Err(StoreError::NotPending { kind: R::KIND, id });
            }
            record.set_pending(false);
            Ok(record.clone())
        })
    }

    /// Caller must hold `write_lock`
    fn clear_pending<R: Record>(&self, identity: &Address) -> StoreResult<usize> {
        let mut records: Vec<R> = self.load(identity)?;
        let mut reopened = 0;
        for record in records.iter_mut().filter(|r| r.pending()) {
            record.set_pending(false);
            reopened += 1;
        }
        if reopened > 0 {
            self.save(identity, &records)?;
        }
        Ok(reopened)
    }
}
