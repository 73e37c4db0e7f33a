//! Process and task repositories (spec §2, §3). Narrow, single-purpose
//! stores, each guarded by its own lock — mirrors `warden_fabric`'s repo
//! module rather than a single "god repository".

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ControlError, ControlResult};
use crate::model::{Process, ProcessId, TaskAssignment};

#[derive(Debug, Default)]
pub struct ProcessRepository {
    by_id: RwLock<HashMap<ProcessId, Process>>,
}

impl ProcessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, process: Process) {
        self.by_id.write().expect("process repo lock poisoned").insert(process.id.clone(), process);
    }

    pub fn get(&self, id: &str) -> Option<Process> {
        self.by_id.read().expect("process repo lock poisoned").get(id).cloned()
    }

    pub fn require(&self, id: &str) -> ControlResult<Process> {
        self.get(id).ok_or_else(|| ControlError::ProcessNotFound { process_id: id.to_string() })
    }

    pub fn update(&self, process: Process) {
        self.by_id.write().expect("process repo lock poisoned").insert(process.id.clone(), process);
    }

    pub fn all(&self) -> Vec<Process> {
        self.by_id.read().expect("process repo lock poisoned").values().cloned().collect()
    }

    pub fn coordinator(&self) -> Option<Process> {
        self.by_id
            .read()
            .expect("process repo lock poisoned")
            .values()
            .find(|p| matches!(p.role, crate::model::ProcessRole::Coordinator))
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct TaskRepository {
    by_id: RwLock<HashMap<String, TaskAssignment>>,
}

impl TaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: TaskAssignment) {
        self.by_id.write().expect("task repo lock poisoned").insert(task.task_id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<TaskAssignment> {
        self.by_id.read().expect("task repo lock poisoned").get(task_id).cloned()
    }

    pub fn require(&self, task_id: &str) -> ControlResult<TaskAssignment> {
        self.get(task_id).ok_or_else(|| ControlError::TaskNotFound { task_id: task_id.to_string() })
    }

    pub fn remove(&self, task_id: &str) -> Option<TaskAssignment> {
        self.by_id.write().expect("task repo lock poisoned").remove(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Process;

    #[test]
    fn process_require_reports_not_found() {
        let repo = ProcessRepository::new();
        let err = repo.require("missing").unwrap_err();
        assert!(matches!(err, ControlError::ProcessNotFound { .. }));
    }

    #[test]
    fn task_remove_returns_removed_value() {
        let repo = TaskRepository::new();
        repo.insert(TaskAssignment {
            task_id: "T".into(),
            implementer: "w1".into(),
            reviewer: "w2".into(),
            status: crate::model::TaskStatus::Implementing,
        });
        assert!(repo.remove("T").is_some());
        assert!(repo.get("T").is_none());
    }

    #[test]
    fn coordinator_lookup_finds_the_single_coordinator() {
        let repo = ProcessRepository::new();
        repo.insert(Process::new_worker("w1"));
        repo.insert(Process::new_coordinator("c1"));
        assert_eq!(repo.coordinator().unwrap().id, "c1");
    }
}
