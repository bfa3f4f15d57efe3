//! Optimistic overlay bookkeeping for the remote store.
//!
//! Every in-flight mutation is a transaction carrying exactly the data needed
//! to undo its optimistic effect, so rolling back is a pure data operation.

use std::collections::{HashMap, HashSet};

use crate::lesson::{Lesson, LessonId};

pub type TxId = u64;

/// Undo payload of one optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Undo {
    /// `add` / `add_many`: the temporary ids that were prepended.
    Created(Vec<LessonId>),
    /// `update`: the targeted record as it was before the change. `None` when
    /// the id was not visible, in which case there is nothing to restore.
    Updated { id: LessonId, before: Option<Lesson> },
    /// `remove`: the whole visible sequence as it was before the call.
    Removed(Vec<Lesson>),
}

impl Undo {
    pub fn revert(self, lessons: &mut Vec<Lesson>) {
        match self {
            Undo::Created(ids) => {
                let ids: HashSet<LessonId> = ids.into_iter().collect();
                lessons.retain(|l| !ids.contains(&l.id));
            }
            Undo::Updated { id, before } => {
                if let Some(before) = before {
                    for lesson in lessons.iter_mut().filter(|l| l.id == id) {
                        *lesson = before.clone();
                    }
                }
            }
            Undo::Removed(prior) => *lessons = prior,
        }
    }

    fn created_ids(&self) -> &[LessonId] {
        match self {
            Undo::Created(ids) => ids,
            _ => &[],
        }
    }
}

/// Client-owned state layered over the last delivered snapshot.
#[derive(Debug, Default)]
pub struct Overlay {
    next_tx: TxId,
    pending: HashMap<TxId, Undo>,
    optimistic: HashSet<LessonId>,
}

impl Overlay {
    /// Register an in-flight mutation.
    pub fn begin(&mut self, undo: Undo) -> TxId {
        self.next_tx += 1;
        let tx = self.next_tx;
        self.optimistic.extend(undo.created_ids().iter().cloned());
        self.pending.insert(tx, undo);
        tx
    }

    /// The write succeeded. Optimistic records stay visible until the next
    /// snapshot supersedes them.
    pub fn commit(&mut self, tx: TxId) {
        self.pending.remove(&tx);
    }

    /// The write failed: undo its optimistic effect on `lessons`.
    pub fn rollback(&mut self, tx: TxId, lessons: &mut Vec<Lesson>) {
        if let Some(undo) = self.pending.remove(&tx) {
            for id in undo.created_ids() {
                self.optimistic.remove(id);
            }
            undo.revert(lessons);
        }
    }

    /// A full snapshot arrived; no optimistic record survives it.
    pub fn supersede(&mut self) {
        self.optimistic.clear();
    }

    pub fn optimistic_ids(&self) -> Vec<LessonId> {
        let mut ids: Vec<_> = self.optimistic.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
