use std::future::Future;

use futures_util::future::join_all;

use crate::view::{Item, ItemKind};

/// Ids of one kind, sent together in a single bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub kind: ItemKind,
    pub ids: Vec<String>,
}

/// Splits items by kind, folders first. Empty groups are dropped.
pub fn partition_by_kind(items: &[Item]) -> Vec<Partition> {
    [ItemKind::Folder, ItemKind::File]
        .into_iter()
        .map(|kind| Partition {
            kind,
            ids: items
                .iter()
                .filter(|item| item.kind == kind)
                .map(|item| item.id.clone())
                .collect(),
        })
        .filter(|partition| !partition.ids.is_empty())
        .collect()
}

#[derive(Debug)]
pub struct JoinReport<K, E> {
    pub total: usize,
    pub completed: usize,
    pub failures: Vec<(K, E)>,
}

impl<K, E> JoinReport<K, E> {
    pub fn all_succeeded(&self) -> bool {
        self.completed == self.total
    }

    pub fn any_succeeded(&self) -> bool {
        self.completed > 0
    }
}

/// Runs one operation per key concurrently and waits for every one to settle.
pub async fn join_independent<K, T, E, F, Fut>(keys: Vec<K>, op: F) -> JoinReport<K, E>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = keys.len();
    let results = join_all(keys.iter().cloned().map(&op)).await;

    let mut completed = 0;
    let mut failures = Vec::new();
    for (key, result) in keys.into_iter().zip(results) {
        match result {
            Ok(_) => completed += 1,
            Err(err) => failures.push((key, err)),
        }
    }

    JoinReport {
        total,
        completed,
        failures,
    }
}
