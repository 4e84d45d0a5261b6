use std::future::Future;

use openfilz_core::{OpenfilzClient, OpenfilzError, TransferRequest};
use thiserror::Error;

use super::{TransferAction, describe_error, transfer};
use crate::view::ItemKind;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Attempt counter for one logical move or copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// False on the first attempt only.
    pub fn allow_duplicate_names(&self) -> bool {
        self.attempt > 1
    }

    /// State for the attempt after a name conflict, if one is allowed.
    ///
    /// Only the first conflict earns a retry: from the second attempt on the
    /// request already accepts duplicate names, so sending it again cannot
    /// change the answer.
    pub fn after_conflict(self) -> Option<Self> {
        (self.attempt == 1 && self.max_attempts > 1).then_some(Self {
            attempt: 2,
            ..self
        })
    }
}

#[derive(Debug, Error)]
pub enum TransferFailure {
    #[error("max retries reached after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: OpenfilzError,
    },
    #[error("{source}")]
    Rejected {
        attempt: u32,
        #[source]
        source: OpenfilzError,
    },
}

impl TransferFailure {
    /// Short text for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            TransferFailure::RetriesExhausted { .. } => "max retries reached".to_string(),
            TransferFailure::Rejected { source, .. } => describe_error(source),
        }
    }
}

/// Runs `call` until it succeeds, fails for a reason other than a name
/// conflict, or runs out of meaningful attempts. Each call gets the current
/// state so it can build a fresh request.
pub async fn with_conflict_retry<T, F, Fut>(
    max_attempts: u32,
    mut call: F,
) -> Result<T, TransferFailure>
where
    F: FnMut(RetryState) -> Fut,
    Fut: Future<Output = Result<T, OpenfilzError>>,
{
    let mut state = RetryState::new(max_attempts);
    loop {
        match call(state).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict() => match state.after_conflict() {
                Some(next) => {
                    tracing::info!(
                        attempt = next.attempt(),
                        "name conflict, retrying with duplicate names allowed"
                    );
                    state = next;
                }
                None => {
                    tracing::warn!(attempt = state.attempt(), "name conflict persisted");
                    return Err(TransferFailure::RetriesExhausted {
                        attempts: state.attempt(),
                        source: err,
                    });
                }
            },
            Err(err) => {
                return Err(TransferFailure::Rejected {
                    attempt: state.attempt(),
                    source: err,
                });
            }
        }
    }
}

/// Moves or copies a same-kind group, resolving one name conflict by allowing duplicates.
pub async fn transfer_with_retry(
    client: &OpenfilzClient,
    action: TransferAction,
    kind: ItemKind,
    ids: &[String],
    target_folder_id: Option<&str>,
    max_attempts: u32,
) -> Result<(), TransferFailure> {
    with_conflict_retry(max_attempts, |state| {
        let request = TransferRequest {
            document_ids: ids.to_vec(),
            target_folder_id: target_folder_id.map(str::to_string),
            allow_duplicate_file_names: state.allow_duplicate_names(),
        };
        async move { transfer(client, action, kind, &request).await }
    })
    .await
}
