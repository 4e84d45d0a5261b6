pub mod bulk;
pub mod retry;

use openfilz_core::{ApiErrorClass, OpenfilzClient, OpenfilzError, TransferRequest};

use crate::view::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Move,
    Copy,
}

impl TransferAction {
    pub fn verb(self) -> &'static str {
        match self {
            TransferAction::Move => "move",
            TransferAction::Copy => "copy",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            TransferAction::Move => "moved",
            TransferAction::Copy => "copied",
        }
    }
}

/// Text shown to the user for a failed call. Authorization and missing
/// documents get a fixed wording, anything else keeps the backend's message.
pub fn describe_error(err: &OpenfilzError) -> String {
    match err.classification() {
        Some(ApiErrorClass::Auth) => "access denied, check the API token".to_string(),
        Some(ApiErrorClass::NotFound) => "the item no longer exists".to_string(),
        Some(ApiErrorClass::Conflict | ApiErrorClass::Other) | None => err.message(),
    }
}

/// Sends one move or copy call to the endpoint matching `kind`.
pub async fn transfer(
    client: &OpenfilzClient,
    action: TransferAction,
    kind: ItemKind,
    request: &TransferRequest,
) -> Result<(), OpenfilzError> {
    match (action, kind) {
        (TransferAction::Move, ItemKind::Folder) => client.move_folders(request).await,
        (TransferAction::Move, ItemKind::File) => client.move_files(request).await,
        (TransferAction::Copy, ItemKind::Folder) => client.copy_folders(request).await,
        (TransferAction::Copy, ItemKind::File) => client.copy_files(request).await.map(|_| ()),
    }
}

/// Deletes a same-kind group through the endpoint matching `kind`.
pub async fn delete(
    client: &OpenfilzClient,
    kind: ItemKind,
    ids: &[String],
) -> Result<(), OpenfilzError> {
    match kind {
        ItemKind::Folder => client.delete_folders(ids).await,
        ItemKind::File => client.delete_files(ids).await,
    }
}

pub async fn rename(
    client: &OpenfilzClient,
    kind: ItemKind,
    id: &str,
    new_name: &str,
) -> Result<(), OpenfilzError> {
    match kind {
        ItemKind::Folder => client.rename_folder(id, new_name).await.map(|_| ()),
        ItemKind::File => client.rename_file(id, new_name).await.map(|_| ()),
    }
}
