use std::path::Path;
use std::sync::Arc;

use openfilz_core::{
    CreateFolderRequest, DocumentInfo, DocumentSearchResult, DocumentType, FolderPage,
    OpenfilzClient, OpenfilzError, PageCriteria, SearchByMetadataRequest, SearchFilter,
    SearchSort, UploadFile,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::notify::{Notice, Notifier};
use crate::ops::bulk::{JoinReport, Partition, join_independent, partition_by_kind};
use crate::ops::retry::{DEFAULT_MAX_ATTEMPTS, TransferFailure, transfer_with_retry};
use crate::ops::{self, TransferAction, describe_error};
use crate::prefs::PreferenceStore;
use crate::view::{self, Destination, FolderRef, Item, Listing, Pagination};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Api(#[from] OpenfilzError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal state of a user action. Each one has already been reported
/// through the notifier by the time it is returned.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Some partitions of a bulk action went through, others did not.
    PartiallySucceeded,
    Failed,
    /// Nothing to do: empty selection, cancelled prompt, page out of range.
    Skipped,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        self == Outcome::Failed
    }
}

/// One browsing session: the folder on screen, its page, the selection and
/// the user's stored preferences.
pub struct Explorer {
    client: OpenfilzClient,
    notifier: Arc<dyn Notifier>,
    prefs: PreferenceStore,
    max_attempts: u32,
    listing: Listing,
    pagination: Pagination,
}

impl Explorer {
    pub fn new(
        client: OpenfilzClient,
        prefs: PreferenceStore,
        notifier: Arc<dyn Notifier>,
        default_page_size: u32,
    ) -> Self {
        let page_size = prefs.page_size(default_page_size);
        Self {
            client,
            notifier,
            prefs,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            listing: Listing::default(),
            pagination: Pagination::new(page_size),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn items(&self) -> &[Item] {
        self.listing.items()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    // Navigation

    pub async fn open_root(&mut self) -> Outcome {
        match self.fetch_first_page(None).await {
            Ok(page) => {
                self.listing.reset_to(None);
                self.apply_first_page(page);
                Outcome::Succeeded
            }
            Err(err) => self.load_failed(err),
        }
    }

    pub async fn open_folder(&mut self, folder: FolderRef) -> Outcome {
        match self.fetch_first_page(Some(&folder.id)).await {
            Ok(page) => {
                self.listing.enter(folder);
                self.apply_first_page(page);
                Outcome::Succeeded
            }
            Err(err) => self.load_failed(err),
        }
    }

    /// Jumps straight to a folder known only by id. Anything that is not a
    /// readable folder sends the user back to the root.
    pub async fn open_folder_by_id(&mut self, folder_id: &str) -> Outcome {
        let opened = async {
            let info = self.client.get_document_info(folder_id, None).await?;
            if info.document_type != DocumentType::Folder {
                return Ok(None);
            }
            let page = self.fetch_first_page(Some(folder_id)).await?;
            Ok::<_, OpenfilzError>(Some((info.name, page)))
        }
        .await;

        match opened {
            Ok(Some((name, page))) => {
                self.listing.reset_to(Some(FolderRef {
                    id: folder_id.to_string(),
                    name,
                }));
                self.apply_first_page(page);
                Outcome::Succeeded
            }
            Ok(None) => self.fall_back_to_root(folder_id, None).await,
            Err(err) => self.fall_back_to_root(folder_id, Some(err)).await,
        }
    }

    async fn fall_back_to_root(&mut self, folder_id: &str, err: Option<OpenfilzError>) -> Outcome {
        match err {
            Some(err) => tracing::warn!(folder_id, error = %err, "cannot open folder"),
            None => tracing::warn!(folder_id, "document is not a folder"),
        }
        self.notifier
            .notify(Notice::failure("Could not load the specified folder."));
        let _ = self.open_root().await;
        Outcome::Failed
    }

    /// Goes back to an ancestor on the breadcrumb trail.
    pub async fn go_to_breadcrumb(&mut self, index: usize) -> Outcome {
        let Some(folder) = self.listing.breadcrumbs().get(index).cloned() else {
            return Outcome::Skipped;
        };
        match self.fetch_first_page(Some(&folder.id)).await {
            Ok(page) => {
                self.listing.truncate_to(index);
                self.apply_first_page(page);
                Outcome::Succeeded
            }
            Err(err) => self.load_failed(err),
        }
    }

    /// Lists the current folder again from its first page.
    pub async fn reload(&mut self) -> Outcome {
        let folder_id = self.listing.current_id().map(str::to_string);
        match self.fetch_first_page(folder_id.as_deref()).await {
            Ok(page) => {
                self.apply_first_page(page);
                Outcome::Succeeded
            }
            Err(err) => self.load_failed(err),
        }
    }

    pub async fn next_page(&mut self) -> Outcome {
        let previous = self.pagination.page_index();
        if !self.pagination.next() {
            return Outcome::Skipped;
        }
        self.load_current_page(previous).await
    }

    pub async fn previous_page(&mut self) -> Outcome {
        let previous = self.pagination.page_index();
        if !self.pagination.previous() {
            return Outcome::Skipped;
        }
        self.load_current_page(previous).await
    }

    /// Loads the zero-based page `index` of the current folder.
    pub async fn go_to_page(&mut self, index: u32) -> Outcome {
        let previous = self.pagination.page_index();
        if !self.pagination.go_to(index) {
            return Outcome::Skipped;
        }
        self.load_current_page(previous).await
    }

    /// Fetches the page the cursor points at. On failure the cursor goes
    /// back to `previous` and the items on screen stay as they were.
    async fn load_current_page(&mut self, previous: u32) -> Outcome {
        let folder_id = self.listing.current_id().map(str::to_string);
        match self
            .client
            .list_folder(folder_id.as_deref(), self.pagination.criteria())
            .await
        {
            Ok(items) => {
                self.listing.replace(items);
                Outcome::Succeeded
            }
            Err(err) => {
                let page = self.pagination.page_index();
                tracing::warn!(page, error = %err, "failed to load page");
                let _ = self.pagination.go_to(previous);
                self.notifier.notify(Notice::failure("Failed to load files"));
                Outcome::Failed
            }
        }
    }

    /// Stores a new page size and starts over from the first page. Nothing
    /// changes on screen when the preference cannot be written.
    pub async fn set_page_size(&mut self, page_size: u32) -> Outcome {
        let page_size = page_size.max(1);
        if let Err(err) = self.prefs.set_page_size(page_size) {
            tracing::warn!(error = %err, "failed to persist page size");
            self.notifier
                .notify(Notice::failure("Failed to save page size preference"));
            return Outcome::Failed;
        }
        self.pagination.set_page_size(page_size);
        self.reload().await
    }

    async fn fetch_first_page(
        &self,
        folder_id: Option<&str>,
    ) -> Result<FolderPage, OpenfilzError> {
        tracing::debug!(folder_id, "listing folder");
        self.client
            .list_folder_and_count(folder_id, PageCriteria::new(1, self.pagination.page_size()))
            .await
    }

    fn apply_first_page(&mut self, page: FolderPage) {
        self.listing.replace(page.items);
        self.pagination.restart(page.total);
    }

    fn load_failed(&self, err: OpenfilzError) -> Outcome {
        tracing::warn!(error = %err, "failed to load folder");
        self.notifier
            .notify(Notice::failure("Failed to load folder contents"));
        Outcome::Failed
    }

    // Selection

    pub fn toggle_selection(&mut self, id: &str) -> Option<bool> {
        view::toggle_selection(self.listing.items_mut(), id)
    }

    pub fn select_all(&mut self, selected: bool) {
        view::select_all(self.listing.items_mut(), selected);
    }

    pub fn selected_items(&self) -> Vec<Item> {
        view::selected_items(self.listing.items())
    }

    /// Looks up name and kind for ids that are not necessarily on screen.
    pub async fn resolve_items(&self, ids: &[String]) -> Result<Vec<Item>, ExplorerError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let item = match self.listing.find(id) {
                Some(item) => item.clone(),
                None => {
                    let info = self.client.get_document_info(id, None).await?;
                    let mut item = Item::new(id.as_str(), info.name, info.document_type.into());
                    item.size = info.size;
                    item
                }
            };
            items.push(item);
        }
        Ok(items)
    }

    // Mutations

    pub async fn create_folder(&mut self, name: &str) -> Outcome {
        let request = CreateFolderRequest {
            name: name.to_string(),
            parent_id: self.listing.current_id().map(str::to_string),
        };
        match self.client.create_folder(&request).await {
            Ok(folder) => {
                tracing::info!(id = %folder.id, name, "folder created");
                self.succeed("Folder created successfully").await
            }
            Err(err) => self.fail("Failed to create folder", &err),
        }
    }

    pub async fn rename_item(&mut self, item: &Item, new_name: &str) -> Outcome {
        match ops::rename(&self.client, item.kind, &item.id, new_name).await {
            Ok(()) => {
                tracing::info!(id = %item.id, new_name, "item renamed");
                self.succeed("Item renamed successfully").await
            }
            Err(err) => self.fail("Failed to rename item", &err),
        }
    }

    pub async fn delete_selected(&mut self) -> Outcome {
        let selected = self.selected_items();
        self.delete_items(&selected).await
    }

    /// Deletes folders and files through their own endpoints, concurrently.
    pub async fn delete_items(&mut self, items: &[Item]) -> Outcome {
        if items.is_empty() {
            return Outcome::Skipped;
        }
        let client = &self.client;
        let report = join_independent(partition_by_kind(items), |partition: Partition| async move {
            ops::delete(client, partition.kind, &partition.ids).await
        })
        .await;

        self.settle_bulk(report, "Items deleted successfully".to_string(), |partition, err| {
            format!("Failed to delete {}s: {}", partition.kind.label(), describe_error(err))
        })
        .await
    }

    pub async fn move_item(&mut self, item: &Item, destination: &Destination) -> Outcome {
        self.transfer_item(TransferAction::Move, item, destination).await
    }

    pub async fn copy_item(&mut self, item: &Item, destination: &Destination) -> Outcome {
        self.transfer_item(TransferAction::Copy, item, destination).await
    }

    pub async fn transfer_item(
        &mut self,
        action: TransferAction,
        item: &Item,
        destination: &Destination,
    ) -> Outcome {
        self.transfer_items(action, std::slice::from_ref(item), destination)
            .await
    }

    /// Moves or copies the selection to whatever folder `pick_destination`
    /// returns. The prompt is never shown for an empty selection.
    pub async fn transfer_selected<P>(&mut self, action: TransferAction, pick_destination: P) -> Outcome
    where
        P: FnOnce(&[Item]) -> Option<Destination>,
    {
        let selected = self.selected_items();
        if selected.is_empty() {
            return Outcome::Skipped;
        }
        let Some(destination) = pick_destination(&selected) else {
            return Outcome::Skipped;
        };
        self.transfer_items(action, &selected, &destination).await
    }

    /// Splits `items` by kind and runs each group through the conflict retry
    /// concurrently. One success notice and one reload cover the whole batch.
    pub async fn transfer_items(
        &mut self,
        action: TransferAction,
        items: &[Item],
        destination: &Destination,
    ) -> Outcome {
        if items.is_empty() {
            return Outcome::Skipped;
        }
        tracing::info!(
            action = action.verb(),
            count = items.len(),
            target = destination.folder_id().unwrap_or("root"),
            "transferring items"
        );

        let client = &self.client;
        let max_attempts = self.max_attempts;
        let target = destination.folder_id();
        let report = join_independent(partition_by_kind(items), |partition: Partition| async move {
            transfer_with_retry(
                client,
                action,
                partition.kind,
                &partition.ids,
                target,
                max_attempts,
            )
            .await
        })
        .await;

        let success = match items {
            [item] => format!("\"{}\" {} successfully", item.name, action.past_tense()),
            _ => format!("{} items {} successfully", items.len(), action.past_tense()),
        };
        self.settle_bulk(report, success, |partition, failure: &TransferFailure| {
            format!(
                "Failed to {} {}s: {}",
                action.verb(),
                partition.kind.label(),
                failure.user_message()
            )
        })
        .await
    }

    async fn settle_bulk<E, D>(
        &mut self,
        report: JoinReport<Partition, E>,
        success: String,
        describe: D,
    ) -> Outcome
    where
        E: std::fmt::Display,
        D: Fn(&Partition, &E) -> String,
    {
        for (partition, err) in &report.failures {
            tracing::warn!(kind = partition.kind.label(), error = %err, "partition failed");
            self.notifier
                .notify(Notice::failure(describe(partition, err)));
        }

        if report.all_succeeded() {
            self.succeed(success).await
        } else if report.any_succeeded() {
            let _ = self.reload().await;
            Outcome::PartiallySucceeded
        } else {
            Outcome::Failed
        }
    }

    // Favorites

    pub async fn toggle_favorite(&mut self, id: &str) -> Outcome {
        match self.client.toggle_favorite(id).await {
            Ok(favorite) => {
                let name = match self.listing.items_mut().iter_mut().find(|item| item.id == id) {
                    Some(item) => {
                        item.favorite = favorite;
                        item.name.clone()
                    }
                    None => id.to_string(),
                };
                let message = if favorite {
                    format!("\"{name}\" added to favorites")
                } else {
                    format!("\"{name}\" removed from favorites")
                };
                self.notifier.notify(Notice::success(message));
                Outcome::Succeeded
            }
            Err(err) => self.fail("Failed to update favorite status", &err),
        }
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool, ExplorerError> {
        Ok(self.client.is_favorite(id).await?)
    }

    pub async fn favorites(&self) -> Result<Vec<Item>, ExplorerError> {
        let elements = self.client.list_favorites().await?;
        Ok(elements.into_iter().map(Item::from).collect())
    }

    // Metadata

    pub async fn document_info(&self, id: &str) -> Result<DocumentInfo, ExplorerError> {
        Ok(self.client.get_document_info(id, Some(true)).await?)
    }

    pub async fn update_metadata(&mut self, id: &str, metadata: Map<String, Value>) -> Outcome {
        if metadata.is_empty() {
            return Outcome::Skipped;
        }
        match self.client.update_metadata(id, metadata).await {
            Ok(_) => self.notify_success("Metadata saved successfully"),
            Err(err) => self.fail("Failed to save metadata", &err),
        }
    }

    pub async fn delete_metadata(&mut self, id: &str, keys: &[String]) -> Outcome {
        if keys.is_empty() {
            return Outcome::Skipped;
        }
        match self.client.delete_metadata_keys(id, keys).await {
            Ok(()) => self.notify_success("Metadata saved successfully"),
            Err(err) => self.fail("Failed to save metadata", &err),
        }
    }

    // Search

    /// Full-text search. `page` is zero-based like the folder pagination.
    pub async fn search(
        &self,
        query: &str,
        filters: &[SearchFilter],
        sort: Option<&SearchSort>,
        page: u32,
        size: u32,
    ) -> Result<DocumentSearchResult, ExplorerError> {
        tracing::debug!(query, page, size, "searching documents");
        Ok(self
            .client
            .search_documents(query, filters, sort, page.saturating_add(1), size.max(1))
            .await?)
    }

    pub async fn search_ids_by_metadata(
        &self,
        request: &SearchByMetadataRequest,
    ) -> Result<Vec<String>, ExplorerError> {
        Ok(self.client.search_ids_by_metadata(request).await?)
    }

    // Transfers to and from the local machine

    /// Uploads into the folder on screen.
    pub async fn upload(&mut self, mut files: Vec<UploadFile>, allow_duplicates: bool) -> Outcome {
        if files.is_empty() {
            return Outcome::Skipped;
        }
        let parent = self.listing.current_id().map(str::to_string);
        let result = if files.len() == 1 {
            let file = files.remove(0);
            self.client
                .upload_document(file, parent.as_deref(), None, Some(allow_duplicates))
                .await
                .map(|uploaded| vec![uploaded])
        } else {
            self.client
                .upload_documents(files, parent.as_deref(), Some(allow_duplicates))
                .await
        };

        match result {
            Ok(uploaded) => {
                tracing::info!(count = uploaded.len(), "files uploaded");
                self.succeed("Files uploaded successfully").await
            }
            Err(err) => self.fail("Failed to upload files", &err),
        }
    }

    pub async fn download_to(&self, id: &str, path: &Path) -> Outcome {
        let result = match self.client.download_document(id).await {
            Ok(bytes) => write_file(path, &bytes).await,
            Err(err) => Err(err.into()),
        };
        self.finish_download(result, path, "Failed to download file")
    }

    /// Downloads several documents as one zip archive.
    pub async fn download_zip_to(&self, ids: &[String], path: &Path) -> Outcome {
        if ids.is_empty() {
            return Outcome::Skipped;
        }
        let result = match self.client.download_documents_zip(ids).await {
            Ok(bytes) => write_file(path, &bytes).await,
            Err(err) => Err(err.into()),
        };
        self.finish_download(result, path, "Failed to download files")
    }

    fn finish_download(&self, result: Result<(), ExplorerError>, path: &Path, failure: &str) -> Outcome {
        match result {
            Ok(()) => self.notify_success(format!("Saved {}", path.display())),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "download failed");
                self.notifier.notify(Notice::failure(failure));
                Outcome::Failed
            }
        }
    }

    // Recycle bin

    pub async fn recycle_bin(&self) -> Result<Vec<Item>, ExplorerError> {
        let elements = self.client.list_recycle_bin().await?;
        Ok(elements.into_iter().map(Item::from).collect())
    }

    pub async fn recycle_bin_count(&self) -> Result<u64, ExplorerError> {
        Ok(self.client.count_recycle_bin().await?)
    }

    pub async fn restore(&mut self, ids: &[String]) -> Outcome {
        if ids.is_empty() {
            return Outcome::Skipped;
        }
        match self.client.restore_items(ids).await {
            Ok(()) => self.succeed("Items restored successfully").await,
            Err(err) => self.fail("Failed to restore items", &err),
        }
    }

    pub async fn purge(&mut self, ids: &[String]) -> Outcome {
        if ids.is_empty() {
            return Outcome::Skipped;
        }
        match self.client.purge_items(ids).await {
            Ok(()) => self.notify_success("Items permanently deleted"),
            Err(err) => self.fail("Failed to delete items permanently", &err),
        }
    }

    pub async fn empty_recycle_bin(&mut self) -> Outcome {
        match self.client.empty_recycle_bin().await {
            Ok(()) => self.notify_success("Recycle bin emptied"),
            Err(err) => self.fail("Failed to empty recycle bin", &err),
        }
    }

    // Reporting

    /// Success notice followed by a reload of the current folder.
    async fn succeed(&mut self, message: impl Into<String>) -> Outcome {
        self.notifier.notify(Notice::success(message));
        let _ = self.reload().await;
        Outcome::Succeeded
    }

    fn notify_success(&self, message: impl Into<String>) -> Outcome {
        self.notifier.notify(Notice::success(message));
        Outcome::Succeeded
    }

    fn fail(&self, message: &str, err: &OpenfilzError) -> Outcome {
        tracing::warn!(error = %err, "{message}");
        self.notifier
            .notify(Notice::failure(format!("{message}: {}", describe_error(err))));
        Outcome::Failed
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExplorerError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ExplorerError::Write {
            path: path.display().to_string(),
            source,
        })
}

