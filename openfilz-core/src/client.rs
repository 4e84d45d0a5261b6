use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::models::{
    CopyResponse, CreateFolderRequest, DeleteMetadataRequest, DeleteRequest, DocumentInfo,
    ElementInfo, ErrorResponse, FolderElementInfo, FolderResponse, RenameRequest,
    SearchByMetadataRequest, TransferRequest, UpdateMetadataRequest, UploadResponse,
};

const API_PREFIX: [&str; 2] = ["api", "v1"];
const GRAPHQL_PREFIX: [&str; 2] = ["graphql", "v1"];

#[derive(Debug, Error)]
pub enum OpenfilzError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    BaseUrl(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("graphql errors: {0}")]
    GraphQl(String),
    #[error("graphql response missing data")]
    MissingData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    Conflict,
    NotFound,
    Other,
}

/// A file handed to the upload endpoints.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Clone)]
pub struct OpenfilzClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl OpenfilzClient {
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, OpenfilzError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(OpenfilzError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        })
    }

    // Folders

    pub async fn create_folder(
        &self,
        request: &CreateFolderRequest,
    ) -> Result<FolderResponse, OpenfilzError> {
        let url = self.endpoint(&["folders"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn rename_folder(
        &self,
        folder_id: &str,
        new_name: &str,
    ) -> Result<ElementInfo, OpenfilzError> {
        let url = self.endpoint(&["folders", folder_id, "rename"])?;
        self.put_json(url, &rename_request(new_name)).await
    }

    pub async fn move_folders(&self, request: &TransferRequest) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["folders", "move"])?;
        self.post_empty(url, request).await
    }

    pub async fn copy_folders(&self, request: &TransferRequest) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["folders", "copy"])?;
        self.post_empty(url, request).await
    }

    pub async fn delete_folders(&self, document_ids: &[String]) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["folders"])?;
        self.delete_with_body(url, &delete_request(document_ids))
            .await
    }

    // Files

    pub async fn rename_file(
        &self,
        file_id: &str,
        new_name: &str,
    ) -> Result<ElementInfo, OpenfilzError> {
        let url = self.endpoint(&["files", file_id, "rename"])?;
        self.put_json(url, &rename_request(new_name)).await
    }

    pub async fn move_files(&self, request: &TransferRequest) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["files", "move"])?;
        self.post_empty(url, request).await
    }

    pub async fn copy_files(
        &self,
        request: &TransferRequest,
    ) -> Result<Vec<CopyResponse>, OpenfilzError> {
        let url = self.endpoint(&["files", "copy"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete_files(&self, document_ids: &[String]) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["files"])?;
        self.delete_with_body(url, &delete_request(document_ids))
            .await
    }

    // Documents

    pub async fn get_document_info(
        &self,
        document_id: &str,
        with_metadata: Option<bool>,
    ) -> Result<DocumentInfo, OpenfilzError> {
        let mut url = self.endpoint(&["documents", document_id, "info"])?;
        if let Some(with_metadata) = with_metadata {
            url.query_pairs_mut()
                .append_pair("withMetadata", bool_param(with_metadata));
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn download_document(&self, document_id: &str) -> Result<Vec<u8>, OpenfilzError> {
        let url = self.endpoint(&["documents", document_id, "download"])?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_bytes(response).await
    }

    /// Downloads several documents bundled by the backend into one zip archive.
    pub async fn download_documents_zip(
        &self,
        document_ids: &[String],
    ) -> Result<Vec<u8>, OpenfilzError> {
        let url = self.endpoint(&["documents", "download-multiple"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(document_ids)
            .send()
            .await?;
        Self::handle_bytes(response).await
    }

    pub async fn upload_document(
        &self,
        file: UploadFile,
        parent_folder_id: Option<&str>,
        metadata: Option<&Map<String, Value>>,
        allow_duplicate_file_names: Option<bool>,
    ) -> Result<UploadResponse, OpenfilzError> {
        let mut url = self.endpoint(&["documents", "upload"])?;
        if let Some(allow) = allow_duplicate_file_names {
            url.query_pairs_mut()
                .append_pair("allowDuplicateFileNames", bool_param(allow));
        }
        let mut form = Form::new().part("file", file_part(file));
        if let Some(parent) = parent_folder_id {
            form = form.text("parentFolderId", parent.to_string());
        }
        if let Some(metadata) = metadata {
            form = form.text("metadata", serde_json::to_string(metadata)?);
        }
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .multipart(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn upload_documents(
        &self,
        files: Vec<UploadFile>,
        parent_folder_id: Option<&str>,
        allow_duplicate_file_names: Option<bool>,
    ) -> Result<Vec<UploadResponse>, OpenfilzError> {
        let mut url = self.endpoint(&["documents", "upload-multiple"])?;
        if let Some(allow) = allow_duplicate_file_names {
            url.query_pairs_mut()
                .append_pair("allowDuplicateFileNames", bool_param(allow));
        }
        let parameters: Vec<Value> = files
            .iter()
            .map(|file| {
                serde_json::json!({
                    "filename": file.file_name,
                    "fileAttributes": { "parentFolderId": parent_folder_id },
                })
            })
            .collect();
        let mut form = Form::new();
        for file in files {
            form = form.part("file", file_part(file));
        }
        if parent_folder_id.is_some() {
            let part = Part::text(serde_json::to_string(&parameters)?)
                .mime_str("application/json")?;
            form = form.part("parametersByFilename", part);
        }
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .multipart(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn update_metadata(
        &self,
        document_id: &str,
        metadata: Map<String, Value>,
    ) -> Result<ElementInfo, OpenfilzError> {
        let url = self.endpoint(&["documents", document_id, "metadata"])?;
        let response = self
            .http
            .patch(url)
            .header("Authorization", self.auth_header_value())
            .json(&UpdateMetadataRequest {
                metadata_to_update: metadata,
            })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete_metadata_keys(
        &self,
        document_id: &str,
        keys: &[String],
    ) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["documents", document_id, "metadata"])?;
        self.delete_with_body(
            url,
            &DeleteMetadataRequest {
                metadata_keys_to_delete: keys.to_vec(),
            },
        )
        .await
    }

    pub async fn search_ids_by_metadata(
        &self,
        request: &SearchByMetadataRequest,
    ) -> Result<Vec<String>, OpenfilzError> {
        let url = self.endpoint(&["documents", "search", "ids-by-metadata"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // Favorites

    /// Flips the favorite flag and returns the new state.
    pub async fn toggle_favorite(&self, document_id: &str) -> Result<bool, OpenfilzError> {
        let url = self.endpoint(&["favorites", document_id, "toggle"])?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn is_favorite(&self, document_id: &str) -> Result<bool, OpenfilzError> {
        let url = self.endpoint(&["favorites", document_id, "is-favorite"])?;
        self.get_json(url).await
    }

    pub async fn list_favorites(&self) -> Result<Vec<FolderElementInfo>, OpenfilzError> {
        let url = self.endpoint(&["favorites"])?;
        self.get_json(url).await
    }

    // Recycle bin

    pub async fn list_recycle_bin(&self) -> Result<Vec<FolderElementInfo>, OpenfilzError> {
        let url = self.endpoint(&["recycle-bin"])?;
        self.get_json(url).await
    }

    pub async fn count_recycle_bin(&self) -> Result<u64, OpenfilzError> {
        let url = self.endpoint(&["recycle-bin", "count"])?;
        self.get_json(url).await
    }

    pub async fn restore_items(&self, document_ids: &[String]) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["recycle-bin", "restore"])?;
        self.post_empty(url, &delete_request(document_ids)).await
    }

    pub async fn purge_items(&self, document_ids: &[String]) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["recycle-bin"])?;
        self.delete_with_body(url, &delete_request(document_ids))
            .await
    }

    pub async fn empty_recycle_bin(&self) -> Result<(), OpenfilzError> {
        let url = self.endpoint(&["recycle-bin", "empty"])?;
        let response = self
            .http
            .delete(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub(crate) fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, OpenfilzError> {
        self.join_segments(&API_PREFIX, segments)
    }

    pub(crate) fn graphql_endpoint(&self) -> Result<Url, OpenfilzError> {
        self.join_segments(&GRAPHQL_PREFIX, &[])
    }

    fn join_segments(&self, prefix: &[&str], segments: &[&str]) -> Result<Url, OpenfilzError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OpenfilzError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(prefix)
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, OpenfilzError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn put_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, OpenfilzError> {
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn post_empty<B: Serialize>(&self, url: Url, body: &B) -> Result<(), OpenfilzError> {
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(body)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    async fn delete_with_body<B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(), OpenfilzError> {
        let response = self
            .http
            .delete(url)
            .header("Authorization", self.auth_header_value())
            .json(body)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenfilzError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn handle_empty(response: reqwest::Response) -> Result<(), OpenfilzError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn handle_bytes(response: reqwest::Response) -> Result<Vec<u8>, OpenfilzError> {
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> OpenfilzError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        OpenfilzError::Api { status, body }
    }
}

impl OpenfilzError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            OpenfilzError::Api { status, .. } => Some(*status),
            OpenfilzError::Request(err) => err.status(),
            _ => None,
        }
    }

    pub fn classification(&self) -> Option<ApiErrorClass> {
        self.status().map(classify_api_status)
    }

    /// True when the backend refused the operation because of a duplicate name.
    pub fn is_conflict(&self) -> bool {
        matches!(self.classification(), Some(ApiErrorClass::Conflict))
    }

    /// Message from the backend error body when it has one, otherwise the display form.
    pub fn message(&self) -> String {
        if let OpenfilzError::Api { body, .. } = self
            && let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body)
            && !parsed.message.is_empty()
        {
            return parsed.message;
        }
        self.to_string()
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::CONFLICT {
        ApiErrorClass::Conflict
    } else if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else {
        ApiErrorClass::Other
    }
}

fn rename_request(new_name: &str) -> RenameRequest {
    RenameRequest {
        new_name: new_name.to_string(),
    }
}

fn delete_request(document_ids: &[String]) -> DeleteRequest {
    DeleteRequest {
        document_ids: document_ids.to_vec(),
    }
}

fn file_part(file: UploadFile) -> Part {
    Part::bytes(file.content).file_name(file.file_name)
}

fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
