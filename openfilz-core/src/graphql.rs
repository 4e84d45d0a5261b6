use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::{OpenfilzClient, OpenfilzError};
use crate::models::{
    DocumentSearchResult, FolderElementInfo, FolderPage, ListFolderRequest, PageCriteria,
    SearchFilter, SearchSort,
};

const LIST_FOLDER_QUERY: &str = r#"
query listFolder($request: ListFolderRequest!) {
  listFolder(request: $request) {
    id
    type
    contentType
    name
    size
    createdAt
    updatedAt
    createdBy
    updatedBy
    favorite
  }
}
"#;

const LIST_FOLDER_AND_COUNT_QUERY: &str = r#"
query listFolderAndCount($request1: ListFolderRequest!, $request2: ListFolderRequest) {
  listFolder(request: $request1) {
    id
    type
    contentType
    name
    size
    createdAt
    updatedAt
    createdBy
    updatedBy
    favorite
  }
  count(request: $request2)
}
"#;

const SEARCH_DOCUMENTS_QUERY: &str = r#"
query searchDocuments($query: String, $filters: [FilterInput], $sort: SortInput, $page: Int!, $size: Int!) {
  searchDocuments(query: $query, filters: $filters, sort: $sort, page: $page, size: $size) {
    totalHits
    documents {
      id
      name
      extension
      size
      parentId
      createdAt
      updatedAt
      createdBy
      updatedBy
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFolderData {
    list_folder: Vec<FolderElementInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFolderAndCountData {
    list_folder: Vec<FolderElementInfo>,
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDocumentsData {
    search_documents: Option<DocumentSearchResult>,
}

impl OpenfilzClient {
    /// Lists one page of a folder. `folder_id` of `None` lists the root.
    pub async fn list_folder(
        &self,
        folder_id: Option<&str>,
        page: PageCriteria,
    ) -> Result<Vec<FolderElementInfo>, OpenfilzError> {
        let request = ListFolderRequest {
            id: folder_id.map(str::to_string),
            page_info: Some(page),
        };
        let data: ListFolderData = self
            .graphql(LIST_FOLDER_QUERY, json!({ "request": request }))
            .await?;
        Ok(data.list_folder)
    }

    /// Fetches one page and the folder's total count in a single round trip.
    pub async fn list_folder_and_count(
        &self,
        folder_id: Option<&str>,
        page: PageCriteria,
    ) -> Result<FolderPage, OpenfilzError> {
        let request1 = ListFolderRequest {
            id: folder_id.map(str::to_string),
            page_info: Some(page),
        };
        let request2 = ListFolderRequest {
            id: folder_id.map(str::to_string),
            page_info: None,
        };
        let data: ListFolderAndCountData = self
            .graphql(
                LIST_FOLDER_AND_COUNT_QUERY,
                json!({ "request1": request1, "request2": request2 }),
            )
            .await?;
        Ok(FolderPage {
            items: data.list_folder,
            total: data.count,
        })
    }

    /// Full-text search. `page` is 1-based, like folder listings.
    pub async fn search_documents(
        &self,
        query: &str,
        filters: &[SearchFilter],
        sort: Option<&SearchSort>,
        page: u32,
        size: u32,
    ) -> Result<DocumentSearchResult, OpenfilzError> {
        let data: SearchDocumentsData = self
            .graphql(
                SEARCH_DOCUMENTS_QUERY,
                json!({
                    "query": query,
                    "filters": filters,
                    "sort": sort,
                    "page": page,
                    "size": size,
                }),
            )
            .await?;
        Ok(data.search_documents.unwrap_or(DocumentSearchResult {
            total_hits: 0,
            documents: Vec::new(),
        }))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, OpenfilzError> {
        let url = self.graphql_endpoint()?;
        let response = self
            .http()
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let payload: GraphQlResponse<T> = Self::handle_response(response).await?;
        if !payload.errors.is_empty() {
            let messages: Vec<String> = payload.errors.into_iter().map(|e| e.message).collect();
            return Err(OpenfilzError::GraphQl(messages.join("; ")));
        }
        payload.data.ok_or(OpenfilzError::MissingData)
    }
}
