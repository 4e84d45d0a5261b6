mod client;
mod graphql;
mod models;

pub use client::{ApiErrorClass, OpenfilzClient, OpenfilzError, UploadFile};
pub use reqwest::StatusCode;
pub use models::{
    CopyResponse, CreateFolderRequest, DeleteMetadataRequest, DeleteRequest, DocumentInfo,
    DocumentSearchInfo, DocumentSearchResult, DocumentType, ElementInfo, ErrorResponse,
    FolderElementInfo, FolderPage, FolderResponse, ListFolderRequest, PageCriteria,
    RenameRequest, SearchByMetadataRequest, SearchFilter, SearchSort, SortOrder,
    TransferRequest, UpdateMetadataRequest, UploadResponse,
};
