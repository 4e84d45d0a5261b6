use openfilz_core::{DocumentType, FolderElementInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Folder,
    File,
}

impl From<DocumentType> for ItemKind {
    fn from(value: DocumentType) -> Self {
        match value {
            DocumentType::Folder => ItemKind::Folder,
            DocumentType::File => ItemKind::File,
        }
    }
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::File => "file",
        }
    }
}

/// One row of a folder listing. `selected` only lives in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub size: Option<u64>,
    pub favorite: bool,
    pub selected: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            size: None,
            favorite: false,
            selected: false,
        }
    }
}

impl From<FolderElementInfo> for Item {
    fn from(value: FolderElementInfo) -> Self {
        Self {
            id: value.id,
            name: value.name,
            kind: value.document_type.into(),
            size: value.size,
            favorite: value.is_favorite.unwrap_or(false),
            selected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

impl From<&Item> for FolderRef {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
        }
    }
}

/// Target of a move or copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Root,
    Folder(String),
}

impl Destination {
    pub fn folder_id(&self) -> Option<&str> {
        match self {
            Destination::Root => None,
            Destination::Folder(id) => Some(id.as_str()),
        }
    }
}

/// Contents of the folder on screen plus the breadcrumb trail leading to it.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    items: Vec<Item>,
    current: Option<FolderRef>,
    breadcrumbs: Vec<FolderRef>,
}

impl Listing {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn current(&self) -> Option<&FolderRef> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|folder| folder.id.as_str())
    }

    pub fn breadcrumbs(&self) -> &[FolderRef] {
        &self.breadcrumbs
    }

    /// Swaps in a freshly fetched page. Every selection flag starts cleared.
    pub fn replace(&mut self, elements: Vec<FolderElementInfo>) {
        self.items = elements.into_iter().map(Item::from).collect();
    }

    pub fn find(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub(crate) fn enter(&mut self, folder: FolderRef) {
        self.breadcrumbs.push(folder.clone());
        self.current = Some(folder);
    }

    pub(crate) fn reset_to(&mut self, folder: Option<FolderRef>) {
        self.breadcrumbs = folder.iter().cloned().collect();
        self.current = folder;
    }

    /// Cuts the trail back to `index`. Returns false when the index is out of range.
    pub(crate) fn truncate_to(&mut self, index: usize) -> bool {
        if index >= self.breadcrumbs.len() {
            return false;
        }
        self.breadcrumbs.truncate(index + 1);
        self.current = self.breadcrumbs.last().cloned();
        true
    }
}
