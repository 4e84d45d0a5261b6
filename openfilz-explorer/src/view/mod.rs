mod listing;
mod pagination;
mod selection;

pub use listing::{Destination, FolderRef, Item, ItemKind, Listing};
pub use pagination::{DEFAULT_PAGE_SIZE, Pagination};
pub use selection::{select_all, selected_items, toggle_selection};
