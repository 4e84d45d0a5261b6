use super::listing::Item;

/// Flips the flag of the item with `id`. Returns the new state, or `None` if no such item is listed.
pub fn toggle_selection(items: &mut [Item], id: &str) -> Option<bool> {
    let item = items.iter_mut().find(|item| item.id == id)?;
    item.selected = !item.selected;
    Some(item.selected)
}

pub fn select_all(items: &mut [Item], selected: bool) {
    for item in items {
        item.selected = selected;
    }
}

pub fn selected_items(items: &[Item]) -> Vec<Item> {
    items.iter().filter(|item| item.selected).cloned().collect()
}
