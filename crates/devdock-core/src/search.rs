// ── List search & pagination ──
//
// Pure helpers over device snapshots. Privileged views search a single
// selected field; regular views match name OR description. Both are
// case-insensitive substring matches.

use crate::model::Device;

/// Page size used by list views.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Which field a privileged search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Description,
    CreatedBy,
}

/// Filter a device list.
///
/// `field: Some(_)` searches only that field (the privileged mode);
/// `None` matches name or description (the regular mode). An empty query
/// matches everything.
pub fn filter_devices<'a>(
    devices: &'a [Device],
    query: &str,
    field: Option<SearchField>,
) -> Vec<&'a Device> {
    if query.is_empty() {
        return devices.iter().collect();
    }

    let needle = query.to_lowercase();
    devices
        .iter()
        .filter(|d| match field {
            Some(SearchField::Name) => d.name.to_lowercase().contains(&needle),
            Some(SearchField::Description) => d.description.to_lowercase().contains(&needle),
            Some(SearchField::CreatedBy) => d
                .created_by
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&needle),
            None => {
                d.name.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
            }
        })
        .collect()
}

/// One page of a filtered list.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number, clamped into range.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice a list into a fixed-size page. Pages are 1-based; out-of-range
/// requests clamp to the nearest valid page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let slice = items
        .get(start..(start + page_size).min(total_items))
        .unwrap_or_default();

    Page {
        items: slice.to_vec(),
        page,
        total_pages,
        total_items,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn device(id: i64, name: &str, description: &str, created_by: &str) -> Device {
        Device {
            id,
            name: name.into(),
            description: description.into(),
            created_by: Some(created_by.into()),
            deleted: false,
        }
    }

    fn fixture() -> Vec<Device> {
        vec![
            device(1, "Sensor-A", "hallway temperature", "alice"),
            device(2, "Sensor-B", "yard humidity", "bob"),
            device(3, "Gateway", "main uplink", "alice"),
        ]
    }

    #[test]
    fn empty_query_matches_everything() {
        let devices = fixture();
        assert_eq!(filter_devices(&devices, "", None).len(), 3);
    }

    #[test]
    fn regular_search_spans_name_and_description() {
        let devices = fixture();

        // "yard" only appears in a description.
        let hits = filter_devices(&devices, "YARD", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);

        // "sensor" appears in two names.
        assert_eq!(filter_devices(&devices, "sensor", None).len(), 2);
    }

    #[test]
    fn privileged_search_targets_one_field() {
        let devices = fixture();

        // Name-scoped search must not match descriptions.
        assert!(filter_devices(&devices, "yard", Some(SearchField::Name)).is_empty());

        let by_creator = filter_devices(&devices, "alice", Some(SearchField::CreatedBy));
        assert_eq!(by_creator.len(), 2);

        let by_desc = filter_devices(&devices, "uplink", Some(SearchField::Description));
        assert_eq!(by_desc.len(), 1);
        assert_eq!(by_desc[0].id, 3);
    }

    #[test]
    fn paginate_splits_and_clamps() {
        let items: Vec<i64> = (1..=12).collect();

        let first = paginate(&items, 1, 5);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 12);

        let last = paginate(&items, 3, 5);
        assert_eq!(last.items, vec![11, 12]);

        // Out-of-range requests clamp.
        assert_eq!(paginate(&items, 99, 5).page, 3);
        assert_eq!(paginate(&items, 0, 5).page, 1);
    }

    #[test]
    fn paginate_empty_list_yields_one_empty_page() {
        let items: Vec<i64> = Vec::new();
        let page = paginate(&items, 1, 5);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
