//! Page number sequences for paginated catalog listings.
//!
//! Long page ranges collapse into a window around the current page with
//! ellipses, so a pager never shows more than seven entries.

use serde::{Serialize, Serializer};

/// Page ranges up to this length are shown in full.
const MAX_FULL_RANGE: u32 = 7;

/// One entry in a pager.
///
/// Serializes as a bare number or the string `"..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A clickable page number (1-based).
    Page(u32),
    /// A gap in the sequence.
    Ellipsis,
}

impl std::fmt::Display for PageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => serializer.serialize_u32(*n),
            Self::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Build the pager entries for `current_page` out of `total_pages`.
///
/// - up to seven pages: every page
/// - near the start: `1 2 3 ... n-1 n`
/// - near the end: `1 2 ... n-2 n-1 n`
/// - otherwise: `1 ... c-1 c c+1 ... n`
///
/// ```
/// use tienda_core::{PageItem, pagination_numbers};
///
/// let items = pagination_numbers(5, 10);
/// let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
/// assert_eq!(labels, ["1", "...", "4", "5", "6", "...", "10"]);
/// ```
#[must_use]
pub fn pagination_numbers(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total_pages <= MAX_FULL_RANGE {
        return (1..=total_pages).map(Page).collect();
    }

    if current_page <= 3 {
        return vec![
            Page(1),
            Page(2),
            Page(3),
            Ellipsis,
            Page(total_pages - 1),
            Page(total_pages),
        ];
    }

    if current_page >= total_pages - 2 {
        return vec![
            Page(1),
            Page(2),
            Ellipsis,
            Page(total_pages - 2),
            Page(total_pages - 1),
            Page(total_pages),
        ];
    }

    vec![
        Page(1),
        Ellipsis,
        Page(current_page - 1),
        Page(current_page),
        Page(current_page + 1),
        Ellipsis,
        Page(total_pages),
    ]
}

/// Number of pages needed for `total_count` items at `per_page` each.
///
/// Always at least one page, so an empty catalog still renders a pager.
#[must_use]
pub fn total_pages(total_count: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    let pages = total_count.div_ceil(per_page).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::PageItem::{Ellipsis, Page};
    use super::*;

    #[test]
    fn test_short_range_shows_every_page() {
        assert_eq!(pagination_numbers(1, 1), vec![Page(1)]);
        assert_eq!(
            pagination_numbers(4, 7),
            (1..=7).map(Page).collect::<Vec<_>>()
        );
        assert!(pagination_numbers(1, 0).is_empty());
    }

    #[test]
    fn test_near_start() {
        assert_eq!(
            pagination_numbers(3, 20),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(19), Page(20)]
        );
    }

    #[test]
    fn test_near_end() {
        assert_eq!(
            pagination_numbers(18, 20),
            vec![Page(1), Page(2), Ellipsis, Page(18), Page(19), Page(20)]
        );
    }

    #[test]
    fn test_middle_window() {
        assert_eq!(
            pagination_numbers(10, 20),
            vec![
                Page(1),
                Ellipsis,
                Page(9),
                Page(10),
                Page(11),
                Ellipsis,
                Page(20)
            ]
        );
    }

    #[test]
    fn test_serializes_like_a_pager() {
        let json = serde_json::to_string(&pagination_numbers(1, 8)).unwrap();
        assert_eq!(json, r#"[1,2,3,"...",7,8]"#);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 12), 1);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(5, 0), 5);
    }
}
