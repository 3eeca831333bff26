use serde::{Deserialize, Serialize};

/// Offset-based page of rows. The total row count rides along on every
/// row via `COUNT(*) OVER()`, so a single query produces the context.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }

        let next_offset = current_offset + page_size;
        let next_offset = (next_offset < total_rows).then_some(next_offset);
        let prev_offset = (current_offset > 0).then_some((current_offset - page_size).max(0));

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_prev() {
        let page = PageContext::from_rows(vec![1, 2, 3], 7, 3, 0);
        assert_eq!(page.prev_offset, None);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.total_rows, 7);
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![7], 7, 3, 6);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn empty_rows_collapse_to_no_rows() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 3, 0);
        assert_eq!(page.total_rows, 0);
        assert!(page.rows.is_empty());
    }
}
