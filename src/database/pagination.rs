use serde::{Deserialize, Serialize};

use crate::{
    constants::MAX_COUNT_PER_PAGE,
    error::{Error, HtmlError},
    form::Form,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// A page past the last one is not-found, like an unknown object.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, pagination: Pagination) -> Result<Self, Error> {
        if rows.is_empty() {
            if pagination.page == 1 {
                return Ok(Self::no_rows());
            }
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        let page_count = (total_rows + pagination.limit - 1) / pagination.limit;
        let next = (pagination.page < page_count).then_some(pagination.page + 1);
        let previous = (pagination.page > 1).then_some(pagination.page - 1);

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}

/// 1-based page number and page size, read from `page` and `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_COUNT_PER_PAGE),
        }
    }

    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, Error> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        let limit = form.get_number::<i64>("limit")?.unwrap_or(default_limit);

        let pagination = Self::new(page, limit);
        if page < 1 || (pagination.page - 1).checked_mul(pagination.limit).is_none() {
            return Err(Error::field("page", "Invalid page"));
        }
        Ok(pagination)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_page_of_many() {
        let page = PageContext::from_rows(vec![1, 2], 5, Pagination::new(1, 2)).unwrap();
        assert_eq!(page.count, 5);
        assert_eq!(page.next, Some(2));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![5], 5, Pagination::new(3, 2)).unwrap();
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
    }

    #[test]
    fn empty_first_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, Pagination::new(1, 6)).unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert!(page.results.is_empty());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(Pagination::new(0, 0), Pagination { page: 1, limit: 1 });
        assert_eq!(Pagination::new(2, 10_000).limit, MAX_COUNT_PER_PAGE);
        assert_eq!(Pagination::new(3, 6).offset(), 12);
    }

    #[test]
    fn reads_page_and_limit_from_query() {
        let form = Form::from_query("page=2&limit=3");
        assert_eq!(Pagination::from_form(&form, 6).unwrap(), Pagination::new(2, 3));

        let form = Form::from_query("");
        assert_eq!(Pagination::from_form(&form, 6).unwrap(), Pagination::new(1, 6));

        let form = Form::from_query("page=abc");
        assert!(Pagination::from_form(&form, 6).is_err());
    }

    #[test]
    fn huge_page_is_rejected() {
        let form = Form::from_query("page=9223372036854775807&limit=100");
        let error = Pagination::from_form(&form, 6).unwrap_err();
        assert!(error.fields.contains_key("page"));

        let form = Form::from_query("page=1000&limit=100");
        assert_eq!(Pagination::from_form(&form, 6).unwrap().offset(), 99_900);
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        let error = PageContext::<i32>::from_rows(vec![], 0, Pagination::new(5, 2)).unwrap_err();
        assert_eq!(error.kind, HtmlError::NotFound);
        assert_eq!(error.info, "Invalid page.");
    }
}
