use crate::{Error, Result};

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
	pub page: u32,
	pub page_size: u32,
}
impl Pagination {
	pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self> {
		if page == 0 {
			return Err(Error::invalid("page must be greater than or equal to 1."));
		}
		if page_size == 0 || page_size > max_page_size {
			return Err(Error::invalid(format!(
				"page_size must be between 1 and {max_page_size}."
			)));
		}

		Ok(Self { page, page_size })
	}

	/// Zero when there is nothing to page through.
	pub fn total_pages(self, total_results: usize) -> u32 {
		let pages = total_results.div_ceil(self.page_size as usize);

		u32::try_from(pages).unwrap_or(u32::MAX)
	}

	/// Keeps the items of this page. A page past the end yields an empty slice.
	pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
		let start = u64::from(self.page - 1).saturating_mul(u64::from(self.page_size));
		let Ok(start) = usize::try_from(start) else {
			return Vec::new();
		};

		if start >= items.len() {
			return Vec::new();
		}

		items.into_iter().skip(start).take(self.page_size as usize).collect()
	}
}
