use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
	pub start: usize,
	pub end: usize,
	pub total: usize,
}
impl PageWindow {
	pub fn new(total: usize, offset: usize, limit: usize) -> Self {
		let start = offset.min(total);
		let end = start.saturating_add(limit).min(total);

		Self { start, end, total }
	}

	pub fn has_more(&self) -> bool {
		self.end < self.total
	}

	pub fn range(&self) -> Range<usize> {
		self.start..self.end
	}
}

pub fn paginate<T>(items: &[T], offset: usize, limit: usize) -> (&[T], PageWindow) {
	let window = PageWindow::new(items.len(), offset, limit);

	(&items[window.range()], window)
}
