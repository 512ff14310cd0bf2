//! Growable text buffers recycled through a pool.
//!
//! A [`Buffer`] grows in [`CHUNK`] multiples. Buffers are obtained from a
//! [`BufferPool`] as [`PooledBuffer`] guards which hand their storage back to
//! the pool when dropped, so every exit path (including `?`) releases them.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Allocation granule for buffer growth.
pub const CHUNK: usize = 4096;

/// Append-only text buffer with chunked growth.
#[derive(Debug)]
pub struct Buffer {
	text: String,
}

impl Default for Buffer {
	fn default() -> Self {
		Self::new()
	}
}

impl Buffer {
	/// Creates an empty buffer with one chunk of backing store.
	pub fn new() -> Self {
		Self {
			text: String::with_capacity(CHUNK),
		}
	}

	/// Appends `s` to the end of the buffer.
	pub fn append(&mut self, s: &str) {
		self.reserve(s.len());
		self.text.push_str(s);
	}

	/// Appends a single character.
	pub fn push(&mut self, c: char) {
		if self.text.len() + c.len_utf8() >= self.text.capacity() {
			self.reserve(c.len_utf8());
		}
		self.text.push(c);
	}

	/// Grows to the smallest chunk multiple holding the old size, `n` more
	/// bytes and one chunk of slack.
	fn reserve(&mut self, n: usize) {
		let capacity = self.text.capacity();
		if n + 1 >= capacity - self.text.len() {
			let want = (capacity + n + CHUNK + 1) / CHUNK * CHUNK;
			self.text.reserve_exact(want - self.text.len());
		}
	}

	/// Current contents.
	pub fn as_str(&self) -> &str {
		&self.text
	}

	/// Number of bytes written.
	pub fn len(&self) -> usize {
		self.text.len()
	}

	/// Returns `true` if nothing has been written since the last reset.
	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}

	/// Size of the backing store.
	#[cfg(test)]
	pub(crate) fn capacity(&self) -> usize {
		self.text.capacity()
	}

	/// Moves the write cursor back to the start.
	pub fn reset(&mut self) {
		self.text.clear();
	}

	/// Returns an owned copy of the contents and resets the cursor, keeping
	/// the backing store for reuse.
	pub fn freeze(&mut self) -> String {
		let frozen = self.text.clone();
		self.text.clear();
		frozen
	}
}

/// Free list of buffers shared by everything in one evaluation.
#[derive(Debug, Default)]
pub struct BufferPool {
	free: RefCell<Vec<Buffer>>,
}

impl BufferPool {
	/// Creates an empty pool.
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Takes a pooled buffer, allocating only when the free list is empty.
	pub fn acquire(self: &Rc<Self>) -> PooledBuffer {
		let buffer = self.free.borrow_mut().pop().unwrap_or_default();
		PooledBuffer {
			buffer,
			pool: Rc::clone(self),
		}
	}

	/// Number of buffers waiting for reuse.
	#[cfg(test)]
	pub(crate) fn available(&self) -> usize {
		self.free.borrow().len()
	}

	fn release(&self, mut buffer: Buffer) {
		buffer.reset();
		self.free.borrow_mut().push(buffer);
	}
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer {
	buffer: Buffer,
	pool: Rc<BufferPool>,
}

impl Deref for PooledBuffer {
	type Target = Buffer;

	fn deref(&self) -> &Buffer {
		&self.buffer
	}
}

impl DerefMut for PooledBuffer {
	fn deref_mut(&mut self) -> &mut Buffer {
		&mut self.buffer
	}
}

impl Drop for PooledBuffer {
	fn drop(&mut self) {
		// the placeholder left behind owns no storage
		let buffer = std::mem::replace(&mut self.buffer, Buffer { text: String::new() });
		self.pool.release(buffer);
	}
}

#[cfg(test)]
mod tests;
