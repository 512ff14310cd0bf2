use super::*;

#[test]
fn append_and_push_accumulate() {
	let mut buf = Buffer::new();
	buf.append("make");
	buf.push(' ');
	buf.append("all");
	assert_eq!(buf.as_str(), "make all");
	assert_eq!(buf.len(), 8);
}

#[test]
fn growth_is_chunk_multiple() {
	let mut buf = Buffer::new();
	let big = "x".repeat(CHUNK + 10);
	buf.append(&big);
	assert_eq!(buf.len(), CHUNK + 10);
	assert!(buf.capacity() >= 3 * CHUNK);
}

#[test]
fn freeze_returns_copy_and_resets() {
	let mut buf = Buffer::new();
	buf.append("abc");
	let frozen = buf.freeze();
	assert_eq!(frozen, "abc");
	assert!(buf.is_empty());
	buf.append("d");
	assert_eq!(buf.as_str(), "d");
	assert_eq!(frozen, "abc");
}

#[test]
fn dropped_buffers_return_to_pool() {
	let pool = BufferPool::new();
	assert_eq!(pool.available(), 0);
	{
		let mut a = pool.acquire();
		let _b = pool.acquire();
		a.append("scratch");
	}
	assert_eq!(pool.available(), 2);

	let reused = pool.acquire();
	assert_eq!(pool.available(), 1);
	assert!(reused.is_empty(), "recycled buffers start empty");
}

#[test]
fn release_happens_on_error_paths() {
	fn fails(pool: &Rc<BufferPool>) -> Result<(), ()> {
		let mut buf = pool.acquire();
		buf.append("partial");
		Err(())
	}

	let pool = BufferPool::new();
	assert!(fails(&pool).is_err());
	assert_eq!(pool.available(), 1);
}
