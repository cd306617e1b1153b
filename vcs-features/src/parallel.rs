//! Chunked parallel reduction, grounded in the teacher's
//! `git_features::parallel::{reduce::Stepwise, optimize_chunk_size_and_thread_limit}`
//! and its private `util::Chunks` iterator adapter.

use rayon::prelude::*;

/// Splits an iterator into fixed-size chunks, the same shape as the
/// teacher's private `util::Chunks`.
pub struct Chunks<I> {
    pub iter: I,
    pub size: usize,
}

impl<I, Item> Iterator for Chunks<I>
where
    I: Iterator<Item = Item>,
{
    type Item = Vec<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut out = Vec::with_capacity(self.size);
        for item in self.iter.by_ref().take(self.size) {
            out.push(item);
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

/// Picks a chunk size and thread count the way
/// `optimize_chunk_size_and_thread_limit` did: prefer the caller's explicit
/// choice, otherwise derive a chunk size from the lower-bound item count and
/// available parallelism.
pub fn optimize_chunk_size_and_thread_limit(
    desired_chunk_size: usize,
    items_lower_bound: Option<usize>,
    thread_limit: Option<usize>,
) -> (usize, usize) {
    let available = thread_limit.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let chunk_size = if desired_chunk_size > 0 {
        desired_chunk_size
    } else {
        match items_lower_bound {
            Some(n) if n > 0 => (n / available.max(1)).max(1),
            _ => 10,
        }
    };
    (chunk_size, available.max(1))
}

/// Runs `reduce` over `chunks` of `items`, up to `threads` at a time,
/// collecting each chunk's mapped output in original order. Errors abort the
/// whole operation, matching the teacher's `Stepwise` which surfaces the
/// first error through the iterator.
pub fn in_parallel<Item, Out, Error, MapFn>(
    items: Vec<Item>,
    chunk_size: usize,
    threads: usize,
    map: MapFn,
) -> Result<Vec<Out>, Error>
where
    Item: Send,
    Out: Send,
    Error: Send,
    MapFn: Fn(Vec<Item>) -> Result<Vec<Out>, Error> + Sync + Send,
{
    let chunks: Vec<Vec<Item>> = Chunks {
        iter: items.into_iter(),
        size: chunk_size.max(1),
    }
    .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .expect("thread pool with a positive thread count always builds");

    let results: Vec<Result<Vec<Out>, Error>> = pool.install(|| chunks.into_par_iter().map(map).collect());

    let mut out = Vec::new();
    for chunk in results {
        out.extend(chunk?);
    }
    Ok(out)
}
