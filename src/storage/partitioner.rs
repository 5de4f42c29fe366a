use std::ops::Range;

/// Number of workers actually used for `len` documents.
///
/// Non-positive requests mean one worker; there are never more workers than
/// documents. An empty catalog needs no workers at all.
pub fn effective_workers(requested: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let requested = usize::try_from(requested.max(1)).unwrap_or(usize::MAX);
    requested.min(len)
}

/// Splits `0..len` into `workers` contiguous ranges in order.
///
/// Every range holds `len / workers` items and the last one also takes the
/// remainder.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 || workers == 0 {
        return Vec::new();
    }
    let workers = workers.min(len);
    let per_worker = len / workers;

    (0..workers)
        .map(|index| {
            let start = index * per_worker;
            let end = if index + 1 == workers {
                len
            } else {
                start + per_worker
            };
            start..end
        })
        .collect()
}
