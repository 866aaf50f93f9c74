//! Gallery bucket assignment
//!
//! The landing-page photo gallery is a fixed five-column layout with
//! capacities 2/3/4/3/2. Whenever a photo is added or removed, every
//! item's column is recomputed from its stable insertion-order index:
//! item `i` lands in the smallest bucket whose cumulative capacity
//! exceeds `i`, and items beyond the total capacity spill into the last
//! bucket. This is a deterministic full recompute, not an incremental
//! diff — the gateway then writes back only the labels that changed.

/// Column capacities, left to right.
pub const BUCKET_CAPACITIES: [usize; 5] = [2, 3, 4, 3, 2];

/// Column labels stored on the photo rows.
pub const BUCKET_LABELS: [&str; 5] = ["col_1", "col_2", "col_3", "col_4", "col_5"];

/// Total slots before overflow spills into the last column.
pub fn total_capacity() -> usize {
    BUCKET_CAPACITIES.iter().sum()
}

/// Bucket index for the item at `index` in stable insertion order.
pub fn bucket_index(index: usize) -> usize {
    let mut cumulative = 0;
    for (bucket, capacity) in BUCKET_CAPACITIES.iter().enumerate() {
        cumulative += capacity;
        if index < cumulative {
            return bucket;
        }
    }
    BUCKET_CAPACITIES.len() - 1
}

/// Bucket label for the item at `index`.
pub fn bucket_label(index: usize) -> &'static str {
    BUCKET_LABELS[bucket_index(index)]
}

/// Full assignment for `len` items.
pub fn assignments(len: usize) -> Vec<&'static str> {
    (0..len).map(bucket_label).collect()
}
