// Age heat-map.
// Buckets blamed lines by commit age and applies one decoration set per bucket to an editor.

use std::collections::BTreeSet;

use crate::github::BlameRange;

/// Newest (age 0) to oldest (age 10).
pub const DEFAULT_PALETTE: [&str; 11] = [
    "#ff941a", "#f0843d", "#e07352", "#d06266", "#bd5175", "#a94285", "#7c21a6", "#5910b2",
    "#953295", "#0000c2", "#000000",
];

/// End column used for full-width line decorations.
pub const FULL_LINE_WIDTH: u32 = 10_000;

/// Single-line decoration span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineRange {
    pub line: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl LineRange {
    pub fn full_line(line: u32) -> Self {
        Self {
            line,
            start_col: 0,
            end_col: FULL_LINE_WIDTH,
        }
    }
}

/// Surface the heat-map is painted on.
pub trait Editor {
    /// Replace every decoration of one bucket.
    fn set_decorations(&mut self, bucket: usize, ranges: Vec<LineRange>);
}

/// 0-indexed line numbers per age bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatBuckets {
    buckets: Vec<BTreeSet<u32>>,
}

impl HeatBuckets {
    pub fn empty(bucket_count: usize) -> Self {
        Self {
            buckets: vec![BTreeSet::new(); bucket_count],
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BTreeSet::is_empty)
    }

    pub fn lines(&self, bucket: usize) -> Option<&BTreeSet<u32>> {
        self.buckets.get(bucket)
    }

    /// Bucket a 0-indexed line was placed in.
    #[cfg(test)]
    pub fn bucket_of(&self, line: u32) -> Option<usize> {
        self.buckets.iter().position(|lines| lines.contains(&line))
    }
}

/// Bucket index for an age. Out-of-range ages are clamped to the nearest bucket.
pub fn clamp_age(age: i64, bucket_count: usize) -> usize {
    let max = bucket_count.saturating_sub(1) as i64;
    age.clamp(0, max) as usize
}

/// Group every blamed line by its age bucket.
pub fn compute_buckets(ranges: &[BlameRange], bucket_count: usize) -> HeatBuckets {
    let mut buckets = HeatBuckets::empty(bucket_count);
    if bucket_count == 0 {
        return buckets;
    }

    for range in ranges {
        let bucket = &mut buckets.buckets[clamp_age(range.age, bucket_count)];
        if range.ending_line == 0 {
            continue;
        }
        let first = range.starting_line.saturating_sub(1);
        bucket.extend(first..range.ending_line);
    }
    buckets
}

/// Range covering a 0-indexed line.
pub fn range_at_line(ranges: &[BlameRange], line: u32) -> Option<&BlameRange> {
    ranges.iter().find(|range| range.contains_line(line))
}

/// Paints heat buckets on an editor using a fixed palette, one bucket per color.
#[derive(Debug, Clone)]
pub struct HeatRenderer {
    palette: Vec<String>,
}

impl Default for HeatRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl HeatRenderer {
    pub fn new(palette: Vec<String>) -> Self {
        Self { palette }
    }

    pub fn bucket_count(&self) -> usize {
        self.palette.len()
    }

    pub fn color(&self, bucket: usize) -> Option<&str> {
        self.palette.get(bucket).map(String::as_str)
    }

    pub fn compute(&self, ranges: &[BlameRange]) -> HeatBuckets {
        compute_buckets(ranges, self.bucket_count())
    }

    /// Replace each bucket's decorations; buckets without lines are cleared.
    pub fn apply(&self, editor: &mut dyn Editor, buckets: &HeatBuckets) {
        for bucket in 0..self.bucket_count() {
            let ranges = buckets
                .lines(bucket)
                .map(|lines| lines.iter().copied().map(LineRange::full_line).collect())
                .unwrap_or_default();
            editor.set_decorations(bucket, ranges);
        }
    }

    /// Clear every bucket.
    pub fn clear(&self, editor: &mut dyn Editor) {
        for bucket in 0..self.bucket_count() {
            editor.set_decorations(bucket, Vec::new());
        }
    }
}

/// Editor that records the latest decorations per bucket.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingEditor {
    pub decorations: std::collections::BTreeMap<usize, Vec<LineRange>>,
    pub calls: usize,
}

#[cfg(test)]
impl Editor for RecordingEditor {
    fn set_decorations(&mut self, bucket: usize, ranges: Vec<LineRange>) {
        self.calls += 1;
        self.decorations.insert(bucket, ranges);
    }
}
