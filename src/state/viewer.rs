// File viewer state.
// Holds the remote file's lines, cursor and scroll position, heat decorations, and hover text.

use crate::blame::{Editor, LineRange};
use crate::workspace::FileIdentity;

/// Loading state for async data.
#[derive(Debug, Clone, Default)]
pub enum LoadingState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> LoadingState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            LoadingState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Viewer for one workspace file. Acts as the editor the heat-map is painted on.
#[derive(Debug)]
pub struct ViewerState {
    pub file: FileIdentity,
    pub content: LoadingState<Vec<String>>,
    /// 0-indexed cursor line.
    pub cursor: usize,
    /// First visible line.
    pub scroll: usize,
    /// Hover text for the cursor line.
    pub hover: Option<String>,
    /// Decorations per heat bucket, each sorted by line.
    decorations: Vec<Vec<LineRange>>,
}

impl ViewerState {
    pub fn new(file: FileIdentity) -> Self {
        Self {
            file,
            content: LoadingState::Idle,
            cursor: 0,
            scroll: 0,
            hover: None,
            decorations: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.data().map_or(0, Vec::len)
    }

    /// Heat bucket decorating a 0-indexed line.
    pub fn bucket_at(&self, line: usize) -> Option<usize> {
        let line = u32::try_from(line).ok()?;
        self.decorations.iter().position(|ranges| {
            ranges
                .binary_search_by_key(&line, |range| range.line)
                .is_ok()
        })
    }

    pub fn has_decorations(&self) -> bool {
        self.decorations.iter().any(|ranges| !ranges.is_empty())
    }

    /// Move the cursor, returning whether it changed.
    pub fn move_by(&mut self, delta: isize) -> bool {
        let last = self.line_count().saturating_sub(1);
        let target = self.cursor.saturating_add_signed(delta).min(last);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    pub fn move_to_top(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    pub fn move_to_bottom(&mut self) -> bool {
        let last = self.line_count().saturating_sub(1);
        let moved = self.cursor != last;
        self.cursor = last;
        moved
    }

    /// Adjust scroll so the cursor stays within a viewport of `height` lines.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
    }
}

impl Editor for ViewerState {
    fn set_decorations(&mut self, bucket: usize, mut ranges: Vec<LineRange>) {
        if self.decorations.len() <= bucket {
            self.decorations.resize_with(bucket + 1, Vec::new);
        }
        ranges.sort();
        self.decorations[bucket] = ranges;
    }
}
