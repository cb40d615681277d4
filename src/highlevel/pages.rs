//! Cursor-pagination bookkeeping for the contact listing.
//!
//! The HighLevel contact endpoint pages by `startAfterId`, an opaque cursor
//! equal to the id of the last contact on the previous page. The server gives
//! no guarantee the cursor is monotonic, so `PageGuard` carries the defensive
//! bookkeeping: a membership set of every contact id seen during one fetch,
//! loop and stall detection over it, and a hard page cap. Detection is
//! best-effort: it catches the failure modes observed in practice (re-served
//! pages, overlapping windows), not every theoretical misbehavior.

use std::collections::HashSet;
use std::fmt;

/// Why a fetch stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server returned an empty page: no more data.
    Exhausted,
    /// The first id of the new page was already seen - the server re-served
    /// an old page.
    LoopDetected,
    /// More than the allowed number of ids on this page were already seen.
    Stalled { duplicates: usize },
    /// The cursor failed to advance (absent, or equal to the previous one).
    CursorPinned,
    /// The unconditional safety cap on pages was reached.
    PageCapReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "no more pages"),
            StopReason::LoopDetected => write!(f, "pagination loop detected"),
            StopReason::Stalled { duplicates } => {
                write!(f, "pagination stalled ({} duplicate contacts)", duplicates)
            }
            StopReason::CursorPinned => write!(f, "cursor did not advance"),
            StopReason::PageCapReached => write!(f, "page safety cap reached"),
        }
    }
}

/// Outcome of feeding one raw page of contact ids through the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    /// Page rejected as re-served/overlapping data; discard its contents.
    Reject(StopReason),
    /// Page accepted but pagination ends here; keep its contents.
    Last(StopReason),
    /// Page accepted; request the next page starting after this cursor.
    Continue(String),
}

/// Per-fetch pagination state: seen ids, current cursor, page count.
/// One guard lives exactly as long as one location's fetch.
pub struct PageGuard {
    seen: HashSet<String>,
    cursor: Option<String>,
    pages: u32,
    max_pages: u32,
    dup_threshold: usize,
}

impl PageGuard {
    pub fn new(max_pages: u32, dup_threshold: usize) -> Self {
        Self {
            seen: HashSet::new(),
            cursor: None,
            pages: 0,
            max_pages,
            dup_threshold,
        }
    }

    /// The cursor to send with the next request, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Pages accepted so far (rate-limit retries of the same page not counted).
    pub fn pages_seen(&self) -> u32 {
        self.pages
    }

    /// Examine one raw page worth of contact ids, in server order, and decide
    /// how pagination proceeds. Filtering happens outside the guard; the
    /// cursor always advances from the last *raw* contact of the page.
    pub fn step(&mut self, ids: &[&str]) -> PageStep {
        let first = match ids.first() {
            Some(first) => *first,
            None => return PageStep::Reject(StopReason::Exhausted),
        };
        if self.seen.contains(first) {
            return PageStep::Reject(StopReason::LoopDetected);
        }
        let duplicates = ids.iter().filter(|id| self.seen.contains(**id)).count();
        if duplicates > self.dup_threshold {
            return PageStep::Reject(StopReason::Stalled { duplicates });
        }

        for id in ids {
            self.seen.insert((*id).to_string());
        }
        self.pages += 1;

        let next = ids.last().filter(|id| !id.is_empty());
        match next {
            None => PageStep::Last(StopReason::CursorPinned),
            Some(next) if self.cursor.as_deref() == Some(*next) => {
                PageStep::Last(StopReason::CursorPinned)
            }
            Some(next) => {
                self.cursor = Some((*next).to_string());
                if self.pages >= self.max_pages {
                    PageStep::Last(StopReason::PageCapReached)
                } else {
                    PageStep::Continue((*next).to_string())
                }
            }
        }
    }
}
