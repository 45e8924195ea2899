//! Row-parallel worker engine shared by the scan and defect-fix passes.
//!
//! Every row of the scan region is one task that owns its row of the output
//! buffer and builds its own worker state. Tasks report back over a channel to
//! a coordinator thread, which forwards progress and counts one
//! acknowledgement per dispatched row before the pass returns.

use crate::search::CancelToken;
use crate::trace::trace_event;
use crate::util::{RingMatchError, RingMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Progress callback receiving the completed fraction in `[0, 1]`.
pub type ProgressFn<'a> = &'a (dyn Fn(f32) + Sync);

/// Pixel centers whose rings stay inside the image: `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRegion {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl ScanRegion {
    /// Excludes a `margin`-wide border on every side.
    pub fn with_margin(width: usize, height: usize, margin: usize) -> RingMatchResult<Self> {
        if width <= 2 * margin || height <= 2 * margin {
            return Err(RingMatchError::RingOutOfBounds {
                x: margin,
                y: margin,
                radius: margin,
                img_width: width,
                img_height: height,
            });
        }
        Ok(Self {
            x0: margin,
            y0: margin,
            x1: width - margin,
            y1: height - margin,
        })
    }

    /// Number of rows in the region.
    pub fn rows(&self) -> usize {
        self.y1 - self.y0
    }

    /// Number of columns in the region.
    pub fn cols(&self) -> usize {
        self.x1 - self.x0
    }

    /// Returns true if `(x, y)` lies in the region.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }
}

/// Per-pass accounting of row acknowledgements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowReport {
    /// Rows handed to workers.
    pub dispatched: usize,
    /// Rows whose every column was computed.
    pub completed: usize,
    /// Rows that stopped early (or never started) because of cancellation.
    pub cancelled: usize,
}

impl RowReport {
    /// Returns true if every dispatched row ran to completion.
    pub fn is_complete(&self) -> bool {
        self.completed == self.dispatched
    }
}

#[derive(Clone, Copy, Debug)]
struct RowAck {
    row: usize,
    completed: bool,
}

/// Runs one task per region row over `out` (a contiguous `width`-wide
/// buffer) and blocks until every row has been acknowledged.
///
/// `make_worker` is called once per row; the returned closure maps a pixel
/// center to its output value. Cancellation is polled before every column, so
/// a cancelled row keeps the columns it already wrote.
pub(crate) fn scan_rows<M, W>(
    out: &mut [f32],
    width: usize,
    region: ScanRegion,
    parallel: bool,
    progress: Option<ProgressFn<'_>>,
    cancel: &CancelToken,
    make_worker: M,
) -> RowReport
where
    M: Fn() -> W + Sync,
    W: FnMut(usize, usize) -> f32,
{
    let rows: Vec<(usize, &mut [f32])> = out
        .chunks_exact_mut(width)
        .enumerate()
        .skip(region.y0)
        .take(region.rows())
        .collect();
    let total = rows.len();

    let run_row = |y: usize, row: &mut [f32]| -> bool {
        let mut worker = make_worker();
        for x in region.x0..region.x1 {
            if cancel.is_cancelled() {
                return false;
            }
            row[x] = worker(x, y);
        }
        true
    };

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        let coordinator = scope.spawn(move || coordinate(rx, total, progress, cancel));
        dispatch(rows, parallel, tx, &run_row);
        coordinator
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    })
}

fn coordinate(
    rx: Receiver<RowAck>,
    total: usize,
    progress: Option<ProgressFn<'_>>,
    cancel: &CancelToken,
) -> RowReport {
    let mut report = RowReport {
        dispatched: total,
        ..RowReport::default()
    };
    let mut cancel_seen = false;
    for ack in rx.iter().take(total) {
        if ack.completed {
            report.completed += 1;
            if let Some(callback) = progress {
                callback(report.completed as f32 / total as f32);
            }
        } else {
            report.cancelled += 1;
        }
        if !cancel_seen && cancel.is_cancelled() {
            cancel_seen = true;
            trace_event!("rows_cancelled", row = ack.row, completed = report.completed);
        }
    }
    report
}

#[cfg(feature = "rayon")]
fn dispatch<R>(rows: Vec<(usize, &mut [f32])>, parallel: bool, tx: Sender<RowAck>, run_row: &R)
where
    R: Fn(usize, &mut [f32]) -> bool + Sync,
{
    if !parallel {
        return dispatch_sequential(rows, tx, run_row);
    }
    rows.into_par_iter().for_each_with(tx, |tx, (y, row)| {
        let completed = run_row(y, row);
        let _ = tx.send(RowAck { row: y, completed });
    });
}

#[cfg(not(feature = "rayon"))]
fn dispatch<R>(rows: Vec<(usize, &mut [f32])>, _parallel: bool, tx: Sender<RowAck>, run_row: &R)
where
    R: Fn(usize, &mut [f32]) -> bool + Sync,
{
    dispatch_sequential(rows, tx, run_row);
}

fn dispatch_sequential<R>(rows: Vec<(usize, &mut [f32])>, tx: Sender<RowAck>, run_row: &R)
where
    R: Fn(usize, &mut [f32]) -> bool + Sync,
{
    for (y, row) in rows {
        let completed = run_row(y, row);
        let _ = tx.send(RowAck { row: y, completed });
    }
}
