//! Transfer bookkeeping shared by uploads and downloads.
//!
//! Nothing in here touches the network: the drive client feeds byte counts
//! in, and this crate answers with throughput annotations, progress lines,
//! stall verdicts and retry timing.

mod chunked;
mod format;
mod progress;
mod restart;
mod retry;
mod speed;

pub use chunked::{ChunkProgress, Rechunker};
pub use format::format_size;
pub use progress::{BAR_WIDTH, ProgressReporter, render_bar};
pub use restart::RestartFlag;
pub use retry::{RetryPolicy, retry};
pub use speed::{SPEED_WINDOW, STALL_THRESHOLD, SpeedTracker, StallDetected, format_eta};

/// Download body chunk size: 512 KiB.
pub const DOWNLOAD_CHUNK_SIZE: usize = 512 * 1024;

/// Downloads sample throughput and redraw progress every this many chunks.
pub const DOWNLOAD_SAMPLE_EVERY: u32 = 5;

/// Uploads sample throughput, redraw progress and poll the restart flag
/// every this many body reads.
pub const UPLOAD_SAMPLE_EVERY: u32 = 200;

/// Size of a single upload body read.
pub const UPLOAD_READ_SIZE: usize = 8 * 1024;
