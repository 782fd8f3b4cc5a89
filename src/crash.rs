//! Crash Summary Extractor
//!
//! Best-effort decode of the crash record the platform retained from the
//! previous abnormal reset (the core dump summary on ESP32). A missing
//! record is a normal outcome; a missing panic reason degrades to a
//! placeholder instead of failing the whole extraction.
//!
//! Two backtrace layouts exist depending on the chip family:
//!
//! ```text
//! RegisterUnwind (Xtensa)     StackDump (RISC-V / Cortex-M)
//! ┌──────────────────────┐    ┌──────────────────────────────┐
//! │ depth │ pc0 pc1 ...  │    │ raw stack bytes (LE words)   │
//! └──────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Both are rendered as the same space-separated `0x%08x` token list.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::config::{
    BACKTRACE_TEXT_LEN, MAX_BACKTRACE_DEPTH, PANIC_REASON_MAX_LEN, TASK_NAME_MAX_LEN,
    UNKNOWN_PANIC_REASON,
};
use crate::logger::warn;
use crate::platform::{BacktraceSource, PlatformError};

/// Crash record as handed over by the platform
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCrashSummary<'a> {
    /// Name of the task that crashed
    pub task: &'a str,
    /// Number of unwound frames the platform claims (register unwind only)
    pub reported_depth: u32,
    /// Unwound program counters (register unwind only)
    pub frames: &'a [u32],
    /// Raw stack bytes (stack dump only)
    pub stack_dump: &'a [u8],
    /// The platform flagged the unwound backtrace as corrupted
    pub corrupted: bool,
}

/// Crash record collaborator
pub trait CrashSource {
    /// Retained crash record, `None` when absent or not readable yet
    fn summary(&self) -> Option<RawCrashSummary<'_>>;

    /// Copy the panic reason text into `buf`, returning the byte count
    ///
    /// # Errors
    ///
    /// Returns the platform error when the reason is not stored.
    fn panic_reason(&self, buf: &mut [u8]) -> Result<usize, PlatformError>;
}

/// Source for targets without crash records
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCrashRecord;

impl CrashSource for NoCrashRecord {
    fn summary(&self) -> Option<RawCrashSummary<'_>> {
        None
    }

    fn panic_reason(&self, _buf: &mut [u8]) -> Result<usize, PlatformError> {
        Err(PlatformError::NotSupported)
    }
}

/// Decoded crash summary
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CrashSummary {
    /// Task that crashed
    #[cfg_attr(feature = "serde", serde(rename = "task"))]
    task_name: String<TASK_NAME_MAX_LEN>,
    /// Panic reason, or "Unknown"
    #[cfg_attr(feature = "serde", serde(rename = "reason"))]
    panic_reason: String<PANIC_REASON_MAX_LEN>,
    /// Backtrace text
    backtrace: String<BACKTRACE_TEXT_LEN>,
    #[cfg_attr(feature = "serde", serde(skip))]
    frames: Vec<u32, MAX_BACKTRACE_DEPTH>,
}

impl CrashSummary {
    /// Task that crashed
    #[must_use]
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Panic reason text
    #[must_use]
    pub fn panic_reason(&self) -> &str {
        &self.panic_reason
    }

    /// Space-separated `0x%08x` addresses
    #[must_use]
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Backtrace addresses
    #[must_use]
    pub fn frames(&self) -> &[u32] {
        &self.frames
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CrashSummary {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Crash(task={=str}, reason={=str}, bt={=str})",
            self.task_name.as_str(),
            self.panic_reason.as_str(),
            self.backtrace.as_str()
        );
    }
}

/// Crash summary extractor for one chip family
#[derive(Debug)]
pub struct CrashExtractor<C> {
    source: C,
    layout: BacktraceSource,
}

impl<C: CrashSource> CrashExtractor<C> {
    /// Create an extractor reading backtraces in `layout`
    #[must_use]
    pub const fn new(source: C, layout: BacktraceSource) -> Self {
        Self { source, layout }
    }

    /// Backtrace layout in use
    #[must_use]
    pub const fn layout(&self) -> BacktraceSource {
        self.layout
    }

    /// Decode the retained crash record, `None` when there is none
    #[must_use]
    pub fn try_extract(&self) -> Option<CrashSummary> {
        let raw = self.source.summary()?;

        if raw.corrupted {
            warn!("Crash backtrace flagged as corrupted");
        }

        let mut task_name = String::new();
        push_truncated(&mut task_name, raw.task);

        let frames = match self.layout {
            BacktraceSource::RegisterUnwind => unwound_frames(&raw),
            BacktraceSource::StackDump => stack_words(raw.stack_dump),
        };

        Some(CrashSummary {
            task_name,
            panic_reason: self.read_panic_reason(),
            backtrace: render_backtrace(&frames),
            frames,
        })
    }

    fn read_panic_reason(&self) -> String<PANIC_REASON_MAX_LEN> {
        let mut buf = [0u8; PANIC_REASON_MAX_LEN];
        let mut reason = String::new();

        match self.source.panic_reason(&mut buf) {
            Ok(len) => {
                let bytes = &buf[..len.min(buf.len())];
                let bytes = bytes
                    .iter()
                    .position(|&b| b == 0)
                    .map_or(bytes, |nul| &bytes[..nul]);
                let text = match core::str::from_utf8(bytes) {
                    Ok(text) => text,
                    // keep the valid prefix of a truncated multi-byte sequence
                    Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
                };
                push_truncated(&mut reason, text);
            }
            Err(e) => {
                warn!("Panic reason unavailable: {}", e);
                push_truncated(&mut reason, UNKNOWN_PANIC_REASON);
            }
        }

        reason
    }
}

fn unwound_frames(raw: &RawCrashSummary<'_>) -> Vec<u32, MAX_BACKTRACE_DEPTH> {
    let depth = usize::try_from(raw.reported_depth)
        .unwrap_or(usize::MAX)
        .min(MAX_BACKTRACE_DEPTH)
        .min(raw.frames.len());
    raw.frames[..depth].iter().copied().collect()
}

fn stack_words(dump: &[u8]) -> Vec<u32, MAX_BACKTRACE_DEPTH> {
    dump.chunks_exact(4)
        .take(MAX_BACKTRACE_DEPTH)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

fn render_backtrace(frames: &[u32]) -> String<BACKTRACE_TEXT_LEN> {
    let mut text = String::new();
    for (i, pc) in frames.iter().enumerate() {
        if i > 0 {
            let _ = text.push(' ');
        }
        let _ = write!(text, "0x{pc:08x}");
    }
    text
}

/// Append as much of `src` as fits, never splitting a character
fn push_truncated<const N: usize>(dst: &mut String<N>, src: &str) {
    for c in src.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}
