use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::cache::IdentityLookup;
use crate::dissect::Dissector;
use crate::parser::{message_type, DropRecord};
use crate::reasons::reason_text;
use crate::render::Renderer;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct DropStats {
    pub total_drops: usize,
    pub total_bytes: u64,
    pub reason_counts: HashMap<String, usize>,
    pub skipped: usize,
    pub malformed: usize,
}

impl DropStats {
    pub fn update(&mut self, n: &DropRecord) {
        self.total_drops += 1;
        self.total_bytes += u64::from(n.orig_len);
        *self.reason_counts.entry(reason_text(n.sub_type).into_owned()).or_insert(0) += 1;
    }

    pub fn log_summary(&self) {
        info!(
            drops = self.total_drops,
            bytes = self.total_bytes,
            skipped = self.skipped,
            malformed = self.malformed,
            "drop monitor finished"
        );
        let mut reasons: Vec<_> = self.reason_counts.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (reason, count) in reasons {
            info!(count = *count, reason = %reason, "drops by reason");
        }
    }
}

/// Drives decode and render for each event handed over by the reader.
pub struct Monitor<L, D> {
    renderer: Renderer<L, D>,
    verbose: bool,
    stats: DropStats,
}

impl<L: IdentityLookup, D: Dissector> Monitor<L, D> {
    pub fn new(renderer: Renderer<L, D>, verbose: bool) -> Self {
        Self { renderer, verbose, stats: DropStats::default() }
    }

    pub fn stats(&self) -> &DropStats {
        &self.stats
    }

    /// Processes events until the channel closes or `running` is cleared.
    pub fn run<W: Write>(
        &mut self,
        rx: Receiver<Vec<u8>>,
        running: Arc<AtomicBool>,
        out: &mut W,
    ) -> io::Result<()> {
        while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => self.handle(&frame, out)?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        out.flush()
    }

    /// Renders one event: the summary line, the detailed line when verbose,
    /// then the dissection of any captured bytes. Malformed and non-drop
    /// events are counted and skipped; only write failures are returned.
    pub fn handle<W: Write>(&mut self, frame: &[u8], out: &mut W) -> io::Result<()> {
        let n = match DropRecord::parse(frame) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, len = frame.len(), "dropping malformed event");
                self.stats.malformed += 1;
                return Ok(());
            }
        };

        if !n.is_drop() {
            debug!(
                event_type = n.event_type,
                kind = message_type::name(n.event_type),
                "skipping non-drop message"
            );
            self.stats.skipped += 1;
            return Ok(());
        }

        let prefix = chrono::Local::now().format("%H:%M:%S%.3f");
        writeln!(out, "{} {}", prefix, self.renderer.render_summary(&n))?;
        if self.verbose {
            self.renderer.render_detailed(&n, frame, &mut *out)?;
        } else {
            self.renderer.render_payload(&n, frame, &mut *out)?;
        }
        self.stats.update(&n);
        Ok(())
    }
}
