use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStatus, EndpointCache, IdentityLookup};
use crate::dissect::Dissector;
use crate::models::domain::Labels;
use crate::parser::DropRecord;
use crate::reasons::reason_text;

/// One-line description of a drop.
///
/// The identity transition and destination endpoint are only shown when set.
pub fn render_summary(n: &DropRecord) -> String {
    let mut out = format!(
        "MARK {:#x} FROM {} Packet dropped {} ({}) {} bytes ifindex={}",
        n.hash,
        n.source,
        n.sub_type,
        reason_text(n.sub_type),
        n.orig_len,
        n.ifindex
    );
    if n.src_label != 0 || n.dst_label != 0 {
        let _ = write!(out, " {}->{}", n.src_label, n.dst_label);
    }
    if n.dst_id != 0 {
        let _ = write!(out, " to lxc {}", n.dst_id);
    }
    out
}

/// Renders drop notifications, annotating them with what the agent knows
/// about the source endpoint.
pub struct Renderer<L, D> {
    cache: Arc<EndpointCache<L>>,
    dissector: D,
    dissect: bool,
}

impl<L: IdentityLookup, D: Dissector> Renderer<L, D> {
    pub fn new(cache: Arc<EndpointCache<L>>, dissector: D, dissect: bool) -> Self {
        Self { cache, dissector, dissect }
    }

    pub fn cache(&self) -> &Arc<EndpointCache<L>> {
        &self.cache
    }

    pub fn render_summary(&self, n: &DropRecord) -> String {
        render_summary(n)
    }

    /// Identity-annotated line for `n`, resolving the source endpoint
    /// through the cache.
    pub fn detailed_line(&self, n: &DropRecord) -> String {
        let reason = reason_text(n.sub_type);

        // Line templates are kept as-is; existing log scrapers match on them.
        match self.cache.identity_for(n.source) {
            Ok(resolution) => {
                match resolution.status {
                    CacheStatus::Miss => debug!(endpoint = n.source, "cache miss"),
                    CacheStatus::Hit => debug!(endpoint = n.source, "cache hit"),
                    CacheStatus::Refreshed => debug!(
                        endpoint = n.source,
                        "cache hit, identity was unresolved and has been updated"
                    ),
                    CacheStatus::Unresolved => debug!(
                        endpoint = n.source,
                        "cache hit, identity still unresolved after refresh"
                    ),
                }
                if let Some(err) = &resolution.refresh_error {
                    warn!(endpoint = n.source, error = %err, "unable to refresh endpoint from agent");
                }

                let ep = &resolution.endpoint;
                match &ep.identity {
                    Some(identity) => format!(
                        "\t[{}]:{} (id {}) ({}), , srcLabel={}, dstLabel={}, dstId={}",
                        Labels(&identity.labels),
                        n.source,
                        identity.id,
                        reason,
                        n.src_label,
                        n.dst_label,
                        n.dst_id
                    ),
                    None => {
                        debug!(endpoint = n.source, "identity nil, not accessing identity");
                        unresolved_line(n, ep.addressing.ipv4.as_deref().unwrap_or(""), &reason)
                    }
                }
            }
            Err(err) => {
                warn!(endpoint = n.source, error = %err, "unable to get information for endpoint");
                unresolved_line(n, "", &reason)
            }
        }
    }

    /// Writes the detailed line for `n`, then the dissection of any captured
    /// packet bytes behind the record in `raw`.
    pub fn render_detailed(&self, n: &DropRecord, raw: &[u8], out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.detailed_line(n))?;
        self.render_payload(n, raw, out)
    }

    /// Hands the captured packet bytes to the dissector. Nothing is written
    /// when the event carries no capture.
    pub fn render_payload(&self, n: &DropRecord, raw: &[u8], out: &mut dyn Write) -> io::Result<()> {
        let payload = n.payload(raw);
        if payload.is_empty() {
            return Ok(());
        }
        self.dissector.dissect(self.dissect, payload, out)
    }
}

fn unresolved_line(n: &DropRecord, addr: &str, reason: &str) -> String {
    format!(
        "\t[{}]:{} (nil secID}} ({}), srcLabel={}, dstLabel={}, dstId={}",
        addr, n.source, reason, n.src_label, n.dst_label, n.dst_id
    )
}
