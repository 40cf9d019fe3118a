use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dropmon::{
    reason_text, render_summary, Addressing, CacheStatus, DecodeError, Dissector, DropRecord,
    Endpoint, EndpointCache, IdentityLookup, LookupError, Renderer, SecurityIdentity,
    DROP_NOTIFY_LEN,
};
use proptest::prelude::*;

/// Agent stand-in: endpoint 5 gets an identity on the third query, 6 is unknown.
#[derive(Default)]
struct FakeAgent {
    queries: AtomicUsize,
}

impl IdentityLookup for FakeAgent {
    fn endpoint_get(&self, id: &str) -> Result<Endpoint, LookupError> {
        let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        match id {
            "5" => Ok(Endpoint {
                id: 5,
                addressing: Addressing { ipv4: Some("10.1.0.5".into()), ipv6: None },
                identity: (n >= 3).then(|| SecurityIdentity {
                    id: 4711,
                    labels: vec!["k8s:app=db".into(), "k8s:tier=backend".into()],
                }),
            }),
            _ => Err(LookupError::NotFound { id: id.to_string() }),
        }
    }
}

#[derive(Default)]
struct Sink(Mutex<Vec<Vec<u8>>>);

impl Dissector for Sink {
    fn dissect(&self, _deep: bool, payload: &[u8], out: &mut dyn Write) -> io::Result<()> {
        self.0.lock().unwrap().push(payload.to_vec());
        writeln!(out, "<{} captured bytes>", payload.len())
    }
}

fn event(sub_type: u8, source: u16) -> Vec<u8> {
    let mut raw = vec![0u8; DROP_NOTIFY_LEN];
    raw[0] = 1;
    raw[1] = sub_type;
    raw[2..4].copy_from_slice(&source.to_le_bytes());
    raw[4..8].copy_from_slice(&0x1f2eu32.to_le_bytes());
    raw[8..12].copy_from_slice(&74u32.to_le_bytes());
    raw[28..32].copy_from_slice(&2u32.to_le_bytes());
    raw
}

#[test]
fn end_to_end_cause_text() {
    let n = DropRecord::parse(&event(133, 5)).unwrap();
    assert_eq!(reason_text(n.sub_type), "Policy denied");
    assert_eq!(
        render_summary(&n),
        "MARK 0x1f2e FROM 5 Packet dropped 133 (Policy denied) 74 bytes ifindex=2"
    );

    let n = DropRecord::parse(&event(255, 5)).unwrap();
    assert_eq!(reason_text(n.sub_type), "255");
    assert!(render_summary(&n).contains("Packet dropped 255 (255)"));
}

#[test]
fn end_to_end_identity_upgrade() {
    let agent = Arc::new(FakeAgent::default());
    let cache = Arc::new(EndpointCache::new(Arc::clone(&agent)));
    let sink = Arc::new(Sink::default());
    let renderer = Renderer::new(Arc::clone(&cache), Arc::clone(&sink), false);

    let mut raw = event(133, 5);
    raw[12..16].copy_from_slice(&4u32.to_le_bytes());
    raw.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
    let n = DropRecord::parse(&raw).unwrap();

    let render = |raw: &[u8]| {
        let mut out = Vec::new();
        renderer.render_detailed(&n, raw, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    };

    let first = render(&raw);
    assert!(first.starts_with("\t[10.1.0.5]:5 (nil secID}"));
    let second = render(&raw);
    assert!(second.starts_with("\t[10.1.0.5]:5 (nil secID}"));
    let third = render(&raw);
    assert_eq!(
        third,
        "\t[[k8s:app=db k8s:tier=backend]]:5 (id 4711) (Policy denied), , srcLabel=0, dstLabel=0, dstId=0\n<4 captured bytes>\n"
    );
    render(&raw);
    assert_eq!(agent.queries.load(Ordering::SeqCst), 3);
    assert_eq!(cache.identity_for(5).unwrap().status, CacheStatus::Hit);

    let payloads = sink.0.lock().unwrap();
    assert_eq!(payloads.len(), 4);
    assert!(payloads.iter().all(|p| p == &[0xaa, 0xbb, 0xcc, 0xdd]));
}

#[test]
fn end_to_end_unknown_endpoint_still_rendered() {
    let agent = Arc::new(FakeAgent::default());
    let cache = Arc::new(EndpointCache::new(Arc::clone(&agent)));
    let renderer = Renderer::new(Arc::clone(&cache), Sink::default(), false);

    let raw = event(159, 6);
    let n = DropRecord::parse(&raw).unwrap();
    assert_eq!(
        renderer.detailed_line(&n),
        "\t[]:6 (nil secID} (Policy denied (L4)), srcLabel=0, dstLabel=0, dstId=0"
    );
    renderer.detailed_line(&n);
    assert_eq!(agent.queries.load(Ordering::SeqCst), 2);
    assert!(cache.is_empty());
}

proptest! {
    #[test]
    fn short_buffers_fail(buf in proptest::collection::vec(any::<u8>(), 0..DROP_NOTIFY_LEN)) {
        let is_too_short = matches!(DropRecord::parse(&buf), Err(DecodeError::TooShort { .. }));
        prop_assert!(is_too_short);
    }

    #[test]
    fn decoding_is_deterministic(buf in proptest::collection::vec(any::<u8>(), DROP_NOTIFY_LEN..128)) {
        let before = buf.clone();
        let a = DropRecord::parse(&buf).unwrap();
        let b = DropRecord::parse(&buf).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(&buf, &before);
        prop_assert_eq!(&a.to_bytes()[..], &buf[..DROP_NOTIFY_LEN]);
    }

    #[test]
    fn reason_text_is_total(code in any::<u8>()) {
        let text = reason_text(code);
        prop_assert!(!text.is_empty());
        if dropmon::reasons::lookup_reason(code).is_none() {
            let expected = code.to_string();
            prop_assert_eq!(text.as_ref(), expected.as_str());
        }
    }
}
