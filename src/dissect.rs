// src/dissect.rs
use std::io::{self, Write};

use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};

/// Receives the packet bytes captured behind a drop notification and writes
/// whatever it makes of them to `out`.
pub trait Dissector: Send + Sync {
    fn dissect(&self, deep: bool, payload: &[u8], out: &mut dyn Write) -> io::Result<()>;
}

impl<T: Dissector + ?Sized> Dissector for std::sync::Arc<T> {
    fn dissect(&self, deep: bool, payload: &[u8], out: &mut dyn Write) -> io::Result<()> {
        (**self).dissect(deep, payload, out)
    }
}

/// Ethernet-level breakdown of the payload, one layer per line when deep.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketDissector;

impl Dissector for PacketDissector {
    fn dissect(&self, deep: bool, payload: &[u8], out: &mut dyn Write) -> io::Result<()> {
        for line in describe(deep, payload) {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

const HEX_ROW: usize = 16;

/// One line for a shallow dissection; one line per layer plus a hex dump for
/// a deep one.
pub fn describe(deep: bool, payload: &[u8]) -> Vec<String> {
    let packet = match SlicedPacket::from_ethernet(payload) {
        Ok(packet) => packet,
        Err(e) => {
            let mut lines = vec![format!("undecodable packet ({} bytes): {}", payload.len(), e)];
            if deep {
                lines.extend(hex_dump(payload));
            }
            return lines;
        }
    };

    if !deep {
        return vec![summary_line(&packet)];
    }

    let mut lines = Vec::new();
    if let Some(LinkSlice::Ethernet2(eth)) = &packet.link {
        lines.push(format!(
            "Ethernet {} -> {} type={:#06x}",
            format_mac(&eth.source()),
            format_mac(&eth.destination()),
            eth.ether_type().0
        ));
    }
    match &packet.net {
        Some(NetSlice::Ipv4(ipv4)) => {
            let h = ipv4.header();
            lines.push(format!(
                "IPv4 {} -> {} ttl={} len={}",
                h.source_addr(),
                h.destination_addr(),
                h.ttl(),
                h.total_len()
            ));
        }
        Some(NetSlice::Ipv6(ipv6)) => {
            let h = ipv6.header();
            lines.push(format!(
                "IPv6 {} -> {} hop_limit={}",
                h.source_addr(),
                h.destination_addr(),
                h.hop_limit()
            ));
        }
        _ => {}
    }
    match &packet.transport {
        Some(TransportSlice::Tcp(tcp)) => lines.push(format!(
            "TCP {} -> {} seq={} flags=[{}]",
            tcp.source_port(),
            tcp.destination_port(),
            tcp.sequence_number(),
            tcp_flags(tcp.syn(), tcp.ack(), tcp.fin(), tcp.rst(), tcp.psh())
        )),
        Some(TransportSlice::Udp(udp)) => lines.push(format!(
            "UDP {} -> {} len={}",
            udp.source_port(),
            udp.destination_port(),
            udp.length()
        )),
        Some(TransportSlice::Icmpv4(icmp)) => {
            lines.push(format!("ICMPv4 type={} code={}", icmp.type_u8(), icmp.code_u8()))
        }
        Some(TransportSlice::Icmpv6(icmp)) => {
            lines.push(format!("ICMPv6 type={} code={}", icmp.type_u8(), icmp.code_u8()))
        }
        _ => {}
    }
    lines.extend(hex_dump(payload));
    lines
}

fn summary_line(packet: &SlicedPacket) -> String {
    let (src, dst) = match &packet.net {
        Some(NetSlice::Ipv4(ipv4)) => (
            ipv4.header().source_addr().to_string(),
            ipv4.header().destination_addr().to_string(),
        ),
        Some(NetSlice::Ipv6(ipv6)) => (
            ipv6.header().source_addr().to_string(),
            ipv6.header().destination_addr().to_string(),
        ),
        _ => match &packet.link {
            Some(LinkSlice::Ethernet2(eth)) => {
                return format!(
                    "{} -> {} ethertype {:#06x}",
                    format_mac(&eth.source()),
                    format_mac(&eth.destination()),
                    eth.ether_type().0
                )
            }
            _ => return "unknown link layer".to_string(),
        },
    };

    match &packet.transport {
        Some(TransportSlice::Tcp(tcp)) => format!(
            "{}:{} -> {}:{} tcp {}",
            src,
            tcp.source_port(),
            dst,
            tcp.destination_port(),
            tcp_flags(tcp.syn(), tcp.ack(), tcp.fin(), tcp.rst(), tcp.psh())
        ),
        Some(TransportSlice::Udp(udp)) => format!(
            "{}:{} -> {}:{} udp",
            src,
            udp.source_port(),
            dst,
            udp.destination_port()
        ),
        Some(TransportSlice::Icmpv4(_)) => format!("{} -> {} icmp", src, dst),
        Some(TransportSlice::Icmpv6(_)) => format!("{} -> {} icmpv6", src, dst),
        _ => format!("{} -> {}", src, dst),
    }
}

fn tcp_flags(syn: bool, ack: bool, fin: bool, rst: bool, psh: bool) -> String {
    [(syn, 'S'), (ack, 'A'), (fin, 'F'), (rst, 'R'), (psh, 'P')]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, c)| *c)
        .collect()
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(":")
}

fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(HEX_ROW)
        .enumerate()
        .map(|(i, row)| format!("{:04x}  {}", i * HEX_ROW, hex::encode(row)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    fn tcp_syn() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(40000, 80, 1, 1024)
            .syn();
        let mut out = Vec::with_capacity(builder.size(0));
        builder.write(&mut out, &[]).unwrap();
        out
    }

    fn udp_dns() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 1], [10, 96, 0, 10], 64)
            .udp(5353, 53);
        let payload = [0u8; 12];
        let mut out = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut out, &payload).unwrap();
        out
    }

    #[test]
    fn test_shallow_tcp_summary() {
        let lines = describe(false, &tcp_syn());
        assert_eq!(lines, vec!["10.0.0.1:40000 -> 10.0.0.2:80 tcp S".to_string()]);
    }

    #[test]
    fn test_shallow_udp_summary() {
        let lines = describe(false, &udp_dns());
        assert_eq!(lines, vec!["10.0.0.1:5353 -> 10.96.0.10:53 udp".to_string()]);
    }

    #[test]
    fn test_deep_lists_layers() {
        let packet = tcp_syn();
        let lines = describe(true, &packet);
        assert_eq!(lines[0], "Ethernet 01:02:03:04:05:06 -> 07:08:09:0a:0b:0c type=0x0800");
        assert!(lines[1].starts_with("IPv4 10.0.0.1 -> 10.0.0.2 ttl=64"));
        assert!(lines[2].starts_with("TCP 40000 -> 80 seq=1 flags=[S]"));
        assert_eq!(lines.len(), 3 + (packet.len() + HEX_ROW - 1) / HEX_ROW);
        assert!(lines[3].starts_with("0000  0708090a0b0c010203040506"));
    }

    #[test]
    fn test_garbage_payload() {
        let lines = describe(false, &[0xde, 0xad]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("undecodable packet (2 bytes)"));

        let lines = describe(true, &[0xde, 0xad]);
        assert_eq!(lines[1], "0000  dead");
    }

    #[test]
    fn test_packet_dissector_writes_to_sink() {
        let mut out = Vec::new();
        PacketDissector.dissect(false, &udp_dns(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "10.0.0.1:5353 -> 10.96.0.10:53 udp\n");
    }
}
