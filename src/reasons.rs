use std::borrow::Cow;

pub const DROP_POLICY: u8 = 133;
pub const DROP_POLICY_L4: u8 = 159;

/// Drop cause codes reported by the datapath.
pub const DROP_REASON_TABLE: &[(u8, &str)] = &[
    (0, "Success"),
    (2, "Invalid packet"),
    (130, "Invalid source mac"),
    (131, "Invalid destination mac"),
    (132, "Invalid source ip"),
    (DROP_POLICY, "Policy denied"),
    (134, "Invalid packet"),
    (135, "CT: Truncated or invalid header"),
    (136, "CT: Missing TCP ACK flag"),
    (137, "CT: Unknown L4 protocol"),
    (138, "CT: Can't create entry from packet"),
    (139, "Unsupported L3 protocol"),
    (140, "Missed tail call"),
    (141, "Error writing to packet"),
    (142, "Unknown L4 protocol"),
    (143, "Unknown ICMPv4 code"),
    (144, "Unknown ICMPv4 type"),
    (145, "Unknown ICMPv6 code"),
    (146, "Unknown ICMPv6 type"),
    (147, "Error retrieving tunnel key"),
    (148, "Error retrieving tunnel options"),
    (149, "Invalid Geneve option"),
    (150, "Unknown L3 target address"),
    (151, "Not a local target address"),
    (152, "No matching local container found"),
    (153, "Error while correcting L3 checksum"),
    (154, "Error while correcting L4 checksum"),
    (155, "CT: Map insertion failed"),
    (156, "Invalid IPv6 extension header"),
    (157, "IPv6 fragmentation not supported"),
    (158, "Service backend not found"),
    (DROP_POLICY_L4, "Policy denied (L4)"),
    (160, "No tunnel/encapsulation endpoint"),
];

pub fn lookup_reason(code: u8) -> Option<&'static str> {
    DROP_REASON_TABLE
        .iter()
        .find_map(|(c, text)| if *c == code { Some(*text) } else { None })
}

/// Human readable drop cause. Codes the table doesn't know yet render as
/// their decimal value.
pub fn reason_text(code: u8) -> Cow<'static, str> {
    match lookup_reason(code) {
        Some(text) => Cow::Borrowed(text),
        None => Cow::Owned(code.to_string()),
    }
}
