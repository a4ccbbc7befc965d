//! Client address resolution.
//!
//! Turns the proxy-chain header and the transport peer address into an
//! ordered list of candidate client addresses.
//!
//! Every proxy appends the address it saw to the right end of the header, so
//! the list is reversed: the entry added by the nearest hop comes first. The
//! peer address is always last. Header entries are attacker controlled unless
//! an upstream hop strips and re-sets the header; they only ever add
//! candidates, never remove the peer.

/// Conventional proxy-chain header name.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Build the candidate list for one request.
pub fn resolve(forwarded_for: Option<&str>, peer: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Some(header) = forwarded_for.filter(|h| !h.is_empty()) {
        candidates.extend(
            header
                .split(',')
                .rev()
                .map(clean)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string),
        );
    }

    let host = split_host_port(peer).unwrap_or(peer);
    candidates.push(clean(host).to_string());

    candidates
}

fn clean(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '[' || c == ']')
}

/// Strip the port from `host:port` or `[host]:port`.
///
/// Returns `None` when the input carries no port, including bare IPv6
/// addresses with more than one colon.
fn split_host_port(addr: &str) -> Option<&str> {
    let addr = addr.trim();

    if let Some(rest) = addr.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        return match rest[end + 1..].strip_prefix(':') {
            Some(_) if !host.contains('[') => Some(host),
            _ => None,
        };
    }

    let (host, _port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some(host)
}
