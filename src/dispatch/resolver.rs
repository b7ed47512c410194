use crate::dispatch::request::ClientAddr;
use crate::registry::NodeTable;

/// Turn a (host, port) client endpoint into a dispatch address.
///
/// When the node table carries an explicit address override for `host`,
/// the override is used; otherwise the hostname rides through unchanged
/// and the transport performs name resolution at send time. A malformed
/// endpoint is not an error here; it surfaces later as a send failure.
pub fn resolve(host: &str, port: u16, nodes: &NodeTable) -> ClientAddr {
    match nodes.addr_of(host) {
        Some(addr) => ClientAddr::new(addr, port),
        None => ClientAddr::new(host, port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_node_addr_override_when_present() {
        let mut nodes = NodeTable::new();
        nodes.add_with_addr("n0", 3, "10.1.0.10");
        let addr = resolve("n0", 7100, &nodes);
        assert_eq!(addr, ClientAddr::new("10.1.0.10", 7100));
    }

    #[test]
    fn falls_back_to_hostname() {
        let mut nodes = NodeTable::new();
        nodes.add("n0", 3);
        assert_eq!(resolve("n0", 7100, &nodes), ClientAddr::new("n0", 7100));
        // Hosts outside the node table resolve at send time.
        assert_eq!(
            resolve("login0", 7100, &nodes),
            ClientAddr::new("login0", 7100)
        );
    }
}
