use std::collections::{BTreeMap, BTreeSet};

/// Ordered set of node indices, used for job and step node membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet(BTreeSet<u32>);

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32) {
        self.0.insert(index);
    }

    pub fn contains(&self, index: u32) -> bool {
        self.0.contains(&index)
    }

    /// Lowest set index, or `None` when the set is empty.
    pub fn first(&self) -> Option<u32> {
        self.0.iter().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for NodeSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One compute node known to the cluster.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub name: String,
    /// Position in the cluster node table.
    pub index: u32,
    /// Protocol version the node's daemon speaks.
    pub protocol_version: u16,
    /// Explicit dispatch address override. When absent, the transport
    /// resolves the node name itself.
    pub addr: Option<String>,
}

/// The cluster node table, addressable by name and by index.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<NodeRecord>,
    by_name: BTreeMap<String, u32>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; returns its index.
    pub fn add(&mut self, name: impl Into<String>, protocol_version: u16) -> u32 {
        self.add_node(name, protocol_version, None)
    }

    /// Append a node with an explicit address override; returns its index.
    pub fn add_with_addr(
        &mut self,
        name: impl Into<String>,
        protocol_version: u16,
        addr: impl Into<String>,
    ) -> u32 {
        self.add_node(name, protocol_version, Some(addr.into()))
    }

    fn add_node(
        &mut self,
        name: impl Into<String>,
        protocol_version: u16,
        addr: Option<String>,
    ) -> u32 {
        let name = name.into();
        let index = self.nodes.len() as u32;
        self.by_name.insert(name.clone(), index);
        self.nodes.push(NodeRecord {
            name,
            index,
            protocol_version,
            addr,
        });
        index
    }

    pub fn find(&self, name: &str) -> Option<&NodeRecord> {
        self.by_name.get(name).and_then(|&i| self.get(i))
    }

    pub fn get(&self, index: u32) -> Option<&NodeRecord> {
        self.nodes.get(index as usize)
    }

    /// Address override for a node name, if one is configured.
    pub fn addr_of(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|n| n.addr.as_deref())
    }

    /// Node at the lowest set index of `set`, or `None` when `set` is empty.
    pub fn first_in(&self, set: &NodeSet) -> Option<&NodeRecord> {
        set.first().and_then(|i| self.get(i))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
