//! Consistent hashing with virtual replicas.

use std::net::IpAddr;

use md5::{Digest, Md5};

use crate::domain::backend::{Backend, BackendId};

/// Default number of virtual replicas per backend.
pub const DEFAULT_REPLICAS: usize = 10;

fn hash128(bytes: &[u8]) -> u128 {
    let digest = Md5::digest(bytes);
    u128::from_be_bytes(digest.into())
}

/// An immutable ring of virtual-node positions built once from the
/// backend list at construction time. Requires no synchronization after
/// that: lookups only read.
#[derive(Debug)]
pub struct HashRing {
    /// Ring positions, sorted ascending.
    positions: Vec<u128>,
    /// Backend owning each position, parallel to `positions`.
    owners: Vec<BackendId>,
}

impl HashRing {
    /// Build the ring from every backend in `backends`, regardless of
    /// current health, inserting `replicas` virtual nodes each.
    pub fn new(backends: &[Backend], replicas: usize) -> Self {
        let mut entries: Vec<(u128, BackendId)> = Vec::with_capacity(backends.len() * replicas);
        for b in backends {
            for i in 0..replicas {
                let key = format!("{}replica{}", b.ip, i);
                entries.push((hash128(key.as_bytes()), b.id));
            }
        }
        entries.sort_by_key(|(pos, _)| *pos);

        let positions = entries.iter().map(|(pos, _)| *pos).collect();
        let owners = entries.iter().map(|(_, id)| *id).collect();
        Self { positions, owners }
    }

    /// Find the first ring position at or after `H(source_ip)`, then walk
    /// forward (wrapping) until a healthy owner is found or the whole ring
    /// has been visited.
    pub fn pick(&self, backends: &[Backend], source_ip: Option<IpAddr>) -> Option<BackendId> {
        let ip = source_ip?;
        let n = self.positions.len();
        if n == 0 {
            return None;
        }

        let key = hash128(ip.to_string().as_bytes());
        let start = self.positions.partition_point(|&p| p < key);

        for offset in 0..n {
            let i = (start + offset) % n;
            let id = self.owners[i];
            if backends.iter().any(|b| b.id == id && b.healthy) {
                return Some(id);
            }
        }
        None
    }
}
