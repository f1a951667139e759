//! Node-key chain resolution
//!
//! A node's content key cannot be unlocked without its node key, and a node
//! key is sealed to its parent's key, up to a chain root sealed to the
//! user's address key. The walk is bounded and cycle-checked: the tree is
//! supposed to be acyclic, but corrupt server data must fail loudly rather
//! than recurse forever.

use std::collections::HashSet;

use tracing::debug;
use zeroize::Zeroize;

use crate::content_key::KeyError;
use crate::keypacket;
use crate::keys::NodeKey;

/// Hard bound on the node→parent walk, far above any real tree depth.
pub const MAX_CHAIN_DEPTH: usize = 64;

/// A node key as the key repository stores it: sealed to its parent
/// (or to the address key for a chain root).
#[derive(Debug, Clone)]
pub struct LockedNodeKey {
    pub node_id: String,
    /// `None` marks a chain root, sealed to the address key.
    pub parent_id: Option<String>,
    /// Key packet carrying this node's 32-byte secret scalar.
    pub key_packet: Vec<u8>,
}

/// External key repository: resolves locked node keys by id.
pub trait NodeKeyStore {
    fn locked_node_key(
        &self,
        node_id: &str,
    ) -> impl std::future::Future<Output = Result<LockedNodeKey, KeyError>> + Send;
}

/// Resolve and unlock the key for `node_id`, walking the parent chain up to
/// the root and unsealing downward from `address_key`.
///
/// May suspend per chain link while the store fetches (possibly across a
/// network boundary to the key-repository cache).
pub async fn resolve_node_key<S: NodeKeyStore>(
    store: &S,
    address_key: &NodeKey,
    node_id: &str,
) -> Result<NodeKey, KeyError> {
    // Climb to the root, collecting the locked chain.
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = node_id.to_string();

    loop {
        if chain.len() >= MAX_CHAIN_DEPTH {
            return Err(KeyError::ChainTooDeep {
                node_id: node_id.to_string(),
                limit: MAX_CHAIN_DEPTH,
            });
        }
        if !visited.insert(current.clone()) {
            return Err(KeyError::ChainCycle {
                node_id: node_id.to_string(),
                revisited: current,
            });
        }

        let locked = store.locked_node_key(&current).await?;
        let parent = locked.parent_id.clone();
        chain.push(locked);

        match parent {
            Some(parent_id) => current = parent_id,
            None => break,
        }
    }

    debug!(node_id, depth = chain.len(), "resolved node key chain");

    // Unseal root-first: each node's packet opens with its parent's secret.
    let mut unlock_key = address_key.clone();
    for locked in chain.iter().rev() {
        let mut payload = keypacket::open(unlock_key.secret(), &locked.key_packet)?;
        let Ok(bytes) = <[u8; 32]>::try_from(payload.as_slice()) else {
            let len = payload.len();
            payload.zeroize();
            return Err(KeyError::SessionKeySize(len));
        };
        payload.zeroize();
        unlock_key = NodeKey::from_bytes(locked.node_id.clone(), bytes);
    }

    Ok(unlock_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore {
        keys: HashMap<String, LockedNodeKey>,
    }

    impl NodeKeyStore for MapStore {
        async fn locked_node_key(&self, node_id: &str) -> Result<LockedNodeKey, KeyError> {
            self.keys
                .get(node_id)
                .cloned()
                .ok_or_else(|| KeyError::Store {
                    node_id: node_id.to_string(),
                    reason: "not found".into(),
                })
        }
    }

    /// Builds a linear chain address → root → ... → leaf and returns the
    /// store plus the leaf's expected key.
    fn build_chain(address_key: &NodeKey, depth: usize) -> (MapStore, NodeKey) {
        let mut keys = HashMap::new();
        let mut parent_key = address_key.clone();
        let mut parent_id: Option<String> = None;
        let mut leaf = address_key.clone();

        for i in 0..depth {
            let node_id = format!("node-{i}");
            let node_key = NodeKey::generate(node_id.clone());
            let packet = keypacket::seal(&parent_key.public(), &node_key.to_bytes()).unwrap();
            keys.insert(
                node_id.clone(),
                LockedNodeKey {
                    node_id: node_id.clone(),
                    parent_id: parent_id.clone(),
                    key_packet: packet,
                },
            );
            parent_key = node_key.clone();
            parent_id = Some(node_id);
            leaf = node_key;
        }

        (MapStore { keys }, leaf)
    }

    #[tokio::test]
    async fn test_resolve_single_node() {
        let address = NodeKey::generate("address");
        let (store, leaf) = build_chain(&address, 1);

        let resolved = resolve_node_key(&store, &address, "node-0").await.unwrap();
        assert_eq!(resolved.public().as_bytes(), leaf.public().as_bytes());
    }

    #[tokio::test]
    async fn test_resolve_deep_chain() {
        let address = NodeKey::generate("address");
        let (store, leaf) = build_chain(&address, 5);

        let resolved = resolve_node_key(&store, &address, "node-4").await.unwrap();
        assert_eq!(resolved.public().as_bytes(), leaf.public().as_bytes());
        assert_eq!(resolved.node_id(), "node-4");
    }

    #[tokio::test]
    async fn test_resolve_missing_node() {
        let address = NodeKey::generate("address");
        let (store, _) = build_chain(&address, 1);

        let result = resolve_node_key(&store, &address, "node-9").await;
        assert!(matches!(result, Err(KeyError::Store { .. })));
    }

    #[tokio::test]
    async fn test_resolve_cycle_detected() {
        let address = NodeKey::generate("address");
        let a = NodeKey::generate("a");
        let mut keys = HashMap::new();
        // a → b → a
        keys.insert(
            "a".to_string(),
            LockedNodeKey {
                node_id: "a".into(),
                parent_id: Some("b".into()),
                key_packet: keypacket::seal(&address.public(), &a.to_bytes()).unwrap(),
            },
        );
        keys.insert(
            "b".to_string(),
            LockedNodeKey {
                node_id: "b".into(),
                parent_id: Some("a".into()),
                key_packet: keypacket::seal(&a.public(), &a.to_bytes()).unwrap(),
            },
        );
        let store = MapStore { keys };

        let result = resolve_node_key(&store, &address, "a").await;
        assert!(matches!(result, Err(KeyError::ChainCycle { .. })));
    }

    #[tokio::test]
    async fn test_resolve_depth_limit() {
        let address = NodeKey::generate("address");
        let (store, _) = build_chain(&address, MAX_CHAIN_DEPTH + 4);

        let deep = format!("node-{}", MAX_CHAIN_DEPTH + 3);
        let result = resolve_node_key(&store, &address, &deep).await;
        assert!(matches!(result, Err(KeyError::ChainTooDeep { .. })));
    }
}
