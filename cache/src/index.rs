use std::collections::{
    HashMap,
    HashSet,
};
use std::sync::RwLock;

use crate::resource::{
    JobRecord,
    PodRecord,
    ReplicaSetRecord,
};

#[derive(Default)]
struct Tables {
    pods_by_node: HashMap<String, HashSet<String>>,
    pods_by_namespace: HashMap<String, HashSet<String>>,
    pods_by_owner_uid: HashMap<String, HashSet<String>>,
    pods_by_configmap: HashMap<String, HashSet<String>>,
    pods_by_secret: HashMap<String, HashSet<String>>,
    pods_by_pvc: HashMap<String, HashSet<String>>,
    jobs_by_owner_uid: HashMap<String, HashSet<String>>,
    jobs_by_namespace: HashMap<String, HashSet<String>>,
    replica_sets_by_owner_uid: HashMap<String, HashSet<String>>,
}

fn insert_into(table: &mut HashMap<String, HashSet<String>>, key: String, uid: String) {
    table.entry(key).or_default().insert(uid);
}

/// Remove `uid` from the bucket at `key`; prunes the bucket entirely once it's empty so the
/// table doesn't grow unboundedly with stale namespaces/nodes/owners.
fn remove_from(table: &mut HashMap<String, HashSet<String>>, key: &str, uid: &str) {
    if let Some(bucket) = table.get_mut(key) {
        bucket.remove(uid);
        if bucket.is_empty() {
            table.remove(key);
        }
    }
}

/// Every secondary index for one context, maintained incrementally by the informer event
/// handlers and read by the query layer. Each table maps some relationship key
/// (node name, namespace, owner uid, volume reference name) to a set of object uids.
#[derive(Default)]
pub struct ClusterIndex {
    tables: RwLock<Tables>,
}

impl ClusterIndex {
    pub fn new() -> ClusterIndex {
        ClusterIndex::default()
    }

    pub fn index_pod(&self, pod: &PodRecord) {
        let uid = pod.meta.uid.clone();
        let mut t = self.tables.write().expect("index lock poisoned");
        if let Some(node) = &pod.node_name {
            insert_into(&mut t.pods_by_node, node.clone(), uid.clone());
        }
        if let Some(ns) = &pod.meta.namespace {
            insert_into(&mut t.pods_by_namespace, ns.clone(), uid.clone());
        }
        for owner in &pod.meta.owner_uids {
            insert_into(&mut t.pods_by_owner_uid, owner.clone(), uid.clone());
        }
        for cm in &pod.configmap_refs {
            insert_into(&mut t.pods_by_configmap, cm.clone(), uid.clone());
        }
        for secret in &pod.secret_refs {
            insert_into(&mut t.pods_by_secret, secret.clone(), uid.clone());
        }
        for pvc in &pod.pvc_refs {
            insert_into(&mut t.pods_by_pvc, pvc.clone(), uid.clone());
        }
    }

    pub fn deindex_pod(&self, pod: &PodRecord) {
        let uid = &pod.meta.uid;
        let mut t = self.tables.write().expect("index lock poisoned");
        if let Some(node) = &pod.node_name {
            remove_from(&mut t.pods_by_node, node, uid);
        }
        if let Some(ns) = &pod.meta.namespace {
            remove_from(&mut t.pods_by_namespace, ns, uid);
        }
        for owner in &pod.meta.owner_uids {
            remove_from(&mut t.pods_by_owner_uid, owner, uid);
        }
        for cm in &pod.configmap_refs {
            remove_from(&mut t.pods_by_configmap, cm, uid);
        }
        for secret in &pod.secret_refs {
            remove_from(&mut t.pods_by_secret, secret, uid);
        }
        for pvc in &pod.pvc_refs {
            remove_from(&mut t.pods_by_pvc, pvc, uid);
        }
    }

    /// Remove-then-insert: the straightforward way to handle an update without reasoning about
    /// which individual relationships changed.
    pub fn reindex_pod(&self, old: &PodRecord, new: &PodRecord) {
        self.deindex_pod(old);
        self.index_pod(new);
    }

    pub fn index_job(&self, job: &JobRecord) {
        let uid = job.meta.uid.clone();
        let mut t = self.tables.write().expect("index lock poisoned");
        for owner in &job.meta.owner_uids {
            insert_into(&mut t.jobs_by_owner_uid, owner.clone(), uid.clone());
        }
        if let Some(ns) = &job.meta.namespace {
            insert_into(&mut t.jobs_by_namespace, ns.clone(), uid.clone());
        }
    }

    pub fn deindex_job(&self, job: &JobRecord) {
        let uid = &job.meta.uid;
        let mut t = self.tables.write().expect("index lock poisoned");
        for owner in &job.meta.owner_uids {
            remove_from(&mut t.jobs_by_owner_uid, owner, uid);
        }
        if let Some(ns) = &job.meta.namespace {
            remove_from(&mut t.jobs_by_namespace, ns, uid);
        }
    }

    pub fn reindex_job(&self, old: &JobRecord, new: &JobRecord) {
        self.deindex_job(old);
        self.index_job(new);
    }

    pub fn index_replica_set(&self, rs: &ReplicaSetRecord) {
        let uid = rs.meta.uid.clone();
        let mut t = self.tables.write().expect("index lock poisoned");
        for owner in &rs.meta.owner_uids {
            insert_into(&mut t.replica_sets_by_owner_uid, owner.clone(), uid.clone());
        }
    }

    pub fn deindex_replica_set(&self, rs: &ReplicaSetRecord) {
        let uid = &rs.meta.uid;
        let mut t = self.tables.write().expect("index lock poisoned");
        for owner in &rs.meta.owner_uids {
            remove_from(&mut t.replica_sets_by_owner_uid, owner, uid);
        }
    }

    pub fn reindex_replica_set(&self, old: &ReplicaSetRecord, new: &ReplicaSetRecord) {
        self.deindex_replica_set(old);
        self.index_replica_set(new);
    }

    fn lookup(table: &HashMap<String, HashSet<String>>, key: &str) -> Vec<String> {
        table.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn pods_by_node(&self, node: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_node, node)
    }

    pub fn pods_by_namespace(&self, ns: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_namespace, ns)
    }

    pub fn pods_by_owner_uid(&self, owner_uid: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_owner_uid, owner_uid)
    }

    pub fn pods_by_configmap(&self, name: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_configmap, name)
    }

    pub fn pods_by_secret(&self, name: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_secret, name)
    }

    pub fn pods_by_pvc(&self, name: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").pods_by_pvc, name)
    }

    pub fn jobs_by_owner_uid(&self, owner_uid: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").jobs_by_owner_uid, owner_uid)
    }

    pub fn jobs_by_namespace(&self, ns: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").jobs_by_namespace, ns)
    }

    pub fn replica_sets_by_owner_uid(&self, owner_uid: &str) -> Vec<String> {
        Self::lookup(&self.tables.read().expect("index lock poisoned").replica_sets_by_owner_uid, owner_uid)
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;
    use crate::resource::ResourceMetadata;

    fn pod_on(uid: &str, node: &str, owner: Option<&str>) -> PodRecord {
        PodRecord {
            meta: ResourceMetadata {
                uid: uid.into(),
                namespace: Some("default".into()),
                owner_uids: owner.into_iter().map(String::from).collect(),
                ..Default::default()
            },
            node_name: Some(node.into()),
            ..Default::default()
        }
    }

    #[rstest]
    fn test_index_and_deindex_pod_by_node() {
        let idx = ClusterIndex::new();
        let p = pod_on("p1", "node-a", None);
        idx.index_pod(&p);
        assert_eq!(idx.pods_by_node("node-a"), vec!["p1".to_string()]);

        idx.deindex_pod(&p);
        assert!(idx.pods_by_node("node-a").is_empty());
    }

    #[rstest]
    fn test_reindex_moves_pod_between_nodes() {
        let idx = ClusterIndex::new();
        let old = pod_on("p1", "node-a", None);
        let new = pod_on("p1", "node-b", None);
        idx.index_pod(&old);
        idx.reindex_pod(&old, &new);

        assert!(idx.pods_by_node("node-a").is_empty());
        assert_eq!(idx.pods_by_node("node-b"), vec!["p1".to_string()]);
    }

    #[rstest]
    fn test_empty_bucket_pruned_after_last_removal() {
        let idx = ClusterIndex::new();
        let p = pod_on("p1", "node-a", Some("owner-1"));
        idx.index_pod(&p);
        idx.deindex_pod(&p);

        let t = idx.tables.read().unwrap();
        assert!(!t.pods_by_node.contains_key("node-a"));
        assert!(!t.pods_by_owner_uid.contains_key("owner-1"));
    }

    #[rstest]
    fn test_pods_by_owner_uid_multiple_pods_same_owner() {
        let idx = ClusterIndex::new();
        idx.index_pod(&pod_on("p1", "node-a", Some("rs-1")));
        idx.index_pod(&pod_on("p2", "node-b", Some("rs-1")));

        let mut pods = idx.pods_by_owner_uid("rs-1");
        pods.sort();
        assert_eq!(pods, vec!["p1".to_string(), "p2".to_string()]);
    }
}
