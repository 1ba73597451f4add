use std::collections::HashMap;
use std::sync::{
    Arc,
    RwLock,
};

use crate::resource::{
    HasMetadata,
    TypedRecord,
};

type AddOrDeleteHook<R> = Box<dyn Fn(&R) + Send + Sync>;
type UpdateHook<R> = Box<dyn Fn(&R, &R) + Send + Sync>;

/// The in-memory mirror for a single kind. One instance per `(context, kind)`. The informer
/// task is the sole writer; queries run from arbitrary tasks and only ever take the read lock,
/// cloning the `Arc` handles they need before releasing it.
pub struct ResourceCache<R: TypedRecord> {
    by_uid: RwLock<HashMap<String, Arc<R>>>,
    by_name: RwLock<HashMap<String, String>>,
    on_add: Vec<AddOrDeleteHook<R>>,
    on_update: Vec<UpdateHook<R>>,
    on_delete: Vec<AddOrDeleteHook<R>>,
}

impl<R: TypedRecord> Default for ResourceCache<R> {
    fn default() -> Self {
        ResourceCache {
            by_uid: RwLock::default(),
            by_name: RwLock::default(),
            on_add: vec![],
            on_update: vec![],
            on_delete: vec![],
        }
    }
}

impl<R: TypedRecord> ResourceCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions must be registered before the informer starts; there's no way to add one
    /// afterwards short of missing events that already fired.
    pub fn on_add(&mut self, f: impl Fn(&R) + Send + Sync + 'static) {
        self.on_add.push(Box::new(f));
    }

    /// Update hooks receive both the old and new record so index maintenance can do the
    /// remove-old-then-add-new dance in a single pass.
    pub fn on_update(&mut self, f: impl Fn(&R, &R) + Send + Sync + 'static) {
        self.on_update.push(Box::new(f));
    }

    pub fn on_delete(&mut self, f: impl Fn(&R) + Send + Sync + 'static) {
        self.on_delete.push(Box::new(f));
    }

    /// Insert or overwrite a record by uid. Fires `on_add` the first time a uid is seen and
    /// `on_update` on every subsequent apply, matching the watch stream's identity-preserving
    /// resync behaviour (re-lists surface as `Apply`, never `Add`).
    pub fn apply(&self, record: R) {
        let namespaced_name = record.namespaced_name();
        let uid = record.metadata().uid.clone();
        let record = Arc::new(record);

        let old = {
            let mut by_uid = self.by_uid.write().expect("cache lock poisoned");
            by_uid.insert(uid.clone(), record.clone())
        };
        self.by_name.write().expect("cache lock poisoned").insert(namespaced_name, uid);

        match old {
            Some(old) => {
                for hook in &self.on_update {
                    hook(&old, &record);
                }
            },
            None => {
                for hook in &self.on_add {
                    hook(&record);
                }
            },
        }
    }

    pub fn remove(&self, uid: &str) -> Option<Arc<R>> {
        let removed = self.by_uid.write().expect("cache lock poisoned").remove(uid);
        if let Some(record) = &removed {
            self.by_name
                .write()
                .expect("cache lock poisoned")
                .remove(&record.namespaced_name());
            for hook in &self.on_delete {
                hook(record);
            }
        }
        removed
    }

    /// Delete by `(namespace/name)`, as delivered by a tombstoned watch event that only carries
    /// the last known identity.
    pub fn remove_by_name(&self, namespaced_name: &str) -> Option<Arc<R>> {
        let uid = self.by_name.read().expect("cache lock poisoned").get(namespaced_name).cloned()?;
        self.remove(&uid)
    }

    pub fn get_by_uid(&self, uid: &str) -> Option<Arc<R>> {
        self.by_uid.read().expect("cache lock poisoned").get(uid).cloned()
    }

    pub fn get(&self, namespaced_name: &str) -> Option<Arc<R>> {
        let uid = self.by_name.read().expect("cache lock poisoned").get(namespaced_name).cloned()?;
        self.get_by_uid(&uid)
    }

    pub fn list(&self) -> Vec<Arc<R>> {
        self.by_uid.read().expect("cache lock poisoned").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_uid.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    use rstest::*;

    use super::*;
    use crate::resource::{
        PodRecord,
        ResourceMetadata,
    };

    fn pod(uid: &str, name: &str) -> PodRecord {
        PodRecord { meta: ResourceMetadata { uid: uid.into(), name: name.into(), ..Default::default() }, ..Default::default() }
    }

    #[rstest]
    fn test_apply_fires_add_then_update() {
        let mut cache = ResourceCache::<PodRecord>::new();
        let adds = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let (a, u) = (adds.clone(), updates.clone());
        cache.on_add(move |_| { a.fetch_add(1, Ordering::SeqCst); });
        cache.on_update(move |_, _| { u.fetch_add(1, Ordering::SeqCst); });

        cache.apply(pod("1", "a"));
        cache.apply(pod("1", "a"));

        assert_eq!(adds.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_remove_fires_delete_and_clears_both_indexes() {
        let mut cache = ResourceCache::<PodRecord>::new();
        let deletes = Arc::new(AtomicUsize::new(0));
        let d = deletes.clone();
        cache.on_delete(move |_| { d.fetch_add(1, Ordering::SeqCst); });

        cache.apply(pod("1", "a"));
        assert!(cache.get("a").is_some());

        cache.remove("1");
        assert_eq!(deletes.load(Ordering::SeqCst), 1);
        assert!(cache.get_by_uid("1").is_none());
        assert!(cache.get("a").is_none());
    }

    #[rstest]
    fn test_on_update_receives_old_and_new() {
        let mut cache = ResourceCache::<PodRecord>::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let s = seen.clone();
        cache.on_update(move |old, new| {
            *s.lock().unwrap() = Some((old.meta.name.clone(), new.meta.name.clone()));
        });

        cache.apply(pod("1", "a"));
        cache.apply(pod("1", "b"));

        assert_eq!(*seen.lock().unwrap(), Some(("a".to_string(), "b".to_string())));
    }

    #[rstest]
    fn test_remove_by_name_finds_current_uid() {
        let cache = ResourceCache::<PodRecord>::new();
        cache.apply(pod("1", "a"));
        assert!(cache.remove_by_name("a").is_some());
        assert!(cache.get_by_uid("1").is_none());
    }

    #[rstest]
    fn test_list_returns_independent_snapshot() {
        let cache = ResourceCache::<PodRecord>::new();
        cache.apply(pod("1", "a"));
        let snapshot = cache.list();
        cache.apply(pod("2", "b"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.list().len(), 2);
    }
}
