//! 监听器注册表
//!
//! 两个注册表都可在分发迭代期间被并发修改：键注册表为每个键保存一个不可变
//! 列表，修改时整体替换（写时复制），分发只拿走当前列表的 `Arc` 快照；
//! 分组注册表依赖 `DashMap` 的 entry 原子插入保证每个分组至多一个监听器。
//!
use super::{listener::EventListener, registration::Registration};
use crate::{
    error::{EventError, EventResult},
    event::Event,
    routing::{Group, RegistrationKey},
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::collections::HashSet;
use std::sync::{Arc, Weak};

pub(crate) type SharedListener<E> = Arc<dyn EventListener<E>>;

/// 按实例（指针）判断是否为同一监听器
pub(crate) fn same_listener<E: Event>(a: &SharedListener<E>, b: &SharedListener<E>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) struct KeyRegistry<E: Event> {
    entries: DashMap<RegistrationKey, Arc<[SharedListener<E>]>>,
}

impl<E: Event> KeyRegistry<E> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
        })
    }

    /// 同一键下重复注册同一实例只保留一份
    pub(crate) fn register(
        self: &Arc<Self>,
        key: RegistrationKey,
        listener: SharedListener<E>,
    ) -> Registration {
        self.entries
            .entry(key.clone())
            .and_modify(|current| {
                if !current.iter().any(|l| same_listener(l, &listener)) {
                    *current = current
                        .iter()
                        .cloned()
                        .chain(std::iter::once(listener.clone()))
                        .collect();
                }
            })
            .or_insert_with(|| Arc::from(vec![listener.clone()]));

        let registry: Weak<Self> = Arc::downgrade(self);
        Registration::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.unregister(&key, &listener);
            }
        })
    }

    fn unregister(&self, key: &RegistrationKey, listener: &SharedListener<E>) {
        if let Some(mut current) = self.entries.get_mut(key) {
            let remaining: Arc<[SharedListener<E>]> = current
                .iter()
                .filter(|l| !same_listener(l, listener))
                .cloned()
                .collect();
            *current = remaining;
        }
        self.entries.remove_if(key, |_, current| current.is_empty());
    }

    /// 汇总多个键下的监听器，同一实例只出现一次
    pub(crate) fn snapshot(&self, keys: &HashSet<RegistrationKey>) -> Vec<SharedListener<E>> {
        let lists: Vec<Arc<[SharedListener<E>]>> = keys
            .iter()
            .filter_map(|key| self.entries.get(key).map(|list| list.value().clone()))
            .collect();

        let mut listeners: Vec<SharedListener<E>> = Vec::new();
        for listener in lists.iter().flat_map(|list| list.iter()) {
            if !listeners.iter().any(|l| same_listener(l, listener)) {
                listeners.push(listener.clone());
            }
        }
        listeners
    }
}

pub(crate) struct GroupRegistry<E: Event> {
    entries: DashMap<Group, SharedListener<E>>,
}

impl<E: Event> GroupRegistry<E> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
        })
    }

    /// 分组已被占用时返回 `GroupAlreadyRegistered`，原监听器保持不变
    pub(crate) fn register(
        self: &Arc<Self>,
        group: Group,
        listener: SharedListener<E>,
    ) -> EventResult<Registration> {
        match self.entries.entry(group.clone()) {
            Entry::Occupied(_) => return Err(EventError::GroupAlreadyRegistered { group }),
            Entry::Vacant(slot) => {
                slot.insert(listener.clone());
            }
        }

        let registry: Weak<Self> = Arc::downgrade(self);
        Ok(Registration::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .entries
                    .remove_if(&group, |_, current| same_listener(current, &listener));
            }
        }))
    }

    pub(crate) fn get(&self, group: &Group) -> Option<SharedListener<E>> {
        self.entries.get(group).map(|l| l.value().clone())
    }

    pub(crate) fn snapshot(&self) -> Vec<(Group, SharedListener<E>)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub(crate) fn groups(&self) -> HashSet<Group> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::listener_fn;
    use crate::testing::TestEvent;

    fn noop_listener() -> SharedListener<TestEvent> {
        listener_fn(|_: &TestEvent| Ok(()))
    }

    fn keys(values: &[&str]) -> HashSet<RegistrationKey> {
        values.iter().map(|v| RegistrationKey::from(*v)).collect()
    }

    #[test]
    fn key_registry_keeps_set_semantics() {
        let registry = KeyRegistry::new();
        let listener = noop_listener();

        let first = registry.register("k1".into(), listener.clone());
        let _again = registry.register("k1".into(), listener.clone());
        let _other_key = registry.register("k2".into(), listener.clone());

        assert_eq!(registry.snapshot(&keys(&["k1"])).len(), 1);
        assert_eq!(registry.snapshot(&keys(&["k1", "k2"])).len(), 1);

        first.cancel();
        assert!(registry.snapshot(&keys(&["k1"])).is_empty());
        assert_eq!(registry.snapshot(&keys(&["k2"])).len(), 1);
    }

    #[test]
    fn key_unregister_removes_only_that_pair() {
        let registry = KeyRegistry::new();
        let a = noop_listener();
        let b = noop_listener();

        let reg_a = registry.register("k".into(), a.clone());
        let _reg_b = registry.register("k".into(), b.clone());

        let before = registry.snapshot(&keys(&["k"]));
        reg_a.cancel();
        let after = registry.snapshot(&keys(&["k"]));

        assert_eq!(before.len(), 2);
        assert_eq!(after.len(), 1);
        assert!(same_listener(&after[0], &b));
    }

    #[test]
    fn group_registry_is_exclusive_until_cancel() {
        let registry = GroupRegistry::new();
        let group = Group::new("indexer");

        let first = registry.register(group.clone(), noop_listener()).unwrap();
        let err = registry
            .register(group.clone(), noop_listener())
            .unwrap_err();
        assert!(matches!(err, EventError::GroupAlreadyRegistered { .. }));

        first.cancel();
        assert!(registry.get(&group).is_none());
        assert!(registry.register(group.clone(), noop_listener()).is_ok());
        assert_eq!(registry.groups(), HashSet::from([group]));
    }

    #[test]
    fn stale_cancel_keeps_newer_listener() {
        let registry = GroupRegistry::new();
        let group = Group::new("indexer");

        let first = registry.register(group.clone(), noop_listener()).unwrap();
        first.cancel();
        let newer = noop_listener();
        let _second = registry.register(group.clone(), newer.clone()).unwrap();

        first.cancel();
        let current = registry.get(&group).unwrap();
        assert!(same_listener(&current, &newer));
    }
}
