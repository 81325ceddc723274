//! 通知チェーン
//!
//! ホスト環境の非同期ライフサイクル通知を購読するための登録/解除/配送
//! 機構。専用のワーカーは持たず、配送は通知元のコンテキスト上で同期的に
//! 行う。優先度の高いハンドラから順に呼び出し、同一優先度は登録順。

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::RwLock;

/// ハンドラ登録ID (Newtype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct NotifierId(u64);

impl NotifierId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// 登録済みハンドラ
struct NotifierEntry<E> {
    id: u64,
    priority: i32,
    handler: Box<dyn Fn(E) + Send + Sync>,
}

/// 通知チェーン
pub struct NotifierChain<E> {
    entries: RwLock<Vec<NotifierEntry<E>>>,
    next_id: AtomicU64,
}

impl<E: Copy> NotifierChain<E> {
    /// 空のチェーンを作成
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// ハンドラを登録 (優先度 0)
    pub fn register<F>(&self, handler: F) -> NotifierId
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.register_priority(0, handler)
    }

    /// 優先度付きでハンドラを登録
    pub fn register_priority<F>(&self, priority: i32, handler: F) -> NotifierId
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let entry = NotifierEntry {
            id,
            priority,
            handler: Box::new(handler),
        };

        let mut entries = self.entries.write();
        let pos = entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(entries.len());
        entries.insert(pos, entry);

        NotifierId(id)
    }

    /// ハンドラ登録を解除
    pub fn unregister(&self, id: NotifierId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id.0);
        entries.len() != before
    }

    /// 登録数を取得
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// チェーンが空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 全ハンドラへイベントを配送
    pub fn notify(&self, event: E) {
        let entries = self.entries.read();
        for entry in entries.iter() {
            (entry.handler)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use spin::Mutex;

    #[test]
    fn test_register_and_notify() {
        let chain: NotifierChain<u32> = NotifierChain::new();
        let seen = Arc::new(AtomicU64::new(0));

        let s = seen.clone();
        chain.register(move |v| {
            s.fetch_add(v as u64, Ordering::SeqCst);
        });

        chain.notify(3);
        chain.notify(4);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let chain: NotifierChain<u32> = NotifierChain::new();
        let seen = Arc::new(AtomicU64::new(0));

        let s = seen.clone();
        let id = chain.register(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        chain.notify(0);
        assert!(chain.unregister(id));
        chain.notify(0);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(chain.is_empty());
        assert!(!chain.unregister(id));
    }

    #[test]
    fn test_priority_order() {
        let chain: NotifierChain<u32> = NotifierChain::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        chain.register_priority(1, move |_| o.lock().push(1));
        let o = order.clone();
        chain.register_priority(i32::MAX, move |_| o.lock().push(i32::MAX));
        let o = order.clone();
        chain.register(move |_| o.lock().push(0));

        chain.notify(0);
        assert_eq!(&*order.lock(), &[i32::MAX, 1, 0]);
    }
}
