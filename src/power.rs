//! 電源ライフサイクルブリッジ
//!
//! ホスト環境から届く4系統の非同期ライフサイクル通知を
//! [`SleepSync`] の遷移へ接続する。
//!
//! | イベント | 動作 |
//! |---|---|
//! | 省電力移行 | `suspend()` (フラグ有効時のみフラッシュ) |
//! | 省電力復帰 | `resume()` |
//! | power-down / halt | `force_suspend()` (フラグ無視) |
//! | panic | `force_suspend()` (フラグ無視、最高優先度) |
//!
//! 再起動コード ([`ShutdownCode::Restart`]) は耐久性クリティカルな遷移
//! ではないため素通しする。

use alloc::sync::Arc;

use crate::notify::{NotifierChain, NotifierId};
use crate::state::SleepSync;

/// 省電力遷移イベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepEvent {
    /// 省電力状態へ移行
    Enter,
    /// 省電力状態から復帰
    Leave,
}

/// シャットダウン種別コード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCode {
    /// 電源断
    PowerDown,
    /// 停止
    Halt,
    /// 再起動
    Restart,
}

/// カーネルパニック通知 (ペイロードなし)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicEvent;

/// ライフサイクル通知チェーン一式
pub struct LifecycleChains {
    /// 省電力移行/復帰
    pub sleep: NotifierChain<SleepEvent>,
    /// シャットダウン/再起動
    pub reboot: NotifierChain<ShutdownCode>,
    /// カーネルパニック
    pub panic: NotifierChain<PanicEvent>,
}

impl LifecycleChains {
    /// 空のチェーン一式を作成
    pub const fn new() -> Self {
        Self {
            sleep: NotifierChain::new(),
            reboot: NotifierChain::new(),
            panic: NotifierChain::new(),
        }
    }
}

/// プロセス全体のライフサイクル通知チェーン
static LIFECYCLE_CHAINS: LifecycleChains = LifecycleChains::new();

/// グローバルチェーンを取得
pub fn lifecycle_chains() -> &'static LifecycleChains {
    &LIFECYCLE_CHAINS
}

/// 登録済みフックの解除用ハンドル
#[derive(Debug)]
pub struct LifecycleHooks {
    sleep: NotifierId,
    reboot: NotifierId,
    panic: NotifierId,
}

/// コーディネータのハンドラを各チェーンへ登録する
///
/// パニックフックは他の購読者より先に走るよう最高優先度で登録する。
pub fn register_hooks(sync: Arc<SleepSync>, chains: &LifecycleChains) -> LifecycleHooks {
    let s = sync.clone();
    let sleep = chains.sleep.register(move |event| match event {
        SleepEvent::Enter => s.suspend(),
        SleepEvent::Leave => s.resume(),
    });

    let s = sync.clone();
    let reboot = chains.reboot.register(move |code| {
        if matches!(code, ShutdownCode::PowerDown | ShutdownCode::Halt) {
            s.force_suspend();
        }
    });

    let panic = chains
        .panic
        .register_priority(i32::MAX, move |_event| sync.force_suspend());

    LifecycleHooks {
        sleep,
        reboot,
        panic,
    }
}

/// 登録済みフックを全て解除する
///
/// モジュール破棄と部分初期化失敗の巻き戻しの両方から使う。
pub fn unregister_hooks(hooks: LifecycleHooks, chains: &LifecycleChains) {
    chains.sleep.unregister(hooks.sleep);
    chains.reboot.unregister(hooks.reboot);
    chains.panic.unregister(hooks.panic);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::WritebackOps;
    use core::sync::atomic::{AtomicU64, Ordering};

    struct CountingOps {
        flushes: AtomicU64,
    }

    impl CountingOps {
        fn new() -> Self {
            Self {
                flushes: AtomicU64::new(0),
            }
        }
    }

    impl WritebackOps for CountingOps {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn start_writeback(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }

        fn wait_writeback(&self) {}
    }

    fn setup() -> (Arc<SleepSync>, Arc<CountingOps>, LifecycleChains, LifecycleHooks) {
        let ops = Arc::new(CountingOps::new());
        let sync = Arc::new(SleepSync::new(ops.clone()));
        let chains = LifecycleChains::new();
        let hooks = register_hooks(sync.clone(), &chains);
        (sync, ops, chains, hooks)
    }

    #[test]
    fn test_sleep_events_drive_transitions() {
        let (sync, ops, chains, _hooks) = setup();

        // 無効のままの移行は何も起こさない
        chains.sleep.notify(SleepEvent::Enter);
        assert!(!sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 0);

        sync.set_active(true);
        chains.sleep.notify(SleepEvent::Enter);
        assert!(sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 1);

        chains.sleep.notify(SleepEvent::Leave);
        assert!(!sync.is_suspended());
    }

    #[test]
    fn test_repeated_enter_is_idempotent() {
        let (sync, ops, chains, _hooks) = setup();

        sync.set_active(true);
        chains.sleep.notify(SleepEvent::Enter);
        chains.sleep.notify(SleepEvent::Enter);

        assert!(sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 2);

        // 対応する移行のない復帰も安全
        chains.sleep.notify(SleepEvent::Leave);
        chains.sleep.notify(SleepEvent::Leave);
        assert!(!sync.is_suspended());
    }

    #[test]
    fn test_shutdown_codes() {
        let (sync, ops, chains, _hooks) = setup();

        // 再起動は対象外
        chains.reboot.notify(ShutdownCode::Restart);
        assert!(!sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 0);

        // halt はフラグ無効でも強制フラッシュ
        chains.reboot.notify(ShutdownCode::Halt);
        assert!(sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 1);

        chains.reboot.notify(ShutdownCode::PowerDown);
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_forces_flush() {
        let (sync, ops, chains, _hooks) = setup();

        assert!(!sync.is_active());
        chains.panic.notify(PanicEvent);

        assert!(sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(sync.stats().emergency_flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_hooks_stops_delivery() {
        let (sync, ops, chains, hooks) = setup();

        unregister_hooks(hooks, &chains);
        assert!(chains.sleep.is_empty());
        assert!(chains.reboot.is_empty());
        assert!(chains.panic.is_empty());

        sync.set_active(true);
        chains.sleep.notify(SleepEvent::Enter);
        chains.panic.notify(PanicEvent);
        assert!(!sync.is_suspended());
        assert_eq!(ops.flushes.load(Ordering::SeqCst), 0);
    }
}
