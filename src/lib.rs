// ============================================================================
// src/lib.rs - sleepsync: 省電力/シャットダウン/パニック時の強制書き戻し
// ============================================================================
//!
//! # sleepsync
//!
//! デバイスが稼働し続ける間は不要なディスクフラッシュを抑え、耐久性が
//! 重要になる瞬間 (省電力移行、power-down/halt、カーネルパニック) に
//! 全ファイルシステムの書き戻しを強制するコーディネータ。
//!
//! ## 構成
//! - [`flush`]: 二段階フラッシュプリミティブの抽象化
//! - [`state`]: 遷移状態機械 ([`SleepSync`])
//! - [`notify`]: 通知チェーン (登録/解除/配送)
//! - [`power`]: ライフサイクル通知と状態遷移の接続
//! - [`ctl`]: 属性ノードによるコントロールサーフェス
//! - [`error`]: 統一エラー型
//!
//! ## 使用方法
//! ```ignore
//! sleepsync::init(Arc::new(MyWriteback))?;
//! // ... ホストが省電力/シャットダウン/パニック通知を配送する ...
//! sleepsync::exit()?;
//! ```

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod ctl;
pub mod error;
pub mod flush;
pub mod notify;
pub mod power;
pub mod state;

use alloc::sync::Arc;
use log::{error, info};
use spin::Mutex;

pub use ctl::{ctlfs, CtlError, CtlFs, CtlNode, CtlResult, NodeMode};
pub use error::{SleepSyncError, SleepSyncResult};
pub use flush::{force_flush, NullWriteback, WritebackOps};
pub use notify::{NotifierChain, NotifierId};
pub use power::{
    lifecycle_chains, LifecycleChains, LifecycleHooks, PanicEvent, ShutdownCode, SleepEvent,
};
pub use state::{SleepSync, SleepSyncStats};

/// メジャーバージョン
pub const VERSION_MAJOR: u32 = 3;
/// マイナーバージョン
pub const VERSION_MINOR: u32 = 0;

/// 初期化済みモジュールの状態
struct ModuleState {
    sync: Arc<SleepSync>,
    hooks: LifecycleHooks,
}

/// モジュールホルダ (init/exit で生成・破棄)
static MODULE: Mutex<Option<ModuleState>> = Mutex::new(None);

/// モジュールを初期化する
///
/// ライフサイクルフックをグローバルチェーンへ登録し、コントロール
/// サーフェスに属性グループを作成する。登録に失敗した場合は部分登録を
/// 巻き戻してから失敗を返す。
pub fn init(ops: Arc<dyn WritebackOps>) -> SleepSyncResult<()> {
    let mut module = MODULE.lock();
    if module.is_some() {
        return Err(SleepSyncError::AlreadyInitialized);
    }

    let sync = Arc::new(SleepSync::new(ops));

    let hooks = power::register_hooks(sync.clone(), power::lifecycle_chains());

    if let Err(e) = ctl::register_group(ctl::ctlfs(), sync.clone()) {
        error!("sleepsync: control group registration failed: {}", e);
        power::unregister_hooks(hooks, power::lifecycle_chains());
        return Err(e.into());
    }

    info!(
        "sleepsync: initialized (version {}.{}, backend: {})",
        VERSION_MAJOR,
        VERSION_MINOR,
        sync.ops().name()
    );

    *module = Some(ModuleState { sync, hooks });
    Ok(())
}

/// モジュールを破棄する
///
/// フック登録と属性グループを全て解除する。
pub fn exit() -> SleepSyncResult<()> {
    let mut module = MODULE.lock();
    match module.take() {
        Some(m) => {
            power::unregister_hooks(m.hooks, power::lifecycle_chains());
            ctl::unregister_group(ctl::ctlfs());
            info!("sleepsync: exited");
            Ok(())
        }
        None => Err(SleepSyncError::NotInitialized),
    }
}

/// 稼働中のコーディネータを取得する
pub fn sleep_sync() -> Option<Arc<SleepSync>> {
    MODULE.lock().as_ref().map(|m| m.sync.clone())
}
