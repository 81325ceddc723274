// ============================================================================
// src/state.rs - 遷移状態機械と強制フラッシュ判定
// ============================================================================
//!
//! サスペンド/レジューム遷移の中核状態。
//!
//! ## 設計
//! - `active`: 機能の有効/無効フラグ。単一ワードのため無ロック
//!   (last-writer-wins)。遷移の瞬間に観測された値だけが効く。
//! - `suspended`: 耐久性クリティカルな遷移が発生したかどうか。通常経路の
//!   遷移は `transition_lock` で直列化し、halt/panic の緊急経路だけが
//!   ロックを取らずに直接書く。
//! - フラッシュはロックを保持したまま二段階を完走させ、遷移が確定した
//!   時点でその瞬間までのダーティデータが永続化されていることを保証する。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::flush::{self, WritebackOps};

/// 遷移統計
#[derive(Debug, Default)]
pub struct SleepSyncStats {
    /// サスペンド遷移で実行したフラッシュ回数
    pub suspend_flushes: AtomicU64,
    /// 緊急経路 (halt / panic) で実行したフラッシュ回数
    pub emergency_flushes: AtomicU64,
    /// レジューム遷移回数
    pub resumes: AtomicU64,
    /// 拒否したコントロール入力数
    pub rejected_inputs: AtomicU64,
}

/// サスペンド同期コーディネータ
///
/// 初期状態は無効・非サスペンド。
pub struct SleepSync {
    /// 機能有効フラグ (無ロック)
    active: AtomicBool,
    /// サスペンド済みフラグ
    suspended: AtomicBool,
    /// suspended の通常遷移を直列化するロック
    transition_lock: Mutex<()>,
    /// 書き戻しバックエンド
    ops: Arc<dyn WritebackOps>,
    /// 統計情報
    stats: SleepSyncStats,
}

impl SleepSync {
    /// 新しいコーディネータを作成
    pub fn new(ops: Arc<dyn WritebackOps>) -> Self {
        Self {
            active: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            transition_lock: Mutex::new(()),
            ops,
            stats: SleepSyncStats::default(),
        }
    }

    /// 機能を有効/無効にする
    ///
    /// ロックは取らない。進行中のサスペンド評価と競合した場合、
    /// フラッシュの有無はどちらの値が観測されたかで決まる。
    pub fn set_active(&self, on: bool) {
        self.active.store(on, Ordering::Relaxed);
    }

    /// 機能が有効かどうか
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// サスペンド済みかどうか (スナップショット、わずかに古い値を返しうる)
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// サスペンド遷移
    ///
    /// 機能が有効な場合のみ `suspended` を立て、ロックを保持したまま
    /// 二段階フラッシュを完走させる。無効時はフラグもフラッシュも
    /// 変化しない。既にサスペンド済みの再呼び出しは再フラッシュする
    /// (冗長だが無害)。
    pub fn suspend(&self) {
        let _guard = self.transition_lock.lock();

        if self.active.load(Ordering::Relaxed) {
            self.suspended.store(true, Ordering::Release);
            flush::force_flush(&*self.ops);
            self.stats.suspend_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// レジューム遷移
    ///
    /// 無条件に `suspended` をクリアする。
    pub fn resume(&self) {
        let _guard = self.transition_lock.lock();

        self.suspended.store(false, Ordering::Release);
        self.stats.resumes.fetch_add(1, Ordering::Relaxed);
    }

    /// 緊急サスペンド (halt / panic 経路)
    ///
    /// パニックコンテキストは割り込み無効や障害経路上で走るため、
    /// transition_lock は取らない (デッドロック回避の意図的な無ロック
    /// 経路。通常経路と統合しないこと)。機能フラグも無視して無条件に
    /// フラッシュする。通常経路と並走しても結果は `suspended = true`
    /// にしかならない。
    pub fn force_suspend(&self) {
        self.suspended.store(true, Ordering::Release);
        flush::force_flush(&*self.ops);
        self.stats.emergency_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// 統計情報を取得
    pub fn stats(&self) -> &SleepSyncStats {
        &self.stats
    }

    /// 書き戻しバックエンドを取得
    pub fn ops(&self) -> &dyn WritebackOps {
        &*self.ops
    }

    pub(crate) fn note_rejected_input(&self) {
        self.stats.rejected_inputs.fetch_add(1, Ordering::Relaxed);
    }
}
