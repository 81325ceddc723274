//! 統一エラーハンドリングモジュール
//!
//! モジュール全体で使用される統一エラー型を定義し、
//! 各サブモジュールのエラーから変換を提供します。

use core::fmt;

use crate::ctl::CtlError;

/// モジュール全体の統一エラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepSyncError {
    /// コントロールサーフェス関連エラー
    Ctl(CtlError),
    /// 既に初期化済み
    AlreadyInitialized,
    /// 未初期化
    NotInitialized,
}

/// モジュール共通のResult型
pub type SleepSyncResult<T> = Result<T, SleepSyncError>;

impl From<CtlError> for SleepSyncError {
    fn from(e: CtlError) -> Self {
        SleepSyncError::Ctl(e)
    }
}

// ===== Display implementations =====

impl fmt::Display for SleepSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepSyncError::Ctl(e) => write!(f, "control surface error: {}", e),
            SleepSyncError::AlreadyInitialized => write!(f, "already initialized"),
            SleepSyncError::NotInitialized => write!(f, "not initialized"),
        }
    }
}
