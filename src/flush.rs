//! 強制フラッシュプリミティブ
//!
//! 全マウント済みファイルシステムの書き戻しを二段階で強制する。
//! 第一段階は完了を待たずに書き戻しを開始し、第二段階は保留中の
//! 書き戻しが全て終わるまで待つ。必ず第一段階→第二段階の順で呼び、
//! 第二段階単独では呼ばない。

/// 書き戻しバックエンド操作トレイト
///
/// ストレージ層が提供する「全ファイルシステムをフラッシュする」
/// プリミティブの抽象化。書き戻し中のエラーはストレージ層側の経路で
/// 報告され、呼び出し側には伝播しない。
pub trait WritebackOps: Send + Sync {
    /// バックエンド名
    fn name(&self) -> &'static str;

    /// 第一段階: 書き戻しを開始する (完了を待たない)
    fn start_writeback(&self);

    /// 第二段階: 保留中の書き戻しが全て完了するまで待つ
    fn wait_writeback(&self);
}

/// 強制フラッシュ (二段階)
pub fn force_flush(ops: &dyn WritebackOps) {
    ops.start_writeback();
    ops.wait_writeback();
}

/// 何もしないバックエンド (ストレージ層未接続の環境用)
pub struct NullWriteback;

impl WritebackOps for NullWriteback {
    fn name(&self) -> &'static str {
        "null"
    }

    fn start_writeback(&self) {}

    fn wait_writeback(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use spin::Mutex;

    struct RecordingOps {
        calls: Mutex<Vec<&'static str>>,
    }

    impl WritebackOps for RecordingOps {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn start_writeback(&self) {
            self.calls.lock().push("start");
        }

        fn wait_writeback(&self) {
            self.calls.lock().push("wait");
        }
    }

    #[test]
    fn test_force_flush_runs_both_phases_in_order() {
        let ops = RecordingOps {
            calls: Mutex::new(Vec::new()),
        };

        force_flush(&ops);
        assert_eq!(&*ops.calls.lock(), &["start", "wait"]);
    }

    #[test]
    fn test_null_writeback() {
        assert_eq!(NullWriteback.name(), "null");
        force_flush(&NullWriteback);
    }
}
