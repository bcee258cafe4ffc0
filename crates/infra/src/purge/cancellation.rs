//! # キャンセルシグナル
//!
//! 外部（Ctrl-C ハンドラなど）から削除の中断を要求するためのフラグ。
//! オーケストレーターは記述子の操作を発行する直前に確認する。
//! 発行済みの操作は中断せず、完了を待って結果を記録する。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// 複製可能なキャンセルシグナル
///
/// 複製は同じフラグを共有する。一度キャンセルすると元に戻らない。
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャンセルを要求する
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
