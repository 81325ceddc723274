//! コントロールサーフェス
//!
//! 機能のオン/オフと状態観測のための属性ノード群。ノードは名前付き
//! ディレクトリの下にぶら下がる小さな仮想ファイルで、読み書きは
//! ボックス化したハンドラ経由で行う。
//!
//! `sleepsync/` グループのノード:
//!
//! | ノード | モード | 形式 |
//! |---|---|---|
//! | `active` | 0666 | `"0\n"` / `"1\n"` |
//! | `version` | 0444 | `"Version: 3.0\n"` |
//! | `suspended` | 0444 | `"Suspended: 0\n"` / `"Suspended: 1\n"` |

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use log::{info, warn};
use spin::RwLock;

use crate::state::SleepSync;
use crate::{VERSION_MAJOR, VERSION_MINOR};

/// 属性グループのディレクトリ名
pub const GROUP_NAME: &str = "sleepsync";

/// ノードアクセスモード (Newtype)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMode(pub u16);

impl NodeMode {
    /// 読み取り専用 (0444)
    pub const RO: Self = Self(0o444);
    /// 読み書き可能 (0666)
    pub const RW: Self = Self(0o666);

    /// 読み取り可能かどうか
    pub fn readable(&self) -> bool {
        self.0 & 0o444 != 0
    }

    /// 書き込み可能かどうか
    pub fn writable(&self) -> bool {
        self.0 & 0o222 != 0
    }
}

/// コントロールサーフェスエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlError {
    /// ノードが見つからない
    NotFound,
    /// 読み取り不可
    NotReadable,
    /// 書き込み不可
    NotWritable,
    /// 既に存在する
    AlreadyExists,
}

/// コントロールサーフェス操作のResult型
pub type CtlResult<T> = Result<T, CtlError>;

impl fmt::Display for CtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtlError::NotFound => write!(f, "node not found"),
            CtlError::NotReadable => write!(f, "node not readable"),
            CtlError::NotWritable => write!(f, "node not writable"),
            CtlError::AlreadyExists => write!(f, "node already exists"),
        }
    }
}

/// 読み取りハンドラ
type ReadFn = Box<dyn Fn() -> String + Send + Sync>;
/// 書き込みハンドラ (消費したバイト数を返す)
type WriteFn = Box<dyn Fn(&str) -> CtlResult<usize> + Send + Sync>;

/// コントロールノード
pub struct CtlNode {
    /// ノード名
    name: String,
    /// アクセスモード
    mode: NodeMode,
    /// 読み取りハンドラ
    read_fn: ReadFn,
    /// 書き込みハンドラ
    write_fn: Option<WriteFn>,
}

impl CtlNode {
    /// 読み取り専用ノードを作成
    pub fn read_only<R>(name: &str, read_fn: R) -> Self
    where
        R: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            name: String::from(name),
            mode: NodeMode::RO,
            read_fn: Box::new(read_fn),
            write_fn: None,
        }
    }

    /// 読み書き可能ノードを作成
    pub fn read_write<R, W>(name: &str, read_fn: R, write_fn: W) -> Self
    where
        R: Fn() -> String + Send + Sync + 'static,
        W: Fn(&str) -> CtlResult<usize> + Send + Sync + 'static,
    {
        Self {
            name: String::from(name),
            mode: NodeMode::RW,
            read_fn: Box::new(read_fn),
            write_fn: Some(Box::new(write_fn)),
        }
    }

    /// ノード名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// アクセスモードを取得
    pub fn mode(&self) -> NodeMode {
        self.mode
    }
}

/// コントロールディレクトリ
struct CtlDir {
    nodes: BTreeMap<String, CtlNode>,
}

/// コントロールサーフェスレジストリ
pub struct CtlFs {
    dirs: RwLock<BTreeMap<String, CtlDir>>,
}

impl CtlFs {
    /// 空のレジストリを作成
    pub const fn new() -> Self {
        Self {
            dirs: RwLock::new(BTreeMap::new()),
        }
    }

    /// ディレクトリを作成
    pub fn create_dir(&self, name: &str) -> CtlResult<()> {
        let mut dirs = self.dirs.write();
        if dirs.contains_key(name) {
            return Err(CtlError::AlreadyExists);
        }

        dirs.insert(
            String::from(name),
            CtlDir {
                nodes: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// ディレクトリごと削除
    pub fn remove_dir(&self, name: &str) -> bool {
        self.dirs.write().remove(name).is_some()
    }

    /// ノードを追加
    pub fn add_node(&self, dir: &str, node: CtlNode) -> CtlResult<()> {
        let mut dirs = self.dirs.write();
        let dir = dirs.get_mut(dir).ok_or(CtlError::NotFound)?;

        if dir.nodes.contains_key(node.name()) {
            return Err(CtlError::AlreadyExists);
        }
        dir.nodes.insert(String::from(node.name()), node);
        Ok(())
    }

    /// ノードが存在するかどうか
    pub fn lookup(&self, dir: &str, node: &str) -> bool {
        self.dirs
            .read()
            .get(dir)
            .is_some_and(|d| d.nodes.contains_key(node))
    }

    /// ノードを読み取り
    pub fn read(&self, dir: &str, node: &str) -> CtlResult<String> {
        let dirs = self.dirs.read();
        let node = dirs
            .get(dir)
            .ok_or(CtlError::NotFound)?
            .nodes
            .get(node)
            .ok_or(CtlError::NotFound)?;

        if !node.mode.readable() {
            return Err(CtlError::NotReadable);
        }
        Ok((node.read_fn)())
    }

    /// ノードへ書き込み、消費したバイト数を返す
    pub fn write(&self, dir: &str, node: &str, buf: &str) -> CtlResult<usize> {
        let dirs = self.dirs.read();
        let node = dirs
            .get(dir)
            .ok_or(CtlError::NotFound)?
            .nodes
            .get(node)
            .ok_or(CtlError::NotFound)?;

        if !node.mode.writable() {
            return Err(CtlError::NotWritable);
        }
        match &node.write_fn {
            Some(write_fn) => write_fn(buf),
            None => Err(CtlError::NotWritable),
        }
    }

    /// ディレクトリ内のノード一覧を取得
    pub fn readdir(&self, dir: &str) -> CtlResult<Vec<String>> {
        let dirs = self.dirs.read();
        let dir = dirs.get(dir).ok_or(CtlError::NotFound)?;
        Ok(dir.nodes.keys().cloned().collect())
    }
}

/// グローバルレジストリ
static CTLFS: CtlFs = CtlFs::new();

/// グローバルレジストリを取得
pub fn ctlfs() -> &'static CtlFs {
    &CTLFS
}

/// active ノードへの書き込みを処理する
///
/// "1" で有効化、"0" で無効化。それ以外の入力は無視してログに残す。
/// 呼び出し側から見た書き込み自体は常に成功する。
fn store_active(sync: &SleepSync, buf: &str) {
    match buf.trim().parse::<u32>() {
        Ok(1) => {
            info!("sleepsync: enabled");
            sync.set_active(true);
        }
        Ok(0) => {
            info!("sleepsync: disabled");
            sync.set_active(false);
        }
        Ok(_) => {
            warn!("sleepsync: bad value");
            sync.note_rejected_input();
        }
        Err(_) => {
            warn!("sleepsync: unknown input");
            sync.note_rejected_input();
        }
    }
}

fn populate_group(fs: &CtlFs, sync: &Arc<SleepSync>) -> CtlResult<()> {
    let read_sync = sync.clone();
    let write_sync = sync.clone();
    fs.add_node(
        GROUP_NAME,
        CtlNode::read_write(
            "active",
            move || format!("{}\n", read_sync.is_active() as u8),
            move |buf| {
                store_active(&write_sync, buf);
                Ok(buf.len())
            },
        ),
    )?;

    fs.add_node(
        GROUP_NAME,
        CtlNode::read_only("version", || {
            format!("Version: {}.{}\n", VERSION_MAJOR, VERSION_MINOR)
        }),
    )?;

    let s = sync.clone();
    fs.add_node(
        GROUP_NAME,
        CtlNode::read_only("suspended", move || {
            format!("Suspended: {}\n", s.is_suspended() as u8)
        }),
    )?;

    Ok(())
}

/// sleepsync 属性グループを登録する
///
/// 途中で失敗した場合は部分登録を巻き戻してからエラーを返す。
pub fn register_group(fs: &CtlFs, sync: Arc<SleepSync>) -> CtlResult<()> {
    fs.create_dir(GROUP_NAME)?;

    let result = populate_group(fs, &sync);
    if result.is_err() {
        fs.remove_dir(GROUP_NAME);
    }
    result
}

/// sleepsync 属性グループを削除する
pub fn unregister_group(fs: &CtlFs) -> bool {
    fs.remove_dir(GROUP_NAME)
}
