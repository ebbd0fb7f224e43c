//! 导航事件
//!
//! 门面层在每次栈变更 / 预加载刷新后广播一条事件，供流程控制器、
//! 埋点等旁路订阅；订阅方滞后导致的 Lagged 由订阅方自行处理。

/// 导航事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEventKind {
    /// 新页面入栈
    Pushed,
    /// 栈顶页面出栈
    Popped,
    /// 栈被清空
    Cleared,
    /// 预加载目标集已刷新
    PreloadRefreshed,
}

/// 一次导航变更的通知
#[derive(Debug, Clone)]
pub struct NavEvent {
    pub kind: NavEventKind,
    /// 相关资源 Key（Cleared / PreloadRefreshed 为 None）
    pub key: Option<String>,
    /// 变更后的栈深度
    pub depth: usize,
    /// 毫秒时间戳
    pub at_ms: i64,
}

impl NavEvent {
    pub fn new(kind: NavEventKind, key: Option<&str>, depth: usize) -> Self {
        Self {
            kind,
            key: key.map(str::to_string),
            depth,
            at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}
