//! 导航层错误类型
//!
//! 三类错误均可由调用方恢复：重试、展示错误页或忽略由门面层决定，核心不做自动重试。

use thiserror::Error;

/// 资源解析与页面栈操作中可能出现的错误
#[derive(Error, Debug)]
pub enum NavError {
    /// 资源加载失败：缓存条目标记为 Failed，不自动重试（重试策略归调用方）
    #[error("Asset load failed [{key}]: {reason}")]
    LoadFailed { key: String, reason: String },

    /// 模板实例化失败（如缺少页面能力组件）：栈保持不变，产物被丢弃
    #[error("Page instantiation failed [{key}]: {reason}")]
    InstantiationFailed { key: String, reason: String },

    /// 空栈上调用 Pop：非致命，状态不变
    #[error("Page stack is empty")]
    EmptyStack,
}
