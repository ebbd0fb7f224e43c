//! 页面契约：四阶段异步生命周期与实例化协作方
//!
//! 所有页面实现 [`Page`]：`on_enter`（成为栈顶）、`on_pause`（被新页面覆盖）、
//! `on_resume`（重新成为栈顶）、`on_exit`（即将销毁）。每个阶段在其可见效果
//! （如淡入淡出动画）完全结束后才返回；阶段本身不携带错误通道，
//! 页面内部自行兜底。

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

/// 页面实例 ID
pub type PageId = String;

/// 生成新的页面实例 ID
pub fn new_page_id() -> PageId {
    format!("page_{}", uuid::Uuid::new_v4())
}

/// 页面生命周期阶段
///
/// 栈顶条目处于 `Active` 或过渡态（`Entering` / `Exiting`），
/// 非栈顶条目恒为 `Paused`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePhase {
    /// 已入栈，`on_enter` 尚未结束
    Entering,
    /// 栈顶，可交互
    Active,
    /// 被上层页面覆盖
    Paused,
    /// 已出栈，`on_exit` 进行中
    Exiting,
}

/// 页面生命周期契约
#[async_trait]
pub trait Page: Send + Sync {
    /// 页面首次显示时调用（成为栈顶）：初始化界面、播放入场动画
    async fn on_enter(&self);

    /// 页面被新页面覆盖时调用（从栈顶变为非栈顶）：禁用交互、隐藏外观
    async fn on_pause(&self);

    /// 页面重新成为栈顶时调用（上层页面被 Pop）：刷新过期数据、恢复交互
    async fn on_resume(&self);

    /// 页面即将销毁时调用：播放出场动画、清理资源
    async fn on_exit(&self);

    /// 页面名称（用于日志）
    fn name(&self) -> &str {
        "page"
    }
}

/// 可加载的页面模板（解析协作方的产物，对核心不透明）
///
/// `as_any` 供具体工厂向下转型；转型失败即「缺少必需组件」，
/// 工厂以实例化失败上报。
pub trait PageTemplate: Send + Sync {
    /// 模板对应的资源 Key
    fn key(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// 实例化协作方：由模板产出具体页面实例
pub trait PageFactory: Send + Sync {
    /// 实例化页面；模板不满足页面能力契约时返回失败原因
    fn instantiate(&self, template: &dyn PageTemplate) -> Result<Arc<dyn Page>, String>;
}
