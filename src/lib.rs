//! pagestack - UI 页面栈导航控制器
//!
//! 模块划分：
//! - **assets**: 资源缓存（Key → 引用跟踪句柄，合并进行中的加载）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **demo**: 演示用页面 / 解析器 / 工厂（无真实渲染）
//! - **error**: 错误类型（LoadFailed / InstantiationFailed / EmptyStack）
//! - **events**: 导航事件广播
//! - **manager**: UiManager 门面（解析 → 实例化 → 入栈，钉住资源）
//! - **observability**: tracing 初始化
//! - **page**: 页面四阶段生命周期契约与实例化协作方
//! - **shutdown**: 优雅关闭
//! - **stack**: 页面栈状态机（事务化 Push / Pop / Clear）

pub mod assets;
pub mod config;
pub mod demo;
pub mod error;
pub mod events;
pub mod manager;
pub mod observability;
pub mod page;
pub mod shutdown;
pub mod stack;

pub use assets::{AssetCache, AssetResolver, AssetState};
pub use error::NavError;
pub use events::{NavEvent, NavEventKind};
pub use manager::UiManager;
pub use page::{Page, PageFactory, PageId, PagePhase, PageTemplate};
pub use stack::{PageSnapshot, PageStack};
