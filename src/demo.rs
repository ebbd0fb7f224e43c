//! 演示用页面 / 解析器 / 工厂（无需真实渲染引擎）
//!
//! 供 demo 二进制与本地联调使用：解析器模拟加载延迟，页面用定时 sleep
//! 模拟淡入淡出动画。真实工程里解析器对接资源系统（如 Addressable），
//! 工厂在场景树下实例化预制体。

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::assets::AssetResolver;
use crate::page::{Page, PageFactory, PageTemplate};

/// 演示模板：只携带资源 Key
pub struct DemoTemplate {
    key: String,
}

impl PageTemplate for DemoTemplate {
    fn key(&self) -> &str {
        &self.key
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 演示解析器："ui/" 前缀的 Key 延迟后成功，其余按未知资源失败
pub struct DemoResolver {
    latency: Duration,
}

impl DemoResolver {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
        }
    }
}

#[async_trait]
impl AssetResolver for DemoResolver {
    async fn resolve(&self, key: &str) -> Result<Arc<dyn PageTemplate>, String> {
        tokio::time::sleep(self.latency).await;
        if key.starts_with("ui/") {
            Ok(Arc::new(DemoTemplate {
                key: key.to_string(),
            }))
        } else {
            Err(format!("unknown asset key: {key}"))
        }
    }
}

/// 带淡入淡出的演示页面：每个阶段挂起 fade 时长后返回
pub struct FadePage {
    name: String,
    fade: Duration,
}

impl FadePage {
    async fn phase(&self, phase: &str) {
        tokio::time::sleep(self.fade).await;
        tracing::debug!(page = %self.name, phase, "lifecycle phase settled");
    }
}

#[async_trait]
impl Page for FadePage {
    async fn on_enter(&self) {
        self.phase("enter").await;
    }

    async fn on_pause(&self) {
        self.phase("pause").await;
    }

    async fn on_resume(&self) {
        self.phase("resume").await;
    }

    async fn on_exit(&self) {
        self.phase("exit").await;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 演示工厂：从 Key 的最后一段取页面名
///
/// 向下转型失败即「模板缺少页面能力」，对应实例化失败分支
/// （与场景树上 GetComponent 拿不到组件同构）。
pub struct DemoFactory {
    fade: Duration,
}

impl DemoFactory {
    pub fn new(fade_ms: u64) -> Self {
        Self {
            fade: Duration::from_millis(fade_ms),
        }
    }
}

impl PageFactory for DemoFactory {
    fn instantiate(&self, template: &dyn PageTemplate) -> Result<Arc<dyn Page>, String> {
        let template = template
            .as_any()
            .downcast_ref::<DemoTemplate>()
            .ok_or_else(|| "template has no demo page component".to_string())?;
        let name = template
            .key()
            .rsplit('/')
            .next()
            .unwrap_or("page")
            .to_string();
        Ok(Arc::new(FadePage {
            name,
            fade: self.fade,
        }))
    }
}
