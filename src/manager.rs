//! UiManager：面向调用方的导航门面
//!
//! 薄编排层：Push = 资源解析（缓存）→ 钉住 Key → 实例化入栈（页面栈），
//! 失败时解除钉住；Pop / Clear 对称地解除钉住。错误从两层原样向上传播，门面自身不引入
//! 新的失败模式，也不做自动重试。每次变更后广播一条 [`NavEvent`]。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::assets::{AssetCache, AssetResolver};
use crate::config::UiSection;
use crate::error::NavError;
use crate::events::{NavEvent, NavEventKind};
use crate::page::{PageFactory, PageId};
use crate::stack::{PageSnapshot, PageStack};

/// 导航门面：持有资源缓存与页面栈，二者只经由此处的操作被变更
pub struct UiManager {
    cache: AssetCache,
    stack: PageStack,
    events: broadcast::Sender<NavEvent>,
}

impl UiManager {
    pub fn new(resolver: Arc<dyn AssetResolver>, factory: Arc<dyn PageFactory>) -> Self {
        Self::with_config(resolver, factory, &UiSection::default())
    }

    pub fn with_config(
        resolver: Arc<dyn AssetResolver>,
        factory: Arc<dyn PageFactory>,
        ui: &UiSection,
    ) -> Self {
        let mut cache = AssetCache::new(resolver);
        if ui.load_timeout_secs > 0 {
            cache = cache.with_load_timeout(Duration::from_secs(ui.load_timeout_secs));
        }
        let (events, _) = broadcast::channel(ui.event_capacity.max(1));
        Self {
            cache,
            stack: PageStack::new(factory),
            events,
        }
    }

    /// Push 新页面：确保资源就绪 → 实例化入栈 → 钉住 Key
    ///
    /// 实例化失败时原栈顶停留在 Paused（见 [`PageStack::push`]），
    /// 调用方可用 [`UiManager::resume_top`] 回滚。
    pub async fn push_page(&self, key: &str) -> Result<PageId, NavError> {
        let template = self.cache.ensure_loaded(key).await?;
        // 钉住须覆盖整个入栈事务：入栈期间（含等待 on_pause / on_enter）
        // 到来的 refresh 不得驱逐该 Key
        self.cache.pin(key).await;
        let id = match self.stack.push(template, key).await {
            Ok(id) => id,
            Err(e) => {
                self.cache.unpin(key).await;
                return Err(e);
            }
        };
        self.emit(NavEventKind::Pushed, Some(key)).await;
        Ok(id)
    }

    /// Pop 栈顶页面并解除其资源钉住
    pub async fn pop_page(&self) -> Result<(), NavError> {
        let snapshot = self.stack.pop().await?;
        self.cache.unpin(&snapshot.resource_key).await;
        self.emit(NavEventKind::Popped, Some(&snapshot.resource_key))
            .await;
        Ok(())
    }

    /// 清空页面栈并解除全部钉住
    pub async fn clear_all_pages(&self) {
        let drained = self.stack.clear().await;
        for snapshot in &drained {
            self.cache.unpin(&snapshot.resource_key).await;
        }
        if !drained.is_empty() {
            self.emit(NavEventKind::Cleared, None).await;
        }
    }

    /// 刷新预加载目标集（后台加载，不阻塞）
    pub async fn refresh_preload(&self, target_keys: &[String]) {
        self.cache.refresh(target_keys).await;
        self.emit(NavEventKind::PreloadRefreshed, None).await;
    }

    /// Push 失败后的显式回滚：恢复停留在 Paused 的栈顶
    pub async fn resume_top(&self) -> bool {
        self.stack.resume_top().await
    }

    /// 栈顶页面快照
    pub async fn top_page(&self) -> Option<PageSnapshot> {
        self.stack.peek().await
    }

    pub async fn page_count(&self) -> usize {
        self.stack.count().await
    }

    pub async fn is_empty(&self) -> bool {
        self.stack.is_empty().await
    }

    /// 订阅导航事件
    pub fn subscribe(&self) -> broadcast::Receiver<NavEvent> {
        self.events.subscribe()
    }

    /// 资源缓存（状态查询用；变更请走门面操作）
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// 优雅销毁：先经由生命周期清空页面栈，再硬释放全部资源句柄
    pub async fn dispose(&self) {
        self.clear_all_pages().await;
        self.cache.release_all().await;
        tracing::info!("ui manager disposed");
    }

    async fn emit(&self, kind: NavEventKind, key: Option<&str>) {
        let depth = self.stack.count().await;
        // 无订阅方时发送失败是正常情况
        let _ = self.events.send(NavEvent::new(kind, key, depth));
    }
}
