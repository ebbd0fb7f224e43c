//! 资源缓存：Key → 引用跟踪的模板句柄
//!
//! 语义要点：
//! - 同一 Key 的一个加载周期内状态只经历 Unloaded → Loading → {Ready | Failed} 一次；
//!   Loading 期间的并发请求共享同一次进行中的加载（watch 通道），绝不重复发起。
//! - `refresh(target_keys)`：释放不在目标集且未被活跃页面钉住（pin）的条目，
//!   对目标集中尚未缓存的 Key 启动后台加载（不阻塞调用方）。
//!   该操作与并发的 `ensure_loaded` 不要求原子：请求方要么赶在移除前看到旧条目，
//!   要么在移除后触发一次全新加载，两者都安全。
//! - Failed 条目保持 Failed，核心不自动重试；调用方可用 refresh 驱逐后重试。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use crate::error::NavError;
use crate::page::PageTemplate;

/// 解析协作方：Key → 可加载的页面模板（异步，可失败）
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<Arc<dyn PageTemplate>, String>;
}

/// 缓存条目的可观测状态（Unloaded 表示 Key 不在缓存中）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// 单次加载的结果，经 watch 通道在所有等待方之间共享
#[derive(Clone)]
enum LoadOutcome {
    Pending,
    Ready(Arc<dyn PageTemplate>),
    Failed(String),
}

struct AssetEntry {
    outcome: watch::Receiver<LoadOutcome>,
    /// 钉住计数：正在被活跃栈条目使用的 Key 不参与 refresh 驱逐
    pins: u32,
}

/// 资源缓存
pub struct AssetCache {
    resolver: Arc<dyn AssetResolver>,
    entries: RwLock<HashMap<String, AssetEntry>>,
    /// 单次加载超时；None 表示不限时
    load_timeout: Option<Duration>,
}

impl AssetCache {
    pub fn new(resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            entries: RwLock::new(HashMap::new()),
            load_timeout: None,
        }
    }

    /// 设置单次加载超时（超时按加载失败处理）
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// 确保 Key 已加载并返回模板
    ///
    /// Ready 直接返回；Loading 等待已有的那次加载；未缓存则发起加载。
    /// 失败向调用方上报 `LoadFailed`，条目保持 Failed。
    pub async fn ensure_loaded(&self, key: &str) -> Result<Arc<dyn PageTemplate>, NavError> {
        let mut rx = {
            let mut entries = self.entries.write().await;
            match entries.get(key) {
                Some(entry) => entry.outcome.clone(),
                None => self.begin_load(&mut entries, key),
            }
        };

        loop {
            let current = rx.borrow().clone();
            match current {
                LoadOutcome::Ready(template) => return Ok(template),
                LoadOutcome::Failed(reason) => {
                    return Err(NavError::LoadFailed {
                        key: key.to_string(),
                        reason,
                    })
                }
                LoadOutcome::Pending => {
                    if rx.changed().await.is_err() {
                        // 加载任务在 settle 前消失（进程级异常），按失败上报
                        return Err(NavError::LoadFailed {
                            key: key.to_string(),
                            reason: "load task dropped before completion".to_string(),
                        });
                    }
                }
            }
        }
    }

    /// 刷新预加载目标集
    ///
    /// 释放不在 `target_keys` 且 pins == 0 的条目；对目标集中未缓存的 Key
    /// 启动后台加载。调用方不等待加载完成。
    pub async fn refresh(&self, target_keys: &[String]) {
        let mut entries = self.entries.write().await;

        let to_remove: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| {
                entry.pins == 0 && !target_keys.iter().any(|k| k == *key)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &to_remove {
            entries.remove(key);
            tracing::info!(key = %key, "released asset no longer in target set");
        }

        for key in target_keys {
            if !entries.contains_key(key) {
                self.begin_load(&mut entries, key);
                tracing::info!(key = %key, "preloading asset");
            }
        }
    }

    /// 无条件释放全部句柄（仅用于会话销毁，不触碰任何页面生命周期）
    pub async fn release_all(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        tracing::info!(count, "released all asset handles");
    }

    /// 钉住 Key（对应一个活跃栈条目开始使用该资源）
    pub async fn pin(&self, key: &str) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => entry.pins += 1,
            None => tracing::warn!(key = %key, "pin on missing cache entry"),
        }
    }

    /// 解除钉住
    pub async fn unpin(&self, key: &str) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => entry.pins = entry.pins.saturating_sub(1),
            None => tracing::warn!(key = %key, "unpin on missing cache entry"),
        }
    }

    /// 当前 Key 的状态
    pub async fn state(&self, key: &str) -> AssetState {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => AssetState::Unloaded,
            Some(entry) => match &*entry.outcome.borrow() {
                LoadOutcome::Pending => AssetState::Loading,
                LoadOutcome::Ready(_) => AssetState::Ready,
                LoadOutcome::Failed(_) => AssetState::Failed,
            },
        }
    }

    /// 已缓存的 Key 列表
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 插入 Loading 条目并在后台任务中执行实际加载
    ///
    /// 调用方必须已持有 entries 的写锁，保证「查无此 Key 则插入」不被穿插。
    fn begin_load(
        &self,
        entries: &mut HashMap<String, AssetEntry>,
        key: &str,
    ) -> watch::Receiver<LoadOutcome> {
        let (tx, rx) = watch::channel(LoadOutcome::Pending);
        entries.insert(
            key.to_string(),
            AssetEntry {
                outcome: rx.clone(),
                pins: 0,
            },
        );

        let resolver = Arc::clone(&self.resolver);
        let load_timeout = self.load_timeout;
        let key = key.to_string();
        tokio::spawn(async move {
            let result = match load_timeout {
                Some(limit) => match tokio::time::timeout(limit, resolver.resolve(&key)).await {
                    Ok(result) => result,
                    Err(_) => Err(format!("load timed out after {}s", limit.as_secs())),
                },
                None => resolver.resolve(&key).await,
            };

            let outcome = match result {
                Ok(template) => {
                    tracing::debug!(key = %key, "asset ready");
                    LoadOutcome::Ready(template)
                }
                Err(reason) => {
                    tracing::warn!(key = %key, reason = %reason, "asset load failed");
                    LoadOutcome::Failed(reason)
                }
            };
            let _ = tx.send(outcome);
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct TestTemplate {
        key: String,
    }

    impl PageTemplate for TestTemplate {
        fn key(&self) -> &str {
            &self.key
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// 记录加载次数的解析器；"bad/" 前缀的 Key 加载失败
    struct CountingResolver {
        loads: AtomicUsize,
        latency: Duration,
    }

    impl CountingResolver {
        fn new(latency_ms: u64) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                latency: Duration::from_millis(latency_ms),
            }
        }
    }

    #[async_trait]
    impl AssetResolver for CountingResolver {
        async fn resolve(&self, key: &str) -> Result<Arc<dyn PageTemplate>, String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if key.starts_with("bad/") {
                Err(format!("no such asset: {key}"))
            } else {
                Ok(Arc::new(TestTemplate {
                    key: key.to_string(),
                }))
            }
        }
    }

    #[tokio::test]
    async fn test_ensure_loaded_returns_template() {
        let resolver = Arc::new(CountingResolver::new(5));
        let cache = AssetCache::new(resolver.clone());

        let template = cache.ensure_loaded("ui/main").await.unwrap();
        assert_eq!(template.key(), "ui/main");
        assert_eq!(cache.state("ui/main").await, AssetState::Ready);

        // 第二次直接命中，不再加载
        cache.ensure_loaded("ui/main").await.unwrap();
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_loaded_shares_one_load() {
        let resolver = Arc::new(CountingResolver::new(30));
        let cache = Arc::new(AssetCache::new(resolver.clone()));

        let (a, b) = tokio::join!(
            cache.ensure_loaded("ui/settings"),
            cache.ensure_loaded("ui/settings"),
        );
        assert_eq!(a.unwrap().key(), "ui/settings");
        assert_eq!(b.unwrap().key(), "ui/settings");
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_reported_and_sticky() {
        let resolver = Arc::new(CountingResolver::new(5));
        let cache = AssetCache::new(resolver.clone());

        let err = cache.ensure_loaded("bad/missing").await.err().unwrap();
        assert!(matches!(err, NavError::LoadFailed { .. }));
        assert_eq!(cache.state("bad/missing").await, AssetState::Failed);

        // 不自动重试：第二次请求仍是同一个失败结果
        let err = cache.ensure_loaded("bad/missing").await.err().unwrap();
        assert!(matches!(err, NavError::LoadFailed { .. }));
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_evicts_and_preloads() {
        let resolver = Arc::new(CountingResolver::new(5));
        let cache = AssetCache::new(resolver.clone());

        cache
            .refresh(&["ui/main".to_string(), "ui/settings".to_string()])
            .await;
        // 后台加载完成
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.state("ui/main").await, AssetState::Ready);
        assert_eq!(cache.state("ui/settings").await, AssetState::Ready);

        cache.refresh(&["ui/main".to_string()]).await;
        assert_eq!(cache.state("ui/settings").await, AssetState::Unloaded);
        assert_eq!(cache.state("ui/main").await, AssetState::Ready);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_pinned_keys() {
        let resolver = Arc::new(CountingResolver::new(5));
        let cache = AssetCache::new(resolver);

        cache.ensure_loaded("ui/main").await.unwrap();
        cache.pin("ui/main").await;

        cache.refresh(&[]).await;
        assert_eq!(cache.state("ui/main").await, AssetState::Ready);

        cache.unpin("ui/main").await;
        cache.refresh(&[]).await;
        assert_eq!(cache.state("ui/main").await, AssetState::Unloaded);
    }

    #[tokio::test]
    async fn test_ensure_loaded_joins_refresh_preload() {
        let resolver = Arc::new(CountingResolver::new(30));
        let cache = AssetCache::new(resolver.clone());

        // refresh 发起后台加载，紧随其后的 ensure_loaded 共享同一次加载
        cache.refresh(&["ui/main".to_string()]).await;
        let template = cache.ensure_loaded("ui/main").await.unwrap();
        assert_eq!(template.key(), "ui/main");
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_all() {
        let resolver = Arc::new(CountingResolver::new(5));
        let cache = AssetCache::new(resolver);

        cache.ensure_loaded("ui/main").await.unwrap();
        cache.pin("ui/main").await;
        cache.ensure_loaded("ui/settings").await.unwrap();

        // 钉住与否都释放（仅用于销毁）
        cache.release_all().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_timeout_counts_as_failure() {
        let resolver = Arc::new(CountingResolver::new(200));
        let cache = AssetCache::new(resolver).with_load_timeout(Duration::from_millis(20));

        let err = cache.ensure_loaded("ui/slow").await.err().unwrap();
        assert!(matches!(err, NavError::LoadFailed { .. }));
        assert_eq!(cache.state("ui/slow").await, AssetState::Failed);
    }
}
