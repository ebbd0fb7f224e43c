//! pagestack - UI 页面栈导航控制器
//!
//! 入口：初始化日志与配置，用演示解析器 / 工厂走一遍
//! 预加载 → Push / Pop → 优雅销毁的完整流程。

use std::sync::Arc;

use anyhow::Result;

use pagestack::config::load_config;
use pagestack::demo::{DemoFactory, DemoResolver};
use pagestack::shutdown::ShutdownManager;
use pagestack::{observability, UiManager};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let manager = Arc::new(UiManager::with_config(
        Arc::new(DemoResolver::new(30)),
        Arc::new(DemoFactory::new(20)),
        &cfg.ui,
    ));

    // 旁路订阅导航事件
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(?event.kind, key = ?event.key, depth = event.depth, "nav event");
        }
    });

    // 按配置刷新预加载目标集（不阻塞）
    if !cfg.ui.preload_keys.is_empty() {
        manager.refresh_preload(&cfg.ui.preload_keys).await;
    }

    // 演示：主页面 → 设置页 → 返回
    manager.push_page("ui/main").await?;
    manager.push_page("ui/settings").await?;
    tracing::info!(depth = manager.page_count().await, "navigation demo at settings");

    manager.pop_page().await?;
    if let Some(top) = manager.top_page().await {
        tracing::info!(key = %top.resource_key, phase = ?top.phase, "back at top page");
    }

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    tracing::info!("Press Ctrl+C to exit");
    shutdown.wait_for_shutdown().await;

    manager.dispose().await;
    Ok(())
}
