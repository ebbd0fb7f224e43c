//! 页面栈状态机：事务化的 Push / Pop / Clear
//!
//! 两条不变式：
//! - 任一时刻至多一个变更操作在途。事务锁覆盖整个操作（含其中 await 的
//!   生命周期调用），后到的请求等前一个完全 settle 后才开始，并发调用方
//!   之下依然成立，而不是依赖「只有一个调用点」的约定。
//! - 生命周期阶段与栈位一致：栈顶为 `Active` 或过渡态，非栈顶恒为 `Paused`。
//!   由此得到嵌套顺序保证：A 先于 B 入栈，则 A.on_pause 结束后 B.on_enter
//!   才开始；B.on_exit 结束后 A.on_resume 才开始。
//!
//! 只读查询（peek / count / is_empty）不取事务锁，可与在途变更并发，
//! 读到的是完整条目（变更的每个可见中间态都自洽，不存在写了一半的条目）。

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::NavError;
use crate::page::{new_page_id, Page, PageFactory, PageId, PagePhase, PageTemplate};

struct PageEntry {
    id: PageId,
    page: Arc<dyn Page>,
    /// 实例化该页面所用的资源 Key，条目存续期内不变
    resource_key: String,
    phase: PagePhase,
}

/// 对外暴露的条目快照（不出借页面实例本身）
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub id: PageId,
    pub resource_key: String,
    pub phase: PagePhase,
}

impl PageEntry {
    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            id: self.id.clone(),
            resource_key: self.resource_key.clone(),
            phase: self.phase,
        }
    }
}

/// 页面栈
pub struct PageStack {
    factory: Arc<dyn PageFactory>,
    entries: RwLock<Vec<PageEntry>>,
    /// 事务锁：Push / Pop / Clear / ResumeTop 串行化
    txn: Mutex<()>,
}

impl PageStack {
    pub fn new(factory: Arc<dyn PageFactory>) -> Self {
        Self {
            factory,
            entries: RwLock::new(Vec::new()),
            txn: Mutex::new(()),
        }
    }

    /// Push 新页面到栈顶
    ///
    /// 顺序：暂停当前栈顶（等待结束）→ 实例化 → 入栈 → `on_enter`（等待结束）。
    /// 实例化失败时栈保持不变、产物丢弃；刚暂停的原栈顶**不会**被自动恢复，
    /// 由调用方显式调用 [`PageStack::resume_top`] 回滚。
    pub async fn push(
        &self,
        template: Arc<dyn PageTemplate>,
        resource_key: &str,
    ) -> Result<PageId, NavError> {
        let _txn = self.txn.lock().await;

        // 暂停当前栈顶
        let top = {
            let entries = self.entries.read().await;
            entries.last().map(|entry| Arc::clone(&entry.page))
        };
        if let Some(page) = top {
            page.on_pause().await;
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.last_mut() {
                entry.phase = PagePhase::Paused;
            }
        }

        // 实例化并入栈
        let page = match self.factory.instantiate(template.as_ref()) {
            Ok(page) => page,
            Err(reason) => {
                tracing::error!(key = %resource_key, reason = %reason, "page instantiation failed");
                return Err(NavError::InstantiationFailed {
                    key: resource_key.to_string(),
                    reason,
                });
            }
        };

        let id = new_page_id();
        {
            let mut entries = self.entries.write().await;
            entries.push(PageEntry {
                id: id.clone(),
                page: Arc::clone(&page),
                resource_key: resource_key.to_string(),
                phase: PagePhase::Entering,
            });
        }

        page.on_enter().await;

        let depth = {
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.last_mut() {
                entry.phase = PagePhase::Active;
            }
            entries.len()
        };

        tracing::info!(page = %page.name(), depth, "page pushed");
        Ok(id)
    }

    /// Pop 栈顶页面
    ///
    /// 顺序：移除栈顶 → `on_exit`（等待结束）→ 销毁实例 →
    /// 若栈非空，`on_resume` 新栈顶（等待结束）。两个调用都结束后 Pop 才算完成。
    /// 返回被移除条目的快照。
    pub async fn pop(&self) -> Result<PageSnapshot, NavError> {
        let _txn = self.txn.lock().await;

        let removed = {
            let mut entries = self.entries.write().await;
            match entries.pop() {
                Some(mut entry) => {
                    entry.phase = PagePhase::Exiting;
                    entry
                }
                None => {
                    tracing::warn!("pop on empty page stack");
                    return Err(NavError::EmptyStack);
                }
            }
        };

        removed.page.on_exit().await;
        let snapshot = removed.snapshot();
        // 此处 drop 即销毁实例（栈持有唯一的长期引用）
        drop(removed);

        let new_top = {
            let entries = self.entries.read().await;
            entries.last().map(|entry| Arc::clone(&entry.page))
        };
        if let Some(page) = new_top {
            page.on_resume().await;
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.last_mut() {
                entry.phase = PagePhase::Active;
            }
        }

        let depth = self.entries.read().await.len();
        tracing::info!(depth, "page popped");
        Ok(snapshot)
    }

    /// 清空栈：自顶向下逐个 `on_exit` + 销毁，期间不调用任何 `on_resume`
    /// （最终栈为空，没有页面需要恢复）。空栈上为 no-op。
    /// 返回被清空条目的快照（自顶向下顺序）。
    pub async fn clear(&self) -> Vec<PageSnapshot> {
        let _txn = self.txn.lock().await;

        let depth = self.entries.read().await.len();
        if depth > 0 {
            tracing::info!(depth, "clearing page stack");
        }

        let mut drained = Vec::new();
        loop {
            let top = {
                let mut entries = self.entries.write().await;
                match entries.pop() {
                    Some(mut entry) => {
                        entry.phase = PagePhase::Exiting;
                        entry
                    }
                    None => break,
                }
            };
            top.page.on_exit().await;
            drained.push(top.snapshot());
        }
        drained
    }

    /// 显式恢复栈顶（Push 实例化失败后的回滚手段）
    ///
    /// 仅当栈顶处于 `Paused` 时调用其 `on_resume` 并标记 `Active`；
    /// 返回是否实际发生了恢复。
    pub async fn resume_top(&self) -> bool {
        let _txn = self.txn.lock().await;

        let top = {
            let entries = self.entries.read().await;
            entries
                .last()
                .filter(|entry| entry.phase == PagePhase::Paused)
                .map(|entry| Arc::clone(&entry.page))
        };
        match top {
            Some(page) => {
                page.on_resume().await;
                let mut entries = self.entries.write().await;
                if let Some(entry) = entries.last_mut() {
                    entry.phase = PagePhase::Active;
                }
                true
            }
            None => false,
        }
    }

    /// 栈顶条目快照；O(1)，无副作用，可在在途事务期间调用
    pub async fn peek(&self) -> Option<PageSnapshot> {
        let entries = self.entries.read().await;
        entries.last().map(PageEntry::snapshot)
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
