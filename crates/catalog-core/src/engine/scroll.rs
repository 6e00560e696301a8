// catalog-core/src/engine/scroll.rs
//! 滚动游标管理
//!
//! 每个游标持有开始查询时的 `Searcher` 快照和剩余命中，过期后惰性清理

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use tantivy::{DocAddress, Score, Searcher};
use uuid::Uuid;

use super::{EngineError, ScrollId};

/// 游标上下文
struct ScrollContext {
    searcher: Searcher,
    pending: VecDeque<(Score, DocAddress)>,
    page_size: usize,
    total: u64,
    keep_alive: Duration,
    last_accessed: Instant,
}

impl ScrollContext {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_accessed) >= self.keep_alive
    }
}

/// 从游标取出的一页
pub(crate) struct ScrollPage {
    pub searcher: Searcher,
    pub hits: Vec<(Score, DocAddress)>,
    pub total: u64,
}

/// 游标管理器
#[derive(Default)]
pub struct ScrollRegistry {
    contexts: RwLock<HashMap<Uuid, ScrollContext>>,
}

impl ScrollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记剩余命中，返回游标 ID
    pub(crate) fn open(
        &self,
        searcher: Searcher,
        pending: Vec<(Score, DocAddress)>,
        page_size: usize,
        total: u64,
        keep_alive: Duration,
    ) -> ScrollId {
        self.cleanup_expired();
        let scroll_id = Uuid::new_v4();
        let context = ScrollContext {
            searcher,
            pending: pending.into(),
            page_size: page_size.max(1),
            total,
            keep_alive,
            last_accessed: Instant::now(),
        };
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scroll_id, context);
        scroll_id
    }

    /// 取下一页并续期；已过期的游标被移除并返回错误
    pub(crate) fn next_page(&self, scroll_id: ScrollId, keep_alive: Duration) -> Result<ScrollPage, EngineError> {
        let mut contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let expired = match contexts.get(&scroll_id) {
            Some(context) => context.is_expired(now),
            None => return Err(EngineError::ScrollExpired(scroll_id)),
        };
        if expired {
            contexts.remove(&scroll_id);
            tracing::debug!("滚动游标 {} 已过期", scroll_id);
            return Err(EngineError::ScrollExpired(scroll_id));
        }

        let context = contexts
            .get_mut(&scroll_id)
            .ok_or(EngineError::ScrollExpired(scroll_id))?;
        context.last_accessed = now;
        context.keep_alive = keep_alive;
        let take = context.page_size.min(context.pending.len());
        Ok(ScrollPage {
            searcher: context.searcher.clone(),
            hits: context.pending.drain(..take).collect(),
            total: context.total,
        })
    }

    /// 删除游标
    pub fn clear(&self, scroll_id: ScrollId) -> bool {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&scroll_id)
            .is_some()
    }

    /// 清理过期游标
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
        let before = contexts.len();
        contexts.retain(|_, context| !context.is_expired(now));
        let removed = before - contexts.len();
        if removed > 0 {
            tracing::debug!("清理了 {} 个过期的滚动游标", removed);
        }
    }

    /// 当前存活的游标数
    pub fn active_count(&self) -> usize {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;
    use tantivy::Index;

    fn searcher() -> Searcher {
        let index = Index::create_in_ram(build_schema());
        index.reader().unwrap().searcher()
    }

    fn hits(n: u32) -> Vec<(Score, DocAddress)> {
        (0..n).map(|doc| (1.0, DocAddress::new(0, doc))).collect()
    }

    #[test]
    fn test_pages_until_drained() {
        let registry = ScrollRegistry::new();
        let id = registry.open(searcher(), hits(5), 2, 7, Duration::from_secs(60));

        let sizes: Vec<usize> = (0..4)
            .map(|_| registry.next_page(id, Duration::from_secs(60)).unwrap().hits.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1, 0]);
        assert_eq!(registry.next_page(id, Duration::from_secs(60)).unwrap().total, 7);
    }

    #[test]
    fn test_expired_context_is_rejected() {
        let registry = ScrollRegistry::new();
        let id = registry.open(searcher(), hits(3), 1, 3, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(
            registry.next_page(id, Duration::from_secs(60)),
            Err(EngineError::ScrollExpired(_))
        ));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_clear_removes_context() {
        let registry = ScrollRegistry::new();
        let id = registry.open(searcher(), hits(3), 1, 3, Duration::from_secs(60));
        assert!(registry.clear(id));
        assert!(!registry.clear(id));
        assert!(registry.next_page(id, Duration::from_secs(60)).is_err());
    }
}
