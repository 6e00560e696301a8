// catalog-core/src/query.rs
//! 查询 DSL
//!
//! 与引擎无关的查询描述，由引擎实现编译为具体查询

use serde::{Deserialize, Serialize};

use crate::schema::{DocId, IndexField};

/// 查询描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySpec {
    /// 匹配全部文档
    MatchAll,
    /// 对文本先分词再匹配，任意词项命中即可
    Match {
        field: IndexField,
        query: String,
        boost: f32,
    },
    /// 精确词项
    Term { field: IndexField, value: String },
    /// 按文档 ID
    Ids(Vec<DocId>),
    /// 数值闭区间
    Range {
        field: IndexField,
        gte: Option<u64>,
        lte: Option<u64>,
        boost: f32,
    },
    /// 布尔组合
    Bool(BoolQuery),
}

/// 布尔查询
///
/// `filter` 必须满足但不参与打分；`should` 至少满足 `minimum_should_match` 个
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<QuerySpec>,
    pub should: Vec<QuerySpec>,
    pub filter: Vec<QuerySpec>,
    pub must_not: Vec<QuerySpec>,
    pub minimum_should_match: Option<usize>,
}

impl QuerySpec {
    pub fn matches(field: IndexField, query: impl Into<String>) -> Self {
        Self::Match {
            field,
            query: query.into(),
            boost: 1.0,
        }
    }

    pub fn term(field: IndexField, value: impl Into<String>) -> Self {
        Self::Term {
            field,
            value: value.into(),
        }
    }

    pub fn range(field: IndexField, gte: Option<u64>, lte: Option<u64>) -> Self {
        Self::Range {
            field,
            gte,
            lte,
            boost: 1.0,
        }
    }

    /// 设置权重，对不支持权重的查询无效
    pub fn boost(mut self, value: f32) -> Self {
        match &mut self {
            Self::Match { boost, .. } | Self::Range { boost, .. } => *boost = value,
            _ => {}
        }
        self
    }
}

impl BoolQuery {
    pub fn must(mut self, query: QuerySpec) -> Self {
        self.must.push(query);
        self
    }

    pub fn should(mut self, query: QuerySpec) -> Self {
        self.should.push(query);
        self
    }

    pub fn filter(mut self, query: QuerySpec) -> Self {
        self.filter.push(query);
        self
    }

    pub fn must_not(mut self, query: QuerySpec) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn minimum_should_match(mut self, count: usize) -> Self {
        self.minimum_should_match = Some(count);
        self
    }

    /// 实际生效的 should 最少命中数
    ///
    /// 未指定时，只有 should 子句则至少命中一个，否则 should 只影响打分
    pub fn effective_minimum_should_match(&self) -> usize {
        match self.minimum_should_match {
            Some(count) => count.min(self.should.len()),
            None if self.must.is_empty() && self.filter.is_empty() && !self.should.is_empty() => 1,
            None => 0,
        }
    }
}

impl From<BoolQuery> for QuerySpec {
    fn from(query: BoolQuery) -> Self {
        Self::Bool(query)
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: IndexField,
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: IndexField) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: IndexField) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}
