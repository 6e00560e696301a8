// catalog-core/src/schema/document.rs
//! 文档结构定义
//!
//! 定义索引文档的结构化表示，以及与 Tantivy 文档之间的转换

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tantivy::TantivyDocument;
use tantivy::schema::Value;

use super::builder::SchemaFields;

/// 文档 ID（unix 下为文件 inode）
pub type DocId = u64;

/// 索引文档 - 一个物理文件对应一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 父目录名
    pub category: String,

    /// 书名
    pub title: String,

    /// 作者，文件名没有 `[作者]` 前缀时为空
    pub author: String,

    /// 相对于根目录的路径
    pub file_path: String,

    /// 小写扩展名
    pub file_type: String,

    /// 文件大小（字节）
    pub file_size: u64,

    /// 规范化后的摘要文本
    pub summary: String,

    /// 最近一次写入时间
    pub updated_time: DateTime<Utc>,
}

impl Document {
    /// 转换为 Tantivy 文档
    pub fn to_tantivy(&self, id: DocId, fields: &SchemaFields) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_u64(fields.id, id);
        doc.add_text(fields.category, &self.category);
        doc.add_text(fields.title, &self.title);
        doc.add_text(fields.title_keyword, &self.title);
        doc.add_text(fields.author, &self.author);
        doc.add_text(fields.author_keyword, &self.author);
        doc.add_text(fields.summary, &self.summary);
        doc.add_text(fields.file_path, &self.file_path);
        doc.add_text(fields.file_type, &self.file_type);
        doc.add_u64(fields.file_size, self.file_size);
        doc.add_date(
            fields.updated_time,
            tantivy::DateTime::from_timestamp_micros(self.updated_time.timestamp_micros()),
        );
        doc
    }

    /// 从存储的 Tantivy 文档还原，缺少 ID 时返回 None
    pub fn from_tantivy(doc: &TantivyDocument, fields: &SchemaFields) -> Option<(DocId, Self)> {
        let id = doc.get_first(fields.id).and_then(|v| v.as_u64())?;
        let text = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let updated_time = doc
            .get_first(fields.updated_time)
            .and_then(|v| v.as_datetime())
            .and_then(|dt| DateTime::<Utc>::from_timestamp_micros(dt.into_timestamp_micros()))
            .unwrap_or_default();

        Some((
            id,
            Self {
                category: text(fields.category),
                title: text(fields.title),
                author: text(fields.author),
                file_path: text(fields.file_path),
                file_type: text(fields.file_type),
                file_size: doc
                    .get_first(fields.file_size)
                    .and_then(|v| v.as_u64())
                    .unwrap_or_default(),
                summary: text(fields.summary),
                updated_time,
            },
        ))
    }
}

/// 部分更新
///
/// `None` 表示保持不变，`Some("")` 表示显式清空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub category: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub summary: Option<String>,
}

impl DocumentPatch {
    /// 按旧约定构建：空字符串和 0 表示不修改
    pub fn from_legacy(
        category: &str,
        title: &str,
        author: &str,
        file_path: &str,
        file_type: &str,
        file_size: u64,
        summary: &str,
    ) -> Self {
        let present = |value: &str| (!value.is_empty()).then(|| value.to_string());
        Self {
            category: present(category),
            title: present(title),
            author: present(author),
            file_path: present(file_path),
            file_type: present(file_type),
            file_size: (file_size != 0).then_some(file_size),
            summary: present(summary),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 把存在的字段合并进文档，返回是否有字段发生变化
    pub fn apply(&self, doc: &mut Document) -> bool {
        fn merge<T: Clone + PartialEq>(slot: &mut T, value: &Option<T>) -> bool {
            match value {
                Some(value) if slot != value => {
                    *slot = value.clone();
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;
        changed |= merge(&mut doc.category, &self.category);
        changed |= merge(&mut doc.title, &self.title);
        changed |= merge(&mut doc.author, &self.author);
        changed |= merge(&mut doc.file_path, &self.file_path);
        changed |= merge(&mut doc.file_type, &self.file_type);
        changed |= merge(&mut doc.file_size, &self.file_size);
        changed |= merge(&mut doc.summary, &self.summary);
        changed
    }
}
