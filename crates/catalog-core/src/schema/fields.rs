// catalog-core/src/schema/fields.rs
//! 字段名常量定义
//!
//! 统一管理所有 Schema 字段名，避免魔法字符串

use serde::{Deserialize, Serialize};

/// 文档唯一标识（文件 inode）
pub const FIELD_ID: &str = "id";

/// 分类（父目录名，精确匹配）
pub const FIELD_CATEGORY: &str = "category";

/// 书名（分词）
pub const FIELD_TITLE: &str = "title";

/// 书名精确匹配子字段（用于排序）
pub const FIELD_TITLE_KEYWORD: &str = "title_keyword";

/// 作者（分词）
pub const FIELD_AUTHOR: &str = "author";

/// 作者精确匹配子字段（用于排序）
pub const FIELD_AUTHOR_KEYWORD: &str = "author_keyword";

/// 相对于根目录的文件路径
pub const FIELD_FILE_PATH: &str = "file_path";

/// 文件类型（小写扩展名，不含点号）
pub const FIELD_FILE_TYPE: &str = "file_type";

/// 文件大小（字节）
pub const FIELD_FILE_SIZE: &str = "file_size";

/// 提取出的摘要文本
pub const FIELD_SUMMARY: &str = "summary";

/// 最近一次写入时间
pub const FIELD_UPDATED_TIME: &str = "updated_time";

/// 分词字段使用的分析器名称
pub const TEXT_ANALYZER: &str = "catalog_text";

/// 索引字段的类型化引用，查询 DSL 和排序都通过它指定字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexField {
    Id,
    Category,
    Title,
    TitleKeyword,
    Author,
    AuthorKeyword,
    FilePath,
    FileType,
    FileSize,
    Summary,
    UpdatedTime,
}

/// 字段的索引方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 经过分析器分词
    Analyzed,
    /// 整体作为一个词项
    Keyword,
    /// 无符号整数
    Unsigned,
    /// 日期
    Date,
}

impl IndexField {
    pub fn name(self) -> &'static str {
        match self {
            IndexField::Id => FIELD_ID,
            IndexField::Category => FIELD_CATEGORY,
            IndexField::Title => FIELD_TITLE,
            IndexField::TitleKeyword => FIELD_TITLE_KEYWORD,
            IndexField::Author => FIELD_AUTHOR,
            IndexField::AuthorKeyword => FIELD_AUTHOR_KEYWORD,
            IndexField::FilePath => FIELD_FILE_PATH,
            IndexField::FileType => FIELD_FILE_TYPE,
            IndexField::FileSize => FIELD_FILE_SIZE,
            IndexField::Summary => FIELD_SUMMARY,
            IndexField::UpdatedTime => FIELD_UPDATED_TIME,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            IndexField::Title | IndexField::Author | IndexField::Summary => FieldKind::Analyzed,
            IndexField::Category
            | IndexField::TitleKeyword
            | IndexField::AuthorKeyword
            | IndexField::FilePath
            | IndexField::FileType => FieldKind::Keyword,
            IndexField::Id | IndexField::FileSize => FieldKind::Unsigned,
            IndexField::UpdatedTime => FieldKind::Date,
        }
    }
}
