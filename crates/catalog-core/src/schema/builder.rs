// catalog-core/src/schema/builder.rs
//! Schema 构建器
//!
//! 构建 Tantivy 索引 Schema，统一管理字段配置和分析器注册

use tantivy::Index;
use tantivy::schema::*;
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, StopWordFilter, TextAnalyzer};
use tantivy_jieba::JiebaTokenizer;

use super::fields::*;

/// 分词后超过该字节长度的词项直接丢弃
const MAX_TOKEN_LEN: usize = 40;

/// jieba 会把空白和标点切成独立词项，这里统一丢掉
const SEPARATOR_TOKENS: &[&str] = &[
    " ", "  ", "\t", "\n", "\r", "\r\n", "\u{3000}", ",", ".", ":", ";", "!", "?", "-", "_", "'",
    "\"", "(", ")", "[", "]", "/", "·", "，", "。", "、", "：", "；", "！", "？", "（", "）",
];

/// 构建 Tantivy Schema
///
/// # 字段
/// - `id`: 文档 ID，精确匹配，快速字段
/// - `category`: 分类，精确匹配，快速字段（用于聚合）
/// - `title` / `author`: 分词，另有 `*_keyword` 精确子字段用于排序
/// - `summary`: 摘要，分词
/// - `file_path` / `file_type`: 精确匹配
/// - `file_size`: 文件大小，支持范围查询
/// - `updated_time`: 更新时间
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    let text_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TEXT_ANALYZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    schema_builder.add_u64_field(FIELD_ID, INDEXED | STORED | FAST);

    schema_builder.add_text_field(FIELD_CATEGORY, STRING | STORED | FAST);

    schema_builder.add_text_field(FIELD_TITLE, text_options.clone());
    schema_builder.add_text_field(FIELD_TITLE_KEYWORD, STRING | FAST);
    schema_builder.add_text_field(FIELD_AUTHOR, text_options.clone());
    schema_builder.add_text_field(FIELD_AUTHOR_KEYWORD, STRING | FAST);
    schema_builder.add_text_field(FIELD_SUMMARY, text_options);

    schema_builder.add_text_field(FIELD_FILE_PATH, STRING | STORED);
    schema_builder.add_text_field(FIELD_FILE_TYPE, STRING | STORED);

    schema_builder.add_u64_field(FIELD_FILE_SIZE, INDEXED | FAST | STORED);
    schema_builder.add_date_field(FIELD_UPDATED_TIME, INDEXED | STORED);

    schema_builder.build()
}

/// 为索引注册 `catalog_text` 分析器
///
/// 打开已有索引和新建索引之后都必须调用一次
pub fn register_analyzer(index: &Index) {
    let analyzer = TextAnalyzer::builder(JiebaTokenizer {})
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            SEPARATOR_TOKENS.iter().map(|token| token.to_string()),
        ))
        .build();
    index.tokenizers().register(TEXT_ANALYZER, analyzer);
}

/// Schema 字段辅助结构
///
/// 缓存字段引用，避免重复查找
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub id: Field,
    pub category: Field,
    pub title: Field,
    pub title_keyword: Field,
    pub author: Field,
    pub author_keyword: Field,
    pub summary: Field,
    pub file_path: Field,
    pub file_type: Field,
    pub file_size: Field,
    pub updated_time: Field,
}

impl SchemaFields {
    /// 从 Schema 中提取所有字段引用，索引结构不匹配时返回错误
    pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field(FIELD_ID)?,
            category: schema.get_field(FIELD_CATEGORY)?,
            title: schema.get_field(FIELD_TITLE)?,
            title_keyword: schema.get_field(FIELD_TITLE_KEYWORD)?,
            author: schema.get_field(FIELD_AUTHOR)?,
            author_keyword: schema.get_field(FIELD_AUTHOR_KEYWORD)?,
            summary: schema.get_field(FIELD_SUMMARY)?,
            file_path: schema.get_field(FIELD_FILE_PATH)?,
            file_type: schema.get_field(FIELD_FILE_TYPE)?,
            file_size: schema.get_field(FIELD_FILE_SIZE)?,
            updated_time: schema.get_field(FIELD_UPDATED_TIME)?,
        })
    }

    /// 类型化字段到 Tantivy 字段的映射
    pub fn resolve(&self, field: IndexField) -> Field {
        match field {
            IndexField::Id => self.id,
            IndexField::Category => self.category,
            IndexField::Title => self.title,
            IndexField::TitleKeyword => self.title_keyword,
            IndexField::Author => self.author,
            IndexField::AuthorKeyword => self.author_keyword,
            IndexField::Summary => self.summary,
            IndexField::FilePath => self.file_path,
            IndexField::FileType => self.file_type,
            IndexField::FileSize => self.file_size,
            IndexField::UpdatedTime => self.updated_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::TokenStream;

    #[test]
    fn schema_exposes_every_field() {
        let schema = build_schema();
        let fields = SchemaFields::from_schema(&schema).unwrap();
        assert_eq!(schema.get_field_name(fields.summary), FIELD_SUMMARY);
        assert_eq!(schema.get_field_name(fields.resolve(IndexField::FileSize)), FIELD_FILE_SIZE);
    }

    #[test]
    fn analyzer_drops_separators_and_lowercases() {
        let index = Index::create_in_ram(build_schema());
        register_analyzer(&index);
        let mut analyzer = index.tokenizers().get(TEXT_ANALYZER).unwrap();
        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream("Rust Programming");
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        assert!(tokens.contains(&"rust".to_string()));
        assert!(tokens.contains(&"programming".to_string()));
        assert!(!tokens.iter().any(|t| t.trim().is_empty()));
    }
}
