//! 配置模块，负责声明可过滤的列及其类型，并从JSON文件加载

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::Number;
use crate::error::ConfigError;

/// 条件类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Boolean,
    Text,
    Number,
    Date,
    DateTime,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Text => "text",
            TypeTag::Number => "number",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// 数字类型的选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberOptions {
    /// 是否允许小数，默认不允许
    #[serde(default)]
    pub allow_decimal: bool,
    /// 允许值白名单，为空表示不限制
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Number>>,
}

/// 日期类型的选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateOptions {
    /// chrono strftime 格式
    #[serde(default = "default_date_format")]
    pub format: String,
}

impl Default for DateOptions {
    fn default() -> Self {
        Self { format: default_date_format() }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// 日期时间类型的选项，未指定格式时按 RFC 3339 解析
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateTimeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// 一条过滤类型声明：类型标签 + 允许的列 + 类型选项
///
/// JSON 形式：`{"type": "number", "keys": ["rating"], "options": {"allow_decimal": true}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterConfig {
    Boolean {
        keys: BTreeSet<String>,
    },
    Text {
        keys: BTreeSet<String>,
    },
    Number {
        keys: BTreeSet<String>,
        #[serde(default)]
        options: NumberOptions,
    },
    Date {
        keys: BTreeSet<String>,
        #[serde(default)]
        options: DateOptions,
    },
    DateTime {
        keys: BTreeSet<String>,
        #[serde(default)]
        options: DateTimeOptions,
    },
}

impl FilterConfig {
    pub fn boolean<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig::Boolean { keys: collect_keys(keys) }
    }

    pub fn text<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig::Text { keys: collect_keys(keys) }
    }

    pub fn number<I, S>(keys: I, options: NumberOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig::Number { keys: collect_keys(keys), options }
    }

    pub fn date<I, S>(keys: I, options: DateOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig::Date { keys: collect_keys(keys), options }
    }

    pub fn datetime<I, S>(keys: I, options: DateTimeOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig::DateTime { keys: collect_keys(keys), options }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            FilterConfig::Boolean { .. } => TypeTag::Boolean,
            FilterConfig::Text { .. } => TypeTag::Text,
            FilterConfig::Number { .. } => TypeTag::Number,
            FilterConfig::Date { .. } => TypeTag::Date,
            FilterConfig::DateTime { .. } => TypeTag::DateTime,
        }
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        match self {
            FilterConfig::Boolean { keys }
            | FilterConfig::Text { keys }
            | FilterConfig::Number { keys, .. }
            | FilterConfig::Date { keys, .. }
            | FilterConfig::DateTime { keys, .. } => keys,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.keys().contains(column)
    }
}

fn collect_keys<I, S>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

/// 过滤类型注册表，按声明顺序保存
///
/// 同一列在多条声明中出现时取第一条匹配；类型不同则拒绝构建。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    configs: Vec<FilterConfig>,
}

impl Registry {
    pub fn new(configs: Vec<FilterConfig>) -> Result<Self, ConfigError> {
        for (index, config) in configs.iter().enumerate() {
            for earlier in &configs[..index] {
                for column in config.keys().intersection(earlier.keys()) {
                    if earlier.type_tag() != config.type_tag() {
                        return Err(ConfigError::ConflictingTypes {
                            column: column.clone(),
                            first: earlier.type_tag(),
                            second: config.type_tag(),
                        });
                    }
                    tracing::warn!(
                        column = %column,
                        type_tag = %config.type_tag(),
                        "Column declared more than once, first declaration wins"
                    );
                }
            }
        }
        Ok(Self { configs })
    }

    /// 从JSON字符串加载注册表
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let configs: Vec<FilterConfig> = serde_json::from_str(json)?;
        Self::new(configs)
    }

    /// 从JSON文件加载注册表
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path_ref.display(),
            configs = registry.configs.len(),
            "Filter registry loaded"
        );
        Ok(registry)
    }

    pub fn configs(&self) -> &[FilterConfig] {
        &self.configs
    }

    /// 查找包含该列的第一条声明；给出类型提示时还要求类型一致
    pub fn resolve(&self, column: &str, hint: Option<TypeTag>) -> Option<&FilterConfig> {
        self.configs.iter().find(|config| {
            config.contains(column) && hint.map_or(true, |tag| config.type_tag() == tag)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_load_valid_json_config() {
        let path = temp_path("filter_config.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"[
                {{"type": "boolean", "keys": ["flag"]}},
                {{"type": "number", "keys": ["rating"], "options": {{"allow_decimal": true}}}},
                {{"type": "date", "keys": ["posted_on"]}},
                {{"type": "datetime", "keys": ["posted_at"]}}
            ]"#
        )
        .unwrap();

        let registry = Registry::from_json_file(&path).unwrap();
        assert_eq!(registry.configs().len(), 4);
        assert_eq!(
            registry.resolve("flag", None).map(FilterConfig::type_tag),
            Some(TypeTag::Boolean)
        );
        match registry.resolve("rating", None) {
            Some(FilterConfig::Number { options, .. }) => assert!(options.allow_decimal),
            other => panic!("Expected number config, got {:?}", other),
        }
        match registry.resolve("posted_on", None) {
            Some(FilterConfig::Date { options, .. }) => assert_eq!(options.format, "%Y-%m-%d"),
            other => panic!("Expected date config, got {:?}", other),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let result = Registry::from_json_str("invalid json");
        assert!(matches!(result, Err(ConfigError::Json(_))));

        let result = Registry::from_json_str(r#"[{"type": "color", "keys": ["hue"]}]"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Registry::from_json_file("non_existent_filter_config.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_conflicting_types_rejected() {
        let result = Registry::new(vec![
            FilterConfig::text(["status"]),
            FilterConfig::number(["status"], NumberOptions::default()),
        ]);
        match result {
            Err(ConfigError::ConflictingTypes { column, first, second }) => {
                assert_eq!(column, "status");
                assert_eq!(first, TypeTag::Text);
                assert_eq!(second, TypeTag::Number);
            }
            other => panic!("Expected conflicting types error, got {:?}", other),
        }
    }

    #[test]
    fn test_first_declaration_wins() {
        let registry = Registry::new(vec![
            FilterConfig::number(["rating"], NumberOptions::default()),
            FilterConfig::number(
                ["rating", "score"],
                NumberOptions { allow_decimal: true, allowed_values: None },
            ),
        ])
        .unwrap();

        match registry.resolve("rating", None) {
            Some(FilterConfig::Number { options, .. }) => assert!(!options.allow_decimal),
            other => panic!("Expected number config, got {:?}", other),
        }
        match registry.resolve("score", None) {
            Some(FilterConfig::Number { options, .. }) => assert!(options.allow_decimal),
            other => panic!("Expected number config, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_with_hint() {
        let registry = Registry::new(vec![
            FilterConfig::text(["title"]),
            FilterConfig::boolean(["flag"]),
        ])
        .unwrap();

        assert!(registry.resolve("title", Some(TypeTag::Text)).is_some());
        assert!(registry.resolve("title", Some(TypeTag::Boolean)).is_none());
        assert!(registry.resolve("missing", None).is_none());
    }

    #[test]
    fn test_type_tag_names() {
        assert_eq!(serde_json::from_str::<TypeTag>(r#""datetime""#).unwrap(), TypeTag::DateTime);
        assert!(serde_json::from_str::<TypeTag>(r#""color""#).is_err());
        assert_eq!(TypeTag::DateTime.to_string(), "datetime");
    }
}
