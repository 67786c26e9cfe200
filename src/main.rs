use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sea_query::{Alias, Asterisk, PostgresQueryBuilder, SelectStatement};
use tracing_subscriber::EnvFilter;

use query_filters::config::{DateOptions, DateTimeOptions, FilterConfig, NumberOptions, Registry};
use query_filters::params::parse_query_string;
use query_filters::{encode, parse, parse_params, query, FilterExpression, ParseError, ParseErrors};

const CONFIG_PATH: &str = "filter_config.json";
const TABLE: &str = "posts";

/// 默认的演示注册表
fn default_registry() -> Result<Registry> {
    Ok(Registry::new(vec![
        FilterConfig::boolean(["published", "flag"]),
        FilterConfig::text(["title", "author"]),
        FilterConfig::number(
            ["rating", "views"],
            NumberOptions { allow_decimal: true, allowed_values: None },
        ),
        FilterConfig::date(["posted_on"], DateOptions::default()),
        FilterConfig::datetime(["updated_at"], DateTimeOptions::default()),
    ])?)
}

/// 优先使用JSON配置，失败时使用默认配置
fn load_registry() -> Result<Registry> {
    match Registry::from_json_file(CONFIG_PATH) {
        Ok(registry) => {
            println!("✅ 成功从JSON配置文件加载: {}", CONFIG_PATH);
            Ok(registry)
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            default_registry()
        }
    }
}

fn print_registry(registry: &Registry) {
    println!("\n[配置信息]:");
    for config in registry.configs() {
        let keys: Vec<&str> = config.keys().iter().map(String::as_str).collect();
        println!("  {:<9} {}", config.type_tag(), keys.join(", "));
    }
}

/// `{` 开头按嵌套过滤器解析，否则按URL查询串解析
fn parse_line(registry: &Registry, line: &str) -> Result<FilterExpression, ParseErrors> {
    if line.starts_with('{') {
        match serde_json::from_str(line) {
            Ok(input) => parse(registry, &input),
            Err(e) => Err(ParseError::syntax(format!("Invalid JSON: {}", e)).into()),
        }
    } else {
        parse_params(registry, &parse_query_string(line))
    }
}

fn run(registry: &Registry, line: &str) {
    let expression = match parse_line(registry, line) {
        Ok(expression) => expression,
        Err(errors) => {
            println!("✗ 解析失败 ({} 个错误):", errors.len());
            for error in &errors {
                println!("  [{:?}] {}", error.kind, error.message);
            }
            return;
        }
    };

    let fragment = encode(&expression);
    println!("✓ 表达式: {}", fragment.expression);
    println!("  绑定值: {:?}", fragment.values);

    let mut select = SelectStatement::new();
    select.column(Asterisk).from(Alias::new(TABLE));
    let sql = query(select, &expression).to_string(PostgresQueryBuilder);
    println!("  SQL: {}", sql);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("--- Query Filters: 过滤器到 SQL ---");
    let registry = load_registry()?;
    print_registry(&registry);

    println!("\n输入嵌套过滤器JSON或查询串，例如:");
    println!(r#"  {{"type": "any", "conditions": [{{"column": "flag", "value": true}}]}}"#);
    println!("  rating_greater_than_or=4.5&title_contains=rust");
    println!("Ctrl-D 退出\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                run(&registry, line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
