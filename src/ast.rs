//! 过滤子句结构, 对应界面模式下的一行条件

use serde::{Deserialize, Serialize};

/// 一个过滤子句, 例如：`status:(active OR pending)`
///
/// 没有 key 的子句是全文检索词, 例如 `timeout`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// 与前一个子句之间的连接词; 第一个子句或隐式连接时为 None
    pub joiner: Option<Joiner>,
    pub key: Option<String>,
    pub method: Option<Method>,
    pub values: Vec<String>,
    /// 括号内 value 之间的连接词
    pub value_joiners: Vec<Joiner>,
}

impl Clause {
    pub fn new(joiner: Option<Joiner>) -> Self {
        Self {
            joiner,
            ..Default::default()
        }
    }

    /// 单值子句的便捷构造
    pub fn field(key: &str, method: Method, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            method: Some(method),
            values: vec![value.to_string()],
            ..Default::default()
        }
    }
}

/// 逻辑连接词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Joiner {
    And,    // AND
    Or,     // OR
    AndNot, // AND NOT
}

impl Joiner {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Joiner::And),
            "OR" => Some(Joiner::Or),
            "AND NOT" => Some(Joiner::AndNot),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
            Joiner::AndNot => "AND NOT",
        }
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Eq,     // :
    Exists, // :*
    Gt,     // >
    Lt,     // <
    Gte,    // >=
    Lte,    // <=
}

impl Method {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ":" => Some(Method::Eq),
            ":*" => Some(Method::Exists),
            ">" => Some(Method::Gt),
            "<" => Some(Method::Lt),
            ">=" => Some(Method::Gte),
            "<=" => Some(Method::Lte),
            _ => None,
        }
    }

    /// 输出时比较运算统一写成 `key:>=value` 的形式
    pub fn query_symbol(self) -> &'static str {
        match self {
            Method::Eq => ":",
            Method::Exists => ":*",
            Method::Gt => ":>",
            Method::Lt => ":<",
            Method::Gte => ":>=",
            Method::Lte => ":<=",
        }
    }
}
