//! 子句提取: 把分类后的 token 序列整理成过滤子句, 以及反向生成查询语句
//!
//! ## 提取流程
//!
//! ```text
//! extract_clauses()
//!   ├─ condition      → 结束当前子句, 记录下一个子句的连接词
//!   ├─ key            → 开始新子句
//!   ├─ method         → 设置当前子句的运算符
//!   ├─ value          → 当前子句有运算符且 (在括号内 或 还没有值) 时追加, 否则作为全文检索词开始新子句
//!   ├─ valueCondition → 记录 value 之间的连接词
//!   └─ bracket/split  → 只记录括号深度
//! ```
//!
//! 提取过程是宽松的, 不会失败: 编辑过程中的半截语句同样可以提取。

use crate::ast::{Clause, Joiner, Method};
use crate::token::{is_closing_bracket, is_opening_bracket, Token, TokenKind};

pub fn extract_clauses(tokens: &[Token]) -> Vec<Clause> {
    let mut clauses = Vec::new();
    let mut current: Option<Clause> = None;
    let mut joiner: Option<Joiner> = None;
    let mut depth = 0usize;

    for token in tokens {
        let text = token.value.trim();
        match token.kind {
            TokenKind::Split => {}
            TokenKind::Bracket => {
                let c = text.chars().next().unwrap_or_default();
                if is_opening_bracket(c) {
                    depth += 1;
                } else if is_closing_bracket(c) {
                    depth = depth.saturating_sub(1);
                }
            }
            TokenKind::Condition => {
                clauses.extend(current.take());
                joiner = Joiner::from_keyword(text);
            }
            TokenKind::Key => {
                clauses.extend(current.take());
                let mut clause = Clause::new(joiner.take());
                clause.key = Some(text.to_string());
                current = Some(clause);
            }
            TokenKind::Method => {
                let clause = current.get_or_insert_with(|| Clause::new(joiner.take()));
                if let Some(method) = Method::from_symbol(text) {
                    // `key:>=3` 中比较运算符覆盖前面的 `:`
                    if !(method == Method::Eq && clause.method.is_some()) {
                        clause.method = Some(method);
                    }
                }
            }
            TokenKind::ValueCondition => {
                if let (Some(clause), Some(j)) = (current.as_mut(), Joiner::from_keyword(text)) {
                    clause.value_joiners.push(j);
                }
            }
            TokenKind::Value => match current.as_mut() {
                // 括号外一个子句只有一个值, 后面的词是全文检索词
                Some(clause) if clause.method.is_some() && (depth > 0 || clause.values.is_empty()) => {
                    clause.values.push(text.to_string())
                }
                _ => {
                    clauses.extend(current.take());
                    let mut clause = Clause::new(joiner.take());
                    clause.values.push(text.to_string());
                    current = Some(clause);
                }
            },
        }
    }
    clauses.extend(current);

    // 没有运算符也没有值的 key 实际上是全文检索词
    for clause in &mut clauses {
        if clause.method.is_none() && clause.values.is_empty() {
            if let Some(key) = clause.key.take() {
                clause.values.push(key);
            }
        }
    }
    clauses
}

/// 由子句生成查询语句（界面模式切换到语句模式时使用）
pub fn clauses_to_query_string(clauses: &[Clause]) -> String {
    let mut out = String::new();
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            match clause.joiner {
                Some(joiner) => {
                    out.push(' ');
                    out.push_str(joiner.keyword());
                    out.push(' ');
                }
                None => out.push(' '),
            }
        }
        write_clause(&mut out, clause);
    }
    out
}

fn write_clause(out: &mut String, clause: &Clause) {
    let Some(key) = &clause.key else {
        out.push_str(&clause.values.join(" "));
        return;
    };
    out.push_str(key);
    let Some(method) = clause.method else {
        return;
    };
    out.push_str(method.query_symbol());
    match clause.values.as_slice() {
        [] => {}
        [value] => out.push_str(value),
        [first, rest @ ..] => {
            out.push('(');
            out.push_str(first);
            for (i, value) in rest.iter().enumerate() {
                let joiner = clause.value_joiners.get(i).copied().unwrap_or(Joiner::Or);
                out.push(' ');
                out.push_str(joiner.keyword());
                out.push(' ');
                out.push_str(value);
            }
            out.push(')');
        }
    }
}
