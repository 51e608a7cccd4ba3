//! 查询语句的分词入口与类型判定
//!
//! ## 处理流程
//!
//! ```text
//! parse_query_string()
//!   ├─ Lexer 切分
//!   ├─ 合并相邻的 value（例如 foo"bar"）
//!   ├─ 规范化 condition（大写, AND NOT 中间只保留一个空格）
//!   ├─ 去掉开头的 split, 结尾的 split 折叠成一个空格
//!   ├─ mark_bracket_scopes(): 括号内的 condition → valueCondition
//!   └─ resolve_keys(): value → key
//! ```

use crate::lexer::Lexer;
use crate::token::{is_closing_bracket, is_opening_bracket, Token, TokenKind};

/// 把查询语句切分成带类型的 token 列表。纯函数, 对任何输入都不会失败。
pub fn parse_query_string(query: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for lexeme in Lexer::new(query) {
        match lexeme.kind {
            TokenKind::Value => {
                if let Some(last) = tokens.last_mut().filter(|t| t.kind == TokenKind::Value) {
                    last.value.push_str(lexeme.text);
                    continue;
                }
                tokens.push(Token::new(TokenKind::Value, lexeme.text));
            }
            TokenKind::Condition => {
                tokens.push(Token::new(TokenKind::Condition, normalize_condition(lexeme.text)));
            }
            kind => tokens.push(Token::new(kind, lexeme.text)),
        }
    }

    if tokens.first().is_some_and(Token::is_split) {
        tokens.remove(0);
    }
    if let Some(last) = tokens.last_mut().filter(|t| t.is_split()) {
        last.value = " ".to_string();
    }

    let depths = mark_bracket_scopes(&mut tokens);
    resolve_keys(&mut tokens, &depths);
    tokens
}

/// 把原始输入中的光标位置（字符数）映射到规范化之后的语句中
///
/// 规范化只会改变三类片段的长度: 开头的 split 被删除, 结尾的 split 变成一个空格,
/// condition 被大写并折叠空白。光标落在这些片段内部时被截断到片段的新长度。
pub fn normalized_offset(query: &str, caret: usize) -> usize {
    let mut lexemes = Lexer::new(query).peekable();
    let mut raw = 0usize;
    let mut out = 0usize;
    let mut first = true;

    while let Some(lexeme) = lexemes.next() {
        let raw_len = lexeme.text.chars().count();
        let out_len = match lexeme.kind {
            TokenKind::Split if first => 0,
            TokenKind::Split if lexemes.peek().is_none() => 1,
            TokenKind::Condition => normalize_condition(lexeme.text).chars().count(),
            _ => raw_len,
        };
        first = false;
        if caret <= raw + raw_len {
            return out + (caret - raw).min(out_len);
        }
        raw += raw_len;
        out += out_len;
    }
    out
}

/// `and  not` → `AND NOT`
fn normalize_condition(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 括号深度扫描, 返回每个 token 所在的深度
///
/// 三种括号视为同一种: 任意右括号都可以关闭任意左括号, 深度不会小于 0。
fn mark_bracket_scopes(tokens: &mut [Token]) -> Vec<usize> {
    let mut depth = 0usize;
    let mut depths = Vec::with_capacity(tokens.len());

    for token in tokens.iter_mut() {
        match token.kind {
            TokenKind::Bracket => {
                let c = token.value.chars().next().unwrap_or_default();
                if is_opening_bracket(c) {
                    depths.push(depth);
                    depth += 1;
                    continue;
                }
                if is_closing_bracket(c) {
                    depth = depth.saturating_sub(1);
                }
            }
            TokenKind::Condition if depth > 0 => {
                token.kind = TokenKind::ValueCondition;
            }
            _ => {}
        }
        depths.push(depth);
    }
    depths
}

/// value → key 的判定:
/// 1. 整个序列的第一个 token
/// 2. 下一个非 split token 是 method
/// 3. 深度为 0 且上一个非 split token 是 condition
fn resolve_keys(tokens: &mut [Token], depths: &[usize]) {
    for i in 0..tokens.len() {
        if tokens[i].kind != TokenKind::Value {
            continue;
        }
        let next_is_method = tokens[i + 1..]
            .iter()
            .find(|t| !t.is_split())
            .is_some_and(|t| t.kind == TokenKind::Method);
        let after_condition = depths[i] == 0
            && tokens[..i]
                .iter()
                .rev()
                .find(|t| !t.is_split())
                .is_some_and(|t| t.kind == TokenKind::Condition);

        if i == 0 || next_is_method || after_condition {
            tokens[i].kind = TokenKind::Key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::serialize;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        parse_query_string(input)
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    fn t(kind: TokenKind, value: &str) -> (TokenKind, String) {
        (kind, value.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_query_string("").is_empty());
        assert!(kinds("   ").is_empty());
    }

    #[test]
    fn test_key_method_value() {
        assert_eq!(
            kinds("status:active"),
            vec![
                t(TokenKind::Key, "status"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Value, "active"),
            ]
        );
    }

    #[test]
    fn test_two_clauses_joined_by_condition() {
        assert_eq!(
            kinds("age:20 AND name:bob"),
            vec![
                t(TokenKind::Key, "age"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Value, "20"),
                t(TokenKind::Split, " "),
                t(TokenKind::Condition, "AND"),
                t(TokenKind::Split, " "),
                t(TokenKind::Key, "name"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Value, "bob"),
            ]
        );
    }

    #[test]
    fn test_bracket_scoped_condition() {
        assert_eq!(
            kinds("title:(quick AND brown)"),
            vec![
                t(TokenKind::Key, "title"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Bracket, "("),
                t(TokenKind::Value, "quick"),
                t(TokenKind::Split, " "),
                t(TokenKind::ValueCondition, "AND"),
                t(TokenKind::Split, " "),
                t(TokenKind::Value, "brown"),
                t(TokenKind::Bracket, ")"),
            ]
        );
    }

    #[test]
    fn test_condition_after_brackets_close_is_top_level() {
        let tokens = parse_query_string("a:(x OR y) or b:z");
        let conditions: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Condition | TokenKind::ValueCondition))
            .map(|t| (t.kind, t.value.as_str()))
            .collect();
        assert_eq!(
            conditions,
            vec![(TokenKind::ValueCondition, "OR"), (TokenKind::Condition, "OR")]
        );
        assert_eq!(serialize(&tokens), "a:(x OR y) OR b:z");
    }

    #[test]
    fn test_wildcard_key() {
        let tokens = parse_query_string(r"vers\*on:(quick brown)");
        assert_eq!(tokens[0], Token::new(TokenKind::Key, r"vers\*on"));
        assert_eq!(tokens[1].kind, TokenKind::Method);
    }

    #[test]
    fn test_mixed_bracket_kinds_are_lenient() {
        let tokens = parse_query_string("(a OR b] OR c");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Bracket,
                TokenKind::Value,
                TokenKind::Split,
                TokenKind::ValueCondition,
                TokenKind::Split,
                TokenKind::Value,
                TokenKind::Bracket,
                TokenKind::Split,
                TokenKind::Condition,
                TokenKind::Split,
                TokenKind::Key,
            ]
        );
    }

    #[test]
    fn test_unbalanced_closing_bracket_does_not_go_negative() {
        let tokens = parse_query_string("a) OR b");
        assert_eq!(tokens[2].kind, TokenKind::Split);
        assert_eq!(tokens[3].kind, TokenKind::Condition);
        assert_eq!(tokens[5].kind, TokenKind::Key);
    }

    #[test]
    fn test_adjacent_values_coalesce() {
        assert_eq!(
            kinds(r#"msg:foo"bar baz"qux"#),
            vec![
                t(TokenKind::Key, "msg"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Value, r#"foo"bar baz"qux"#),
            ]
        );
    }

    #[test]
    fn test_leading_and_trailing_split() {
        assert_eq!(
            kinds("  host:a   "),
            vec![
                t(TokenKind::Key, "host"),
                t(TokenKind::Method, ":"),
                t(TokenKind::Value, "a"),
                t(TokenKind::Split, " "),
            ]
        );
    }

    #[test]
    fn test_condition_normalized() {
        assert_eq!(
            serialize(&parse_query_string("a:1 and   not b:2 or c:3")),
            "a:1 AND NOT b:2 OR c:3"
        );
    }

    #[test]
    fn test_free_text_value_after_value() {
        // 第一个词是 key, 后面没有 method 的词保持 value
        assert_eq!(
            kinds("error timeout"),
            vec![
                t(TokenKind::Key, "error"),
                t(TokenKind::Split, " "),
                t(TokenKind::Value, "timeout"),
            ]
        );
    }

    #[test]
    fn test_round_trip_table() {
        let inputs = [
            "status:active",
            r#"msg:"hello world" AND level:>=3"#,
            "a:((x OR y) AND z)",
            r"path:C\:temp* OR host:web-*",
            r#"log:"unterminated"#,
            "key:* ",
            "名字:值 AND 状态:(正常 OR 异常)",
        ];
        for input in inputs {
            assert_eq!(serialize(&parse_query_string(input)), input, "input: {input}");
        }
    }

    #[test]
    fn test_normalized_offset() {
        // 光标在 b 之后, condition 折叠后前移一个字符
        let raw = "a:1 and  not b:2";
        let mapped = normalized_offset(raw, 14);
        assert_eq!(mapped, 13);
        let query = serialize(&parse_query_string(raw));
        assert_eq!(query.chars().take(mapped).collect::<String>(), "a:1 AND NOT b");

        // 开头的空格被删除
        assert_eq!(normalized_offset(" a:1", 1), 0);
        assert_eq!(normalized_offset(" a:1", 3), 2);
        // 结尾的多个空格折叠成一个
        assert_eq!(normalized_offset("a   ", 4), 2);
        assert_eq!(normalized_offset("   ", 3), 0);
        assert_eq!(normalized_offset("", 5), 0);
        // 没有规范化时保持不变
        assert_eq!(normalized_offset("status:activ", 5), 5);
        assert_eq!(normalized_offset("status:activ", 40), 12);
    }

    #[test]
    fn test_idempotence_table() {
        let inputs = ["  a  and b ", "x:(1 or 2]", r#""q" or"#, "a:>=b<c", "and"];
        for input in inputs {
            let once = parse_query_string(input);
            let twice = parse_query_string(&serialize(&once));
            assert_eq!(once, twice, "input: {input}");
        }
    }
}
