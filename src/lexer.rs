//! 查询语句的词法分析器
//!
//! 只负责切分, 不做 key/value 的判定; 判定由 `classify` 完成。
//! 任何输入都能被完整切分, 无法识别的字符都会落入裸词分支。

use crate::token::{is_closing_bracket, is_opening_bracket, Span, TokenKind};

/// 词法单元: 原始文本切片加上初步类型
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 尝试读取 `AND NOT` / `AND` / `OR`（大小写不敏感，后面必须是边界）
    fn eat_condition(&mut self) -> bool {
        let rest = self.rest();
        if let Some(and_len) = keyword_len(rest, "and") {
            let after = &rest[and_len..];
            let gap = after.len() - after.trim_start().len();
            let mut len = and_len;
            if gap > 0 {
                if let Some(not_len) = keyword_len(&after[gap..], "not") {
                    len += gap + not_len;
                }
            }
            self.position += len;
            return true;
        }
        if let Some(or_len) = keyword_len(rest, "or") {
            self.position += or_len;
            return true;
        }
        false
    }

    /// 尝试读取比较运算符
    fn eat_operator(&mut self) -> bool {
        let rest = self.rest();
        let len = if rest.starts_with("<=") || rest.starts_with(">=") {
            2
        } else if rest.starts_with(":*") && rest[2..].chars().next().map_or(true, is_boundary) {
            2
        } else if rest.starts_with(':') || rest.starts_with('>') || rest.starts_with('<') {
            1
        } else {
            return false;
        };
        self.position += len;
        true
    }

    /// 读取双引号字符串，引号保留在结果中
    /// 未闭合的字符串一直读到输入末尾
    fn read_quoted(&mut self) {
        self.bump(); // 消费开始引号
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '"' => break,
                _ => {}
            }
        }
    }

    /// 读取裸词，反斜杠转义下一个字符
    fn read_word(&mut self) {
        while let Some(c) = self.peek() {
            if ends_word(c) {
                break;
            }
            self.bump();
            if c == '\\' {
                self.bump();
            }
        }
    }
}

/// 关键字之后允许出现的字符
fn is_boundary(c: char) -> bool {
    c.is_whitespace() || is_opening_bracket(c) || is_closing_bracket(c)
}

fn ends_word(c: char) -> bool {
    is_boundary(c) || matches!(c, ':' | '<' | '>' | '"')
}

/// 如果 `rest` 以关键字开头且紧跟边界，返回关键字的字节长度
fn keyword_len(rest: &str, word: &str) -> Option<usize> {
    let head = rest.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    match rest[word.len()..].chars().next() {
        None => Some(word.len()),
        Some(c) if is_boundary(c) => Some(word.len()),
        Some(_) => None,
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.position;
        let c = self.peek()?; // 到达输入末尾

        let kind = if c.is_whitespace() {
            self.skip_whitespace();
            TokenKind::Split
        } else if is_opening_bracket(c) || is_closing_bracket(c) {
            self.bump();
            TokenKind::Bracket
        } else if self.eat_condition() {
            TokenKind::Condition
        } else if self.eat_operator() {
            TokenKind::Method
        } else if c == '"' {
            self.read_quoted();
            TokenKind::Value
        } else {
            self.read_word();
            TokenKind::Value
        };

        Some(Lexeme {
            kind,
            text: &self.input[start..self.position],
            span: Span::new(start, self.position),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new(input).map(|l| (l.kind, l.text)).collect()
    }

    #[test]
    fn test_simple_filter() {
        assert_eq!(
            lex("status:active"),
            vec![
                (TokenKind::Value, "status"),
                (TokenKind::Method, ":"),
                (TokenKind::Value, "active"),
            ]
        );
    }

    #[test]
    fn test_all_operators_and_brackets() {
        let kinds: Vec<_> = lex("<= >= : > < :* ( ) [ ] { }")
            .into_iter()
            .filter(|(k, _)| *k != TokenKind::Split)
            .collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Method, "<="),
                (TokenKind::Method, ">="),
                (TokenKind::Method, ":"),
                (TokenKind::Method, ">"),
                (TokenKind::Method, "<"),
                (TokenKind::Method, ":*"),
                (TokenKind::Bracket, "("),
                (TokenKind::Bracket, ")"),
                (TokenKind::Bracket, "["),
                (TokenKind::Bracket, "]"),
                (TokenKind::Bracket, "{"),
                (TokenKind::Bracket, "}"),
            ]
        );
    }

    #[test]
    fn test_conditions_need_boundary() {
        assert_eq!(
            lex("a and NOT b"),
            vec![
                (TokenKind::Value, "a"),
                (TokenKind::Split, " "),
                (TokenKind::Condition, "and NOT"),
                (TokenKind::Split, " "),
                (TokenKind::Value, "b"),
            ]
        );
        assert_eq!(lex("android"), vec![(TokenKind::Value, "android")]);
        assert_eq!(lex("order"), vec![(TokenKind::Value, "order")]);
        assert_eq!(
            lex("AND notice"),
            vec![
                (TokenKind::Condition, "AND"),
                (TokenKind::Split, " "),
                (TokenKind::Value, "notice"),
            ]
        );
    }

    #[test]
    fn test_quoted_and_unterminated_strings() {
        assert_eq!(
            lex(r#"msg:"a \"b\" c" x"#),
            vec![
                (TokenKind::Value, "msg"),
                (TokenKind::Method, ":"),
                (TokenKind::Value, r#""a \"b\" c""#),
                (TokenKind::Split, " "),
                (TokenKind::Value, "x"),
            ]
        );
        assert_eq!(lex(r#""open ended"#), vec![(TokenKind::Value, r#""open ended"#)]);
    }

    #[test]
    fn test_word_stops_at_closing_bracket() {
        assert_eq!(
            lex("(brown)"),
            vec![
                (TokenKind::Bracket, "("),
                (TokenKind::Value, "brown"),
                (TokenKind::Bracket, ")"),
            ]
        );
    }

    #[test]
    fn test_escapes_stay_in_word() {
        assert_eq!(
            lex(r"path:C\:temp vers\*on"),
            vec![
                (TokenKind::Value, "path"),
                (TokenKind::Method, ":"),
                (TokenKind::Value, r"C\:temp"),
                (TokenKind::Split, " "),
                (TokenKind::Value, r"vers\*on"),
            ]
        );
    }

    #[test]
    fn test_wildcard_after_colon_is_value() {
        assert_eq!(
            lex("host:*web"),
            vec![
                (TokenKind::Value, "host"),
                (TokenKind::Method, ":"),
                (TokenKind::Value, "*web"),
            ]
        );
    }

    #[test]
    fn test_spans_cover_input() {
        let input = "名字: 值 ";
        let mut end = 0;
        for lexeme in Lexer::new(input) {
            assert_eq!(lexeme.span.start, end);
            end = lexeme.span.end;
        }
        assert_eq!(end, input.len());
    }
}
