//! SQL 재구성 문자열용 문자 커서
//!
//! 정규식 엔진 대신 명시적인 위치 이동으로 따옴표, 괄호 깊이, 키워드를 다룬다.
//! 위치는 항상 UTF-8 문자 경계의 바이트 오프셋이다.

use crate::error::RedoParseError;

/// 문자열 리터럴 스캔 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    /// 따옴표 밖
    Outside,
    /// 작은따옴표 문자열 내부
    InString,
    /// 문자열 내부에서 따옴표 하나를 막 만난 상태 ('' 이스케이프 여부 미정)
    QuoteSeen,
    /// 큰따옴표 식별자 내부
    InIdent,
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// 현재 위치에서 키워드가 단어 단위로 시작하는지 (대소문자 무시)
    pub fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        match rest.get(..keyword.len()) {
            Some(head) if head.eq_ignore_ascii_case(keyword) => {
                !matches!(rest[keyword.len()..].chars().next(), Some(c) if is_ident_char(c))
            }
            _ => false,
        }
    }

    /// 키워드를 소비 (앞쪽 공백 허용)
    pub fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), RedoParseError> {
        self.skip_whitespace();
        if !self.at_keyword(keyword) {
            return Err(RedoParseError::Expected {
                pos: self.pos,
                expected: keyword,
            });
        }
        self.pos += keyword.len();
        Ok(())
    }

    /// 단일 문자를 소비 (앞쪽 공백 허용)
    pub fn expect_char(&mut self, c: char, expected: &'static str) -> Result<(), RedoParseError> {
        self.skip_whitespace();
        if self.peek() != Some(c) {
            return Err(RedoParseError::Expected {
                pos: self.pos,
                expected,
            });
        }
        self.bump();
        Ok(())
    }

    /// "IDENT" 형태의 큰따옴표 식별자를 읽는다
    pub fn read_quoted_ident(&mut self) -> Result<&'a str, RedoParseError> {
        self.expect_char('"', "quoted identifier")?;
        let start = self.pos;
        while let Some(c) = self.bump() {
            if c == '"' {
                return Ok(&self.src[start..self.pos - 1]);
            }
        }
        Err(RedoParseError::Unterminated)
    }

    /// 따옴표 없는 식별자 (ROWID 등)
    pub fn read_bare_ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// 작은따옴표 문자열 리터럴을 읽고 '' 를 ' 로 복원한다.
    /// 커서는 여는 따옴표 위에 있어야 한다. 닫는 따옴표가 없으면 끝까지 읽는다.
    pub fn read_quoted_string(&mut self) -> String {
        let mut out = String::new();
        let mut state = QuoteState::Outside;
        while let Some(c) = self.peek() {
            match (state, c) {
                (QuoteState::Outside, '\'') => state = QuoteState::InString,
                (QuoteState::Outside, _) => return out,
                (QuoteState::InString, '\'') => state = QuoteState::QuoteSeen,
                (QuoteState::InString, c) => out.push(c),
                (QuoteState::QuoteSeen, '\'') => {
                    out.push('\'');
                    state = QuoteState::InString;
                }
                (QuoteState::QuoteSeen, _) | (QuoteState::InIdent, _) => return out,
            }
            self.bump();
        }
        out
    }

    /// 여는 괄호 위에서 호출하여 대응하는 닫는 괄호 바로 뒤로 이동한다.
    /// 따옴표 안의 괄호는 무시한다. 반환값은 괄호 내부 문자열.
    pub fn skip_balanced(&mut self) -> Result<&'a str, RedoParseError> {
        if self.peek() != Some('(') {
            return Err(RedoParseError::Expected {
                pos: self.pos,
                expected: "(",
            });
        }
        let start = self.pos;
        let mut depth = 0usize;
        let mut state = QuoteState::Outside;
        while let Some(c) = self.bump() {
            if state == QuoteState::QuoteSeen {
                if c == '\'' {
                    state = QuoteState::InString;
                    continue;
                }
                state = QuoteState::Outside;
            }
            match (state, c) {
                (QuoteState::Outside, '\'') => state = QuoteState::InString,
                (QuoteState::Outside, '"') => state = QuoteState::InIdent,
                (QuoteState::Outside, '(') => depth += 1,
                (QuoteState::Outside, ')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.src[start + 1..self.pos - 1]);
                    }
                }
                (QuoteState::InString, '\'') => state = QuoteState::QuoteSeen,
                (QuoteState::InIdent, '"') => state = QuoteState::Outside,
                _ => {}
            }
        }
        Err(RedoParseError::Unterminated)
    }
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '#'
}

/// 문자열 리터럴과 괄호 밖에서 `keyword` 가 처음 나타나는 바이트 위치들을 찾는다.
/// `first_only` 이면 첫 위치만 반환한다.
pub fn find_top_level_keyword(src: &str, keyword: &str, first_only: bool) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut cursor = Cursor::new(src);
    let mut depth = 0usize;
    let mut prev_ident = false;
    while let Some(c) = cursor.peek() {
        match c {
            '\'' => {
                cursor.read_quoted_string();
                prev_ident = false;
                continue;
            }
            '"' => {
                // 식별자 안의 키워드는 무시
                if cursor.read_quoted_ident().is_err() {
                    break;
                }
                prev_ident = false;
                continue;
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && !prev_ident && cursor.at_keyword(keyword) {
            hits.push(cursor.pos());
            if first_only {
                break;
            }
        }
        prev_ident = is_ident_char(c);
        cursor.bump();
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_string_escape() {
        let mut cursor = Cursor::new("'O''Brien', 'x'");
        assert_eq!(cursor.read_quoted_string(), "O'Brien");
        assert_eq!(cursor.peek(), Some(','));
    }

    #[test]
    fn test_quoted_string_with_comma_and_paren() {
        let mut cursor = Cursor::new("'a, (b'");
        assert_eq!(cursor.read_quoted_string(), "a, (b");
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_skip_balanced_nested() {
        let mut cursor = Cursor::new("(f(1, 2), ')') tail");
        assert_eq!(cursor.skip_balanced().unwrap(), "f(1, 2), ')'");
        assert_eq!(cursor.rest(), " tail");
    }

    #[test]
    fn test_skip_balanced_escaped_quote_before_paren() {
        let mut cursor = Cursor::new("('it''s')x");
        assert_eq!(cursor.skip_balanced().unwrap(), "'it''s'");
        assert_eq!(cursor.rest(), "x");
    }

    #[test]
    fn test_skip_balanced_quote_inside_identifier() {
        let mut cursor = Cursor::new(r#"("O'X","B") values"#);
        assert_eq!(cursor.skip_balanced().unwrap(), r#""O'X","B""#);
        assert_eq!(cursor.rest(), " values");

        let mut cursor = Cursor::new(r#"("A)B", 'x"y')z"#);
        assert_eq!(cursor.skip_balanced().unwrap(), r#""A)B", 'x"y'"#);
        assert_eq!(cursor.rest(), "z");
    }

    #[test]
    fn test_skip_balanced_unterminated() {
        let mut cursor = Cursor::new("(a, (b)");
        assert_eq!(cursor.skip_balanced(), Err(RedoParseError::Unterminated));
    }

    #[test]
    fn test_keyword_word_boundary() {
        assert!(Cursor::new("WHERE x").at_keyword("where"));
        assert!(!Cursor::new("whereas").at_keyword("where"));
    }

    #[test]
    fn test_find_top_level_keyword_skips_strings() {
        let src = r#""A" = 'x where y' where "B" = '1'"#;
        let hits = find_top_level_keyword(src, "where", true);
        assert_eq!(hits.len(), 1);
        assert!(src[hits[0]..].starts_with("where \"B\""));
    }

    #[test]
    fn test_find_top_level_and() {
        let src = r#""A" = 'rock and roll' and "B" IS NULL and "BRAND" = '2'"#;
        let hits = find_top_level_keyword(src, "and", false);
        assert_eq!(hits.len(), 2);
    }
}
