//! SQL 리터럴 값 목록 추출기
//!
//! `values (...)` 괄호 내부 문자열을 값 단위로 잘라 텍스트|NULL 로 만든다.
//! 지원 형태:
//! - 작은따옴표 문자열 ('' 이스케이프)
//! - NULL (대소문자 무시)
//! - TO_DATE / TO_TIMESTAMP / TO_TIMESTAMP_TZ / HEXTORAW / UNISTR 래핑 리터럴
//! - 따옴표 없는 토큰 (숫자, EMPTY_BLOB() 같은 함수 호출)

use crate::events::ScalarValue;
use crate::lob;
use crate::scanner::Cursor;

/// 값이 SQL 안에 적힌 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// 작은따옴표 문자열
    Quoted,
    Null,
    /// TO_DATE 등 리터럴 함수로 감싼 값
    Wrapped,
    /// 따옴표 없는 토큰 (숫자, 함수 호출)
    Bare,
}

/// 추출된 값과 원래 형태
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub value: ScalarValue,
    pub kind: LiteralKind,
}

impl Literal {
    fn new(value: ScalarValue, kind: LiteralKind) -> Self {
        Literal { value, kind }
    }

    /// 따옴표 없이 적힌 EMPTY_CLOB()/EMPTY_BLOB() 호출인지.
    /// 같은 글자의 문자열 값은 자리표시자가 아니다.
    pub fn is_lob_placeholder(&self) -> bool {
        match (&self.value, self.kind) {
            (ScalarValue::Text(s), LiteralKind::Bare) => lob::is_lob_placeholder(s),
            _ => false,
        }
    }
}

/// 첫 번째 따옴표 인자만 값으로 취하는 리터럴 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralFunction {
    ToDate,
    ToTimestamp,
    ToTimestampTz,
    HexToRaw,
    Unistr,
}

const LITERAL_FUNCTIONS: &[(&str, LiteralFunction)] = &[
    ("TO_DATE", LiteralFunction::ToDate),
    ("TO_TIMESTAMP", LiteralFunction::ToTimestamp),
    ("TO_TIMESTAMP_TZ", LiteralFunction::ToTimestampTz),
    ("HEXTORAW", LiteralFunction::HexToRaw),
    ("UNISTR", LiteralFunction::Unistr),
];

impl LiteralFunction {
    fn lookup(name: &str) -> Option<Self> {
        LITERAL_FUNCTIONS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }
}

/// 값 목록 추출기
pub struct ValueExtractor;

impl ValueExtractor {
    /// 쉼표로 구분된 리터럴 목록을 순서대로 추출
    pub fn extract(list: &str) -> Vec<ScalarValue> {
        Self::extract_literals(list)
            .into_iter()
            .map(|literal| literal.value)
            .collect()
    }

    /// `extract` 와 같지만 각 값이 적힌 형태도 함께 돌려준다
    pub fn extract_literals(list: &str) -> Vec<Literal> {
        let mut cursor = Cursor::new(list);
        let mut values = Vec::new();

        while let Some(c) = cursor.peek() {
            if c == ',' || c.is_whitespace() {
                cursor.bump();
                continue;
            }
            let start = cursor.pos();
            if let Some(value) = Self::read_value(&mut cursor) {
                values.push(value);
            }
            if cursor.pos() == start {
                // 어떤 규칙도 진행하지 못한 경우 한 글자 건너뜀
                cursor.bump();
            }
        }

        values
    }

    /// SET/WHERE 절의 단일 값 표현식 평가.
    /// 값이 정확히 하나로 해석되지 않으면 원문을 그대로 텍스트로 취한다.
    pub fn extract_single(expr: &str) -> ScalarValue {
        Self::extract_single_literal(expr).value
    }

    pub fn extract_single_literal(expr: &str) -> Literal {
        let expr = expr.trim().trim_end_matches(';').trim_end();
        let mut literals = Self::extract_literals(expr);
        if literals.len() == 1 {
            literals.remove(0)
        } else {
            Literal::new(ScalarValue::text(expr), LiteralKind::Bare)
        }
    }

    /// 현재 위치의 값 하나를 읽는다
    fn read_value(cursor: &mut Cursor<'_>) -> Option<Literal> {
        if cursor.peek() == Some('\'') {
            let text = cursor.read_quoted_string();
            return Some(Literal::new(ScalarValue::Text(text), LiteralKind::Quoted));
        }
        if cursor.at_keyword("NULL") {
            cursor.read_bare_ident();
            return Some(Literal::new(ScalarValue::Null, LiteralKind::Null));
        }

        let mut lookahead = cursor.clone();
        let name = lookahead.read_bare_ident();
        if !name.is_empty() {
            lookahead.skip_whitespace();
            if lookahead.peek() == Some('(') {
                if let Some(func) = LiteralFunction::lookup(name) {
                    *cursor = lookahead;
                    let value = Self::read_literal_function(cursor, func);
                    return Some(Literal::new(value, LiteralKind::Wrapped));
                }
            }
        }

        Self::read_bare_token(cursor).map(|value| Literal::new(value, LiteralKind::Bare))
    }

    /// 커서는 함수 인자 여는 괄호 위에 있다
    fn read_literal_function(cursor: &mut Cursor<'_>, func: LiteralFunction) -> ScalarValue {
        let mut args = cursor.clone();
        args.bump();
        args.skip_whitespace();
        let first = if args.peek() == Some('\'') {
            Some(args.read_quoted_string())
        } else {
            None
        };

        let inner = match cursor.skip_balanced() {
            Ok(inner) => inner,
            Err(_) => {
                // 닫는 괄호가 없으면 남은 입력 전체를 소비
                let rest = cursor.rest();
                while cursor.bump().is_some() {}
                rest
            }
        };

        match (first, func) {
            (Some(s), LiteralFunction::Unistr) => ScalarValue::Text(decode_unistr(&s)),
            (Some(s), _) => ScalarValue::Text(s),
            (None, _) => ScalarValue::text(inner.trim()),
        }
    }

    /// 쉼표나 공백까지의 토큰. 토큰 안의 괄호는 깊이를 추적해 통째로 포함한다.
    fn read_bare_token(cursor: &mut Cursor<'_>) -> Option<ScalarValue> {
        let rest = cursor.rest();
        let start = cursor.pos();
        while let Some(c) = cursor.peek() {
            if c == ',' || c.is_whitespace() {
                break;
            }
            if c == '(' {
                if cursor.skip_balanced().is_err() {
                    while cursor.bump().is_some() {}
                }
                continue;
            }
            if c == '\'' && cursor.pos() > start {
                cursor.read_quoted_string();
                continue;
            }
            if c == ')' || c == '\'' {
                break;
            }
            cursor.bump();
        }
        let len = cursor.pos() - start;
        if len == 0 {
            None
        } else {
            Some(ScalarValue::text(&rest[..len]))
        }
    }
}

/// UNISTR 인자의 \XXXX (UTF-16) 이스케이프 복원. `\\` 는 역슬래시 하나.
fn decode_unistr(s: &str) -> String {
    let mut units: Vec<u16> = Vec::new();
    let mut out = String::new();
    let mut chars = s.chars().peekable();

    let flush = |units: &mut Vec<u16>, out: &mut String| {
        if !units.is_empty() {
            out.extend(char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or('\u{FFFD}')));
        }
    };

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush(&mut units, &mut out);
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'\\') {
            chars.next();
            flush(&mut units, &mut out);
            out.push('\\');
            continue;
        }
        let hex: String = chars.clone().take(4).collect();
        match u16::from_str_radix(&hex, 16) {
            Ok(unit) if hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()) => {
                units.push(unit);
                for _ in 0..4 {
                    chars.next();
                }
            }
            _ => {
                flush(&mut units, &mut out);
                out.push('\\');
            }
        }
    }
    flush(&mut units, &mut out);
    out
}
