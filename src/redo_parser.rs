//! SQL_REDO 문장 파서
//!
//! LogMiner가 재구성한 DML 문장에서 before/after 컬럼 이미지를 복원한다.
//! 일반 SQL 파서가 아니며 LogMiner가 출력하는 형태만 다룬다:
//!
//! ```text
//! insert into "OWNER"."TABLE"("C1","C2") values ('v1',NULL);
//! update "OWNER"."TABLE" set "C1" = 'v1', "C2" = NULL where "C3" = '5' and "C4" IS NULL and ROWID = 'AAA...';
//! delete from "OWNER"."TABLE" where "C1" = 'v1' and ROWID = 'AAA...';
//! ```

use crate::error::RedoParseError;
use crate::events::{ColumnMap, Operation, ScalarValue};
use crate::extractor::ValueExtractor;
use crate::scanner::{find_top_level_keyword, Cursor};
use std::collections::BTreeSet;

type ParseResult<T> = std::result::Result<T, RedoParseError>;

/// 문장 하나에서 복원한 컬럼 이미지
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowImage {
    pub owner: String,
    pub table: String,
    pub before: ColumnMap,
    pub after: ColumnMap,
    /// after 값이 LOB 자리표시자 호출인 컬럼
    pub pending_lobs: BTreeSet<String>,
}

/// SQL_REDO 파서
pub struct SqlRedoParser;

impl SqlRedoParser {
    /// 연산 타입에 맞는 문장 형태로 파싱
    pub fn parse(op: Operation, sql: &str) -> ParseResult<RowImage> {
        match op {
            Operation::Insert => Self::parse_insert(sql),
            Operation::Update => Self::parse_update(sql),
            Operation::Delete => Self::parse_delete(sql),
        }
    }

    pub fn parse_insert(sql: &str) -> ParseResult<RowImage> {
        let mut cursor = Cursor::new(strip_terminator(sql));
        cursor.expect_keyword("insert")?;
        cursor.expect_keyword("into")?;
        let (owner, table) = read_table_name(&mut cursor)?;

        cursor.skip_whitespace();
        let column_list = cursor.skip_balanced()?;
        let columns = parse_column_list(column_list)?;

        cursor.expect_keyword("values")?;
        cursor.skip_whitespace();
        let value_list = cursor.skip_balanced()?;
        cursor.skip_whitespace();
        if !cursor.is_eof() {
            return Err(RedoParseError::TrailingInput(cursor.pos()));
        }

        let literals = ValueExtractor::extract_literals(value_list);
        if columns.len() != literals.len() {
            return Err(RedoParseError::CountMismatch {
                columns: columns.len(),
                values: literals.len(),
            });
        }

        let mut image = RowImage {
            owner,
            table,
            ..Default::default()
        };
        for (column, literal) in columns.into_iter().zip(literals) {
            if literal.is_lob_placeholder() {
                image.pending_lobs.insert(column.clone());
            }
            image.after.insert(column, literal.value);
        }
        Ok(image)
    }

    pub fn parse_update(sql: &str) -> ParseResult<RowImage> {
        let mut cursor = Cursor::new(strip_terminator(sql));
        cursor.expect_keyword("update")?;
        let (owner, table) = read_table_name(&mut cursor)?;
        cursor.expect_keyword("set")?;

        let rest = cursor.rest();
        let where_pos = find_top_level_keyword(rest, "where", true)
            .first()
            .copied()
            .ok_or(RedoParseError::MissingClause("where"))?;

        let set_clause = &rest[..where_pos];
        let where_clause = &rest[where_pos + "where".len()..];

        let before = parse_predicates(where_clause)?;
        let (after, pending_lobs) = parse_assignments(set_clause)?;
        Ok(RowImage {
            owner,
            table,
            before,
            after,
            pending_lobs,
        })
    }

    pub fn parse_delete(sql: &str) -> ParseResult<RowImage> {
        let mut cursor = Cursor::new(strip_terminator(sql));
        cursor.expect_keyword("delete")?;
        cursor.expect_keyword("from")?;
        let (owner, table) = read_table_name(&mut cursor)?;
        cursor.expect_keyword("where")?;

        Ok(RowImage {
            owner,
            table,
            before: parse_predicates(cursor.rest())?,
            ..Default::default()
        })
    }
}

fn strip_terminator(sql: &str) -> &str {
    let sql = sql.trim();
    sql.strip_suffix(';').unwrap_or(sql).trim_end()
}

/// "OWNER"."TABLE" 또는 "TABLE"
fn read_table_name(cursor: &mut Cursor<'_>) -> ParseResult<(String, String)> {
    let first = cursor.read_quoted_ident()?;
    if cursor.peek() == Some('.') {
        cursor.bump();
        let second = cursor.read_quoted_ident()?;
        Ok((first.to_string(), second.to_string()))
    } else {
        Ok((String::new(), first.to_string()))
    }
}

/// "C1","C2",... 컬럼 목록
fn parse_column_list(list: &str) -> ParseResult<Vec<String>> {
    let mut cursor = Cursor::new(list);
    let mut columns = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.is_eof() {
            break;
        }
        columns.push(cursor.read_quoted_ident()?.to_string());
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(',') => {
                cursor.bump();
            }
            None => break,
            Some(_) => {
                return Err(RedoParseError::Expected {
                    pos: cursor.pos(),
                    expected: ",",
                })
            }
        }
    }
    Ok(columns)
}

/// SET 절: "C1" = v1, "C2" = v2, ...
///
/// 값의 끝은 문자열/괄호 밖의 쉼표 뒤에 다음 따옴표 식별자가 오는 위치다.
fn parse_assignments(clause: &str) -> ParseResult<(ColumnMap, BTreeSet<String>)> {
    let mut cursor = Cursor::new(clause);
    let mut after = ColumnMap::new();
    let mut pending_lobs = BTreeSet::new();
    loop {
        cursor.skip_whitespace();
        if cursor.is_eof() {
            break;
        }
        let column = cursor.read_quoted_ident()?;
        cursor.expect_char('=', "=")?;

        let start = cursor.pos();
        let end = start + assignment_end(&clause[start..]);
        let literal = ValueExtractor::extract_single_literal(&clause[start..end]);
        if literal.is_lob_placeholder() {
            pending_lobs.insert(column.to_string());
        }
        after.insert(column.to_string(), literal.value);

        while cursor.pos() < end {
            cursor.bump();
        }
        if cursor.peek() == Some(',') {
            cursor.bump();
        }
    }
    if after.is_empty() {
        return Err(RedoParseError::MissingClause("set"));
    }
    Ok((after, pending_lobs))
}

/// 값 표현식이 끝나는 상대 위치
fn assignment_end(src: &str) -> usize {
    let mut cursor = Cursor::new(src);
    let mut depth = 0usize;
    while let Some(c) = cursor.peek() {
        match c {
            '\'' => {
                cursor.read_quoted_string();
                continue;
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let mut lookahead = cursor.clone();
                lookahead.bump();
                lookahead.skip_whitespace();
                if lookahead.peek() == Some('"') {
                    return cursor.pos();
                }
            }
            _ => {}
        }
        cursor.bump();
    }
    src.len()
}

/// WHERE 절: "C1" = v1 and "C2" IS NULL and ROWID = '...'
///
/// 따옴표 없는 의사 컬럼(ROWID 등)은 테이블 컬럼이 아니므로 버린다.
fn parse_predicates(clause: &str) -> ParseResult<ColumnMap> {
    let mut before = ColumnMap::new();
    if clause.trim().is_empty() {
        return Ok(before);
    }

    let mut bounds = vec![0];
    for pos in find_top_level_keyword(clause, "and", false) {
        bounds.push(pos);
        bounds.push(pos + "and".len());
    }
    bounds.push(clause.len());

    for segment in bounds.chunks(2).map(|b| &clause[b[0]..b[1]]) {
        let mut cursor = Cursor::new(segment);
        cursor.skip_whitespace();
        let column = if cursor.peek() == Some('"') {
            Some(cursor.read_quoted_ident()?)
        } else if cursor.read_bare_ident().is_empty() {
            return Err(RedoParseError::Expected {
                pos: cursor.pos(),
                expected: "column name",
            });
        } else {
            None
        };

        cursor.skip_whitespace();
        let value = if cursor.at_keyword("IS") {
            cursor.expect_keyword("IS")?;
            cursor.expect_keyword("NULL")?;
            cursor.skip_whitespace();
            if !cursor.is_eof() {
                return Err(RedoParseError::TrailingInput(cursor.pos()));
            }
            ScalarValue::Null
        } else {
            cursor.expect_char('=', "=")?;
            ValueExtractor::extract_single(cursor.rest())
        };

        if let Some(column) = column {
            before.insert(column.to_string(), value);
        }
    }
    Ok(before)
}
