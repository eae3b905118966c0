//! LOB 레코드 병합
//!
//! Oracle은 LOB 쓰기 하나를 여러 redo 레코드로 나눈다. 예:
//! `insert ... values ('1', EMPTY_BLOB())` 다음에 같은 트랜잭션의
//! `update ... set "DATA" = HEXTORAW('...')`. 이를 논리 레코드 하나로 접는다.

use crate::events::ParsedRecord;
use tracing::debug;

/// 빈 LOB 자리표시자
const LOB_PLACEHOLDERS: &[&str] = &["EMPTY_CLOB()", "EMPTY_BLOB()"];

/// 따옴표 없는 토큰 텍스트가 LOB 자리표시자 호출인지 (대소문자 무시)
pub fn is_lob_placeholder(token: &str) -> bool {
    let token = token.trim();
    LOB_PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(token))
}

/// 병합 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldReason {
    /// 자리표시자 뒤에 같은 트랜잭션/테이블의 UPDATE
    LobWrite,
    /// 같은 SCN 의 UPDATE 가 여러 redo 항목으로 나뉨
    SplitUpdate,
}

fn fold_reason(current: &ParsedRecord, next: &ParsedRecord) -> Option<FoldReason> {
    use crate::events::Operation::Update;

    if !current.same_target(next) || next.op != Update {
        return None;
    }
    if !current.pending_lobs.is_empty() {
        return Some(FoldReason::LobWrite);
    }
    if current.op == Update && current.scn == next.scn {
        return Some(FoldReason::SplitUpdate);
    }
    None
}

/// LOB 병합기
pub struct LobMerger;

impl LobMerger {
    /// 시간순 레코드를 받아 병합된 새 목록을 돌려준다
    pub fn merge(records: Vec<ParsedRecord>) -> Vec<ParsedRecord> {
        let input_len = records.len();
        let mut merged = Vec::with_capacity(input_len);
        let mut iter = records.into_iter().peekable();

        while let Some(mut current) = iter.next() {
            while let Some(reason) = iter.peek().and_then(|next| fold_reason(&current, next)) {
                let Some(next) = iter.next() else { break };
                debug!(
                    "Folding {:?} scn={} into {} ({} columns)",
                    reason,
                    next.scn,
                    current,
                    next.after.len()
                );
                for column in next.after.keys() {
                    current.pending_lobs.remove(column);
                }
                current.pending_lobs.extend(next.pending_lobs);
                current.after.extend(next.after);
            }

            for column in std::mem::take(&mut current.pending_lobs) {
                debug!("Dropping unfilled LOB column {} from {}", column, current);
                current.after.remove(&column);
                current.omitted.insert(column);
            }

            merged.push(current);
        }

        if merged.len() != input_len {
            debug!("LOB merge: {} records -> {}", input_len, merged.len());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Operation, ScalarValue};
    use crate::logminer::{convert, parse_lines};

    // 자리표시자 글자는 따옴표 없는 호출로 적힌 것으로 간주
    fn record(scn: &str, op: Operation, xid: &str, table: &str, after: &[(&str, &str)]) -> ParsedRecord {
        let mut rec = ParsedRecord::new(scn, op, "S", table, xid);
        for (k, v) in after {
            if is_lob_placeholder(v) {
                rec.pending_lobs.insert(k.to_string());
            }
            rec.after.insert(k.to_string(), ScalarValue::text(*v));
        }
        rec
    }

    #[test]
    fn test_insert_with_blob_placeholder_merges() {
        let records = vec![
            record("10", Operation::Insert, "x1", "DOCS", &[("ID", "1"), ("DATA", "EMPTY_BLOB()")]),
            record("11", Operation::Update, "x1", "DOCS", &[("DATA", "DEADBEEF")]),
        ];
        let merged = LobMerger::merge(records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].op, Operation::Insert);
        assert_eq!(merged[0].after["DATA"], ScalarValue::text("DEADBEEF"));
        assert_eq!(merged[0].after["ID"], ScalarValue::text("1"));
        assert!(merged[0].omitted.is_empty());
    }

    #[test]
    fn test_two_placeholders_fold_two_updates() {
        let records = vec![
            record("10", Operation::Insert, "x1", "DOCS", &[("A", "empty_clob()"), ("B", "EMPTY_BLOB()")]),
            record("11", Operation::Update, "x1", "DOCS", &[("A", "text")]),
            record("12", Operation::Update, "x1", "DOCS", &[("B", "00FF")]),
            record("13", Operation::Update, "x1", "DOCS", &[("C", "later")]),
        ];
        let merged = LobMerger::merge(records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].after["A"], ScalarValue::text("text"));
        assert_eq!(merged[0].after["B"], ScalarValue::text("00FF"));
        assert_eq!(merged[1].scn, "13");
    }

    #[test]
    fn test_unfilled_placeholder_dropped() {
        let records = vec![
            record("10", Operation::Insert, "x1", "DOCS", &[("ID", "1"), ("DATA", "EMPTY_CLOB()")]),
            record("11", Operation::Insert, "x1", "DOCS", &[("ID", "2")]),
        ];
        let merged = LobMerger::merge(records);
        assert_eq!(merged.len(), 2);
        assert!(!merged[0].after.contains_key("DATA"));
        assert!(merged[0].omitted.contains("DATA"));
    }

    #[test]
    fn test_different_transaction_not_merged() {
        let records = vec![
            record("10", Operation::Insert, "x1", "DOCS", &[("DATA", "EMPTY_BLOB()")]),
            record("11", Operation::Update, "x2", "DOCS", &[("DATA", "AA")]),
        ];
        let merged = LobMerger::merge(records);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].after.is_empty());
    }

    #[test]
    fn test_split_update_same_scn() {
        let records = vec![
            record("20", Operation::Update, "x1", "T", &[("A", "1")]),
            record("20", Operation::Update, "x1", "T", &[("B", "2")]),
            record("21", Operation::Update, "x1", "T", &[("C", "3")]),
        ];
        let merged = LobMerger::merge(records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].after.len(), 2);
        assert_eq!(merged[1].after["C"], ScalarValue::text("3"));
    }

    #[test]
    fn test_same_scn_different_table_not_merged() {
        let records = vec![
            record("20", Operation::Update, "x1", "T", &[("A", "1")]),
            record("20", Operation::Update, "x1", "U", &[("B", "2")]),
        ];
        assert_eq!(LobMerger::merge(records).len(), 2);
    }

    #[test]
    fn test_quoted_placeholder_text_is_plain_value() {
        let lines = parse_lines(concat!(
            "10|INSERT|S|DOCS|x1|insert into \"S\".\"DOCS\"(\"ID\",\"C\") values ('1','EMPTY_CLOB()');|\n",
            "11|UPDATE|S|DOCS|x1|update \"S\".\"DOCS\" set \"ID\" = '2' where \"ID\" = '1';|\n",
        ))
        .unwrap();
        let merged = LobMerger::merge(convert(&lines).records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].after["C"], ScalarValue::text("EMPTY_CLOB()"));
        assert!(merged[0].omitted.is_empty());
    }

    #[test]
    fn test_bare_placeholder_from_redo_text_merges() {
        let lines = parse_lines(concat!(
            "10|INSERT|S|DOCS|x1|insert into \"S\".\"DOCS\"(\"ID\",\"C\") values ('1',EMPTY_CLOB());|\n",
            "11|UPDATE|S|DOCS|x1|update \"S\".\"DOCS\" set \"C\" = 'body' where \"ID\" = '1';|\n",
        ))
        .unwrap();
        let merged = LobMerger::merge(convert(&lines).records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].after["C"], ScalarValue::text("body"));
        assert!(merged[0].pending_lobs.is_empty());
    }
}
