//! 후보 CDC 커넥터 출력 파싱
//!
//! 한 줄 = 트랜잭션 래퍼 `{"c_scn"|"scn", "xid", "payload": [...]}`.
//! payload 항목 중 c/u/d 만 레코드로 펼치고 begin/commit/checkpoint 등은 버린다.

use crate::error::{Result, VerifyError};
use crate::events::{columns_from_json, NormalizedRecord, Operation, ParsedRecord};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// 커넥터 출력 래퍼
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateEvent {
    #[serde(default)]
    pub c_scn: Option<serde_json::Value>,
    #[serde(default)]
    pub scn: Option<serde_json::Value>,
    #[serde(default)]
    pub xid: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: Vec<CandidatePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub op: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: CandidateSchema,
    #[serde(default)]
    pub before: Option<serde_json::Value>,
    #[serde(default)]
    pub after: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateSchema {
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table: String,
}

/// JSON null 을 필드 기본값으로
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn json_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl CandidateEvent {
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| VerifyError::MalformedJson {
            line: line_no,
            source,
        })
    }

    /// 커밋 SCN (`c_scn` 우선)
    pub fn commit_scn(&self) -> String {
        json_text(self.c_scn.as_ref().or(self.scn.as_ref()))
    }

    /// DML payload 를 정규화 레코드로 펼친다
    pub fn flatten(&self) -> Vec<NormalizedRecord> {
        let scn = self.commit_scn();
        let xid = json_text(self.xid.as_ref());

        self.payload
            .iter()
            .filter_map(|entry| {
                let Some(op) = Operation::from_candidate_code(&entry.op) else {
                    debug!("Dropping non-DML payload entry op={:?} scn={}", entry.op, scn);
                    return None;
                };
                let mut record = ParsedRecord::new(
                    &scn,
                    op,
                    &entry.schema.owner,
                    &entry.schema.table,
                    &xid,
                );
                record.before = columns_from_json(entry.before.as_ref());
                record.after = columns_from_json(entry.after.as_ref());
                Some(record)
            })
            .collect()
    }
}

/// JSON 라인 텍스트 전체를 정규화 레코드로
pub fn parse_candidate_text(text: &str) -> Result<Vec<NormalizedRecord>> {
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = CandidateEvent::parse(line, i + 1)?;
        records.extend(event.flatten());
    }
    Ok(records)
}

/// 후보 출력 파일 로드
pub fn load_candidate(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let text = fs::read_to_string(path).map_err(|e| VerifyError::io(path, e))?;
    let records = parse_candidate_text(&text)?;
    info!(
        "Loaded {} candidate records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ScalarValue;

    #[test]
    fn test_flatten_drops_transaction_markers() {
        let text = r#"
{"scn":"90","xid":"0x0001.002.00000003","payload":[{"op":"begin"}]}
{"c_scn":100,"scn":"95","xid":"0x0001.002.00000003","payload":[{"op":"c","schema":{"owner":"SCOTT","table":"EMP"},"after":{"ID":1,"NAME":"Bob","SAL":null}},{"op":"commit"}]}
{"c_scn":"101","xid":"0x0001.002.00000004","payload":[{"op":"u","schema":{"owner":"SCOTT","table":"EMP"},"before":{"ID":1},"after":{"ID":1,"NAME":"Ann"}},{"op":"d","schema":{"owner":"SCOTT","table":"EMP"},"before":{"ID":2}}]}
"#;
        let records = parse_candidate_text(text).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].op, Operation::Insert);
        assert_eq!(records[0].scn, "100");
        assert_eq!(records[0].table, "EMP");
        assert_eq!(records[0].after["ID"], ScalarValue::text("1"));
        assert_eq!(records[0].after["SAL"], ScalarValue::Null);
        assert!(records[0].before.is_empty());

        assert_eq!(records[1].op, Operation::Update);
        assert_eq!(records[1].xid, "0x0001.002.00000004");
        assert_eq!(records[2].op, Operation::Delete);
        assert!(records[2].after.is_empty());
    }

    #[test]
    fn test_scn_fallback() {
        let event = CandidateEvent::parse(r#"{"scn":42,"payload":[]}"#, 1).unwrap();
        assert_eq!(event.commit_scn(), "42");
        assert!(event.flatten().is_empty());
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let err = parse_candidate_text("{\"scn\":1}\n[oops").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedJson { line: 2, .. }));
    }

    #[test]
    fn test_null_fields_tolerated() {
        let text = r#"{"c_scn":"5","xid":null,"payload":[{"op":"commit","schema":null},{"op":"c","schema":{"owner":null,"table":"T"},"after":{"A":"1"}}]}
{"scn":"6","payload":null}
"#;
        let records = parse_candidate_text(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner, "");
        assert_eq!(records[0].table, "T");
        assert_eq!(records[0].xid, "");
    }
}
