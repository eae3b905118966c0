//! 변경 레코드 데이터 구조 정의
//!
//! 정답(LogMiner)과 후보(CDC 커넥터) 양쪽 모두 이 구조로 정규화된 뒤 비교된다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// DML 연산 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }

    /// LogMiner OPERATION 컬럼 값 변환 (DML 외에는 None)
    pub fn from_logminer(op: &str) -> Option<Self> {
        match op {
            "INSERT" => Some(Operation::Insert),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// 후보 payload의 op 코드 변환 (c/u/d 외에는 None)
    pub fn from_candidate_code(code: &str) -> Option<Self> {
        match code {
            "c" => Some(Operation::Insert),
            "u" => Some(Operation::Update),
            "d" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// after 이미지를 비교해야 하는 연산인지
    pub fn has_after(&self) -> bool {
        matches!(self, Operation::Insert | Operation::Update)
    }

    /// before 이미지를 비교해야 하는 연산인지
    pub fn has_before(&self) -> bool {
        matches!(self, Operation::Update | Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 컬럼 값: 텍스트 또는 NULL
///
/// 숫자/날짜 해석은 비교 시점에만 한다. 파싱 결과에는 원문 텍스트만 남긴다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    Text(String),
    Null,
}

impl ScalarValue {
    pub fn text(s: impl Into<String>) -> Self {
        ScalarValue::Text(s.into())
    }

    /// 임의의 JSON 값을 텍스트|NULL 로 정규화
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ScalarValue::Null,
            serde_json::Value::String(s) => ScalarValue::Text(s.clone()),
            serde_json::Value::Number(n) => ScalarValue::Text(n.to_string()),
            serde_json::Value::Bool(b) => ScalarValue::Text(b.to_string()),
            other => ScalarValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Text(s) => serde_json::Value::String(s.clone()),
            ScalarValue::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Text(s) => write!(f, "{:?}", s),
            ScalarValue::Null => f.write_str("NULL"),
        }
    }
}

/// 컬럼명 → 값 (키 정렬 순서 유지)
pub type ColumnMap = BTreeMap<String, ScalarValue>;

/// JSON 객체를 컬럼 맵으로 정규화 (객체가 아니면 빈 맵)
pub fn columns_from_json(value: Option<&serde_json::Value>) -> ColumnMap {
    match value {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), ScalarValue::from_json(v)))
            .collect(),
        _ => ColumnMap::new(),
    }
}

fn columns_to_json(columns: &ColumnMap) -> serde_json::Value {
    serde_json::Value::Object(
        columns
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// 파싱된 변경 레코드
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub scn: String,
    pub op: Operation,
    pub owner: String,
    pub table: String,
    pub xid: String,
    pub before: ColumnMap,
    pub after: ColumnMap,
    /// 정답 쪽에서 표현할 수 없어 제외된 컬럼 (LOB 캡처 한도 초과)
    pub omitted: BTreeSet<String>,
    /// after 값이 따옴표 없는 EMPTY_CLOB()/EMPTY_BLOB() 호출인 컬럼 (LOB 쓰기 대기)
    pub pending_lobs: BTreeSet<String>,
}

/// 비교 단위. 값이 이미 텍스트|NULL 이므로 파싱 레코드와 같은 형태다.
pub type NormalizedRecord = ParsedRecord;

impl ParsedRecord {
    pub fn new(
        scn: impl Into<String>,
        op: Operation,
        owner: impl Into<String>,
        table: impl Into<String>,
        xid: impl Into<String>,
    ) -> Self {
        ParsedRecord {
            scn: scn.into(),
            op,
            owner: owner.into(),
            table: table.into(),
            xid: xid.into(),
            before: ColumnMap::new(),
            after: ColumnMap::new(),
            omitted: BTreeSet::new(),
            pending_lobs: BTreeSet::new(),
        }
    }

    /// 정렬용 SCN 숫자값 (해석 불가 시 0)
    pub fn scn_number(&self) -> u64 {
        self.scn.trim().parse().unwrap_or(0)
    }

    /// 같은 트랜잭션, 같은 테이블인지
    pub fn same_target(&self, other: &ParsedRecord) -> bool {
        self.xid == other.xid && self.owner == other.owner && self.table == other.table
    }

    /// 중간 JSON 형식 (키 정렬)
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "scn": self.scn,
            "op": self.op.as_str(),
            "owner": self.owner,
            "table": self.table,
            "xid": self.xid,
            "before": columns_to_json(&self.before),
            "after": columns_to_json(&self.after),
        });
        if !self.omitted.is_empty() {
            obj["omitted"] = serde_json::json!(self.omitted);
        }
        if !self.pending_lobs.is_empty() {
            obj["pending_lobs"] = serde_json::json!(self.pending_lobs);
        }
        obj
    }
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} scn={} xid={}",
            self.op, self.owner, self.table, self.scn, self.xid
        )
    }
}
