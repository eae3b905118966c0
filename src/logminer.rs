//! LogMiner 정답 데이터 입출력
//!
//! 입력: `SCN|OPERATION|SEG_OWNER|TABLE_NAME|XID|SQL_REDO|SQL_UNDO` 파이프 구분 라인
//! 출력: 키 정렬된 JSON 라인 (중간 형식)

use crate::error::{Result, VerifyError};
use crate::events::{columns_from_json, Operation, ParsedRecord};
use crate::redo_parser::SqlRedoParser;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

const FIELD_COUNT: usize = 7;

/// LogMiner 출력 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRedoLine {
    /// 입력 파일 내 라인 번호 (1부터)
    pub line_no: usize,
    pub scn: String,
    pub operation: String,
    pub owner: String,
    pub table: String,
    pub xid: String,
    pub sql_redo: String,
    pub sql_undo: String,
}

impl RawRedoLine {
    /// 파이프로 최대 7개 필드까지만 분리한다 (마지막 필드는 `|` 를 포함할 수 있음)
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, '|').collect();
        if fields.len() < FIELD_COUNT {
            return Err(VerifyError::MalformedRedoLine {
                line: line_no,
                reason: format!(
                    "expected {} pipe-delimited fields, found {}",
                    FIELD_COUNT,
                    fields.len()
                ),
            });
        }

        Ok(RawRedoLine {
            line_no,
            scn: fields[0].trim().to_string(),
            operation: fields[1].trim().to_string(),
            owner: fields[2].trim().to_string(),
            table: fields[3].trim().to_string(),
            xid: fields[4].trim().to_string(),
            sql_redo: fields[5].trim().to_string(),
            sql_undo: fields[6].trim().to_string(),
        })
    }
}

/// 주석/프롬프트/빈 줄 여부
pub fn is_comment_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with("--") || line.starts_with("SQL>")
}

/// 파싱할 수 없었던 SQL_REDO 문장 진단
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line_no: usize,
    pub scn: String,
    pub reason: String,
    pub sql_redo: String,
}

/// 정답 변환 결과
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    pub records: Vec<ParsedRecord>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// 텍스트 전체를 RawRedoLine 목록으로
pub fn parse_lines(text: &str) -> Result<Vec<RawRedoLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !is_comment_line(line))
        .map(|(i, line)| RawRedoLine::parse(line.trim_end_matches('\r'), i + 1))
        .collect()
}

/// 한 줄을 레코드로 변환. DML이 아니면 None.
/// SQL_REDO 파싱 실패 시 빈 이미지를 가진 레코드와 진단을 함께 돌려준다.
pub fn convert_line(line: &RawRedoLine) -> Option<(ParsedRecord, Option<ParseDiagnostic>)> {
    let Some(op) = Operation::from_logminer(&line.operation) else {
        debug!(
            "Skipping non-DML operation {} at line {}",
            line.operation, line.line_no
        );
        return None;
    };

    let mut record = ParsedRecord::new(&line.scn, op, &line.owner, &line.table, &line.xid);
    match SqlRedoParser::parse(op, &line.sql_redo) {
        Ok(image) => {
            record.before = image.before;
            record.after = image.after;
            record.pending_lobs = image.pending_lobs;
            Some((record, None))
        }
        Err(e) => {
            warn!(
                "Failed to parse SQL_REDO at line {} (scn {}): {}: {}",
                line.line_no, line.scn, e, line.sql_redo
            );
            let diagnostic = ParseDiagnostic {
                line_no: line.line_no,
                scn: line.scn.clone(),
                reason: e.to_string(),
                sql_redo: line.sql_redo.clone(),
            };
            Some((record, Some(diagnostic)))
        }
    }
}

/// 라인 목록 전체 변환 (입력 순서 유지)
pub fn convert(lines: &[RawRedoLine]) -> GroundTruth {
    let mut truth = GroundTruth::default();
    for line in lines {
        if let Some((record, diagnostic)) = convert_line(line) {
            truth.records.push(record);
            truth.diagnostics.extend(diagnostic);
        }
    }
    truth
}

/// 중간 JSON 라인 하나를 레코드로
pub fn record_from_json(line: &str, line_no: usize) -> Result<ParsedRecord> {
    let obj: serde_json::Value = serde_json::from_str(line)
        .map_err(|source| VerifyError::MalformedJson { line: line_no, source })?;

    let text_field = |key: &str| -> String {
        match obj.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    };

    let op_str = text_field("op");
    let op = Operation::from_logminer(&op_str).ok_or_else(|| VerifyError::MalformedRedoLine {
        line: line_no,
        reason: format!("unknown operation {:?}", op_str),
    })?;

    let mut record = ParsedRecord::new(
        text_field("scn"),
        op,
        text_field("owner"),
        text_field("table"),
        text_field("xid"),
    );
    record.before = columns_from_json(obj.get("before"));
    record.after = columns_from_json(obj.get("after"));
    record.omitted = column_set(obj.get("omitted"));
    record.pending_lobs = column_set(obj.get("pending_lobs"));
    Ok(record)
}

fn column_set(value: Option<&serde_json::Value>) -> BTreeSet<String> {
    match value {
        Some(serde_json::Value::Array(cols)) => cols
            .iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// 정답 파일 로드. 첫 유효 라인이 `{` 로 시작하면 중간 JSON 형식으로 읽는다.
pub fn load_ground_truth(path: &Path) -> Result<GroundTruth> {
    let text = fs::read_to_string(path).map_err(|e| VerifyError::io(path, e))?;

    let is_json = text
        .lines()
        .find(|line| !is_comment_line(line))
        .map(|line| line.trim_start().starts_with('{'))
        .unwrap_or(false);

    let truth = if is_json {
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| record_from_json(line, i + 1))
            .collect::<Result<Vec<_>>>()?;
        GroundTruth {
            records,
            diagnostics: Vec::new(),
        }
    } else {
        convert(&parse_lines(&text)?)
    };

    info!(
        "Loaded {} ground-truth records from {} ({} unparseable)",
        truth.records.len(),
        path.display(),
        truth.diagnostics.len()
    );
    Ok(truth)
}

/// 레코드들을 JSON 라인으로 기록
pub fn write_json_lines<W: Write>(records: &[ParsedRecord], mut out: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, &record.to_json())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
