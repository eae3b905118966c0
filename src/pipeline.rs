//! 검증 파이프라인
//!
//! 1. 정답 로드 (LogMiner 파이프 형식 또는 중간 JSON)
//! 2. LOB 분할 레코드 병합
//! 3. 후보 출력 로드 및 펼치기
//! 4. 비교 및 보고서 생성

use crate::candidate::load_candidate;
use crate::comparator::DiffReport;
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::events::NormalizedRecord;
use crate::lob::LobMerger;
use crate::logminer::{load_ground_truth, ParseDiagnostic};
use std::path::Path;
use tracing::info;

/// 검증 실행 결과
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub report: DiffReport,
    /// 병합까지 끝난 정답 레코드
    pub ground_truth: Vec<NormalizedRecord>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl VerifyOutcome {
    pub fn is_match(&self) -> bool {
        self.report.is_match()
    }
}

/// 정답 파일을 로드하고 설정에 따라 LOB 병합까지 적용
pub fn prepare_ground_truth(
    path: &Path,
    config: &VerifyConfig,
) -> Result<(Vec<NormalizedRecord>, Vec<ParseDiagnostic>)> {
    let truth = load_ground_truth(path)?;
    let records = if config.merge_lobs {
        LobMerger::merge(truth.records)
    } else {
        truth.records
    };
    Ok((records, truth.diagnostics))
}

/// 정답과 후보 파일을 비교
pub fn verify(
    ground_truth_path: &Path,
    candidate_path: &Path,
    config: &VerifyConfig,
) -> Result<VerifyOutcome> {
    config.validate()?;
    info!(
        "Verifying {} against {} (policy {:?}, lob merge {})",
        candidate_path.display(),
        ground_truth_path.display(),
        config.column_policy,
        config.merge_lobs
    );

    let (ground_truth, diagnostics) = prepare_ground_truth(ground_truth_path, config)?;
    let candidate = load_candidate(candidate_path)?;
    let report = config.comparator().compare(&ground_truth, &candidate);

    Ok(VerifyOutcome {
        report,
        ground_truth,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ColumnPolicy;
    use crate::error::VerifyError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const LOGMINER: &str = r#"-- SCN|OPERATION|SEG_OWNER|TABLE_NAME|XID|SQL_REDO|SQL_UNDO
100|INSERT|SCOTT|EMP|0A001B00|insert into "SCOTT"."EMP"("ID","NAME","HIRED","SAL") values ('1','O''Brien',TO_DATE('15-JUN-25', 'DD-MON-RR'),'3.1400001E+000');|delete from "SCOTT"."EMP" where ROWID = 'AAA';
101|INSERT|SCOTT|DOCS|0A001B00|insert into "SCOTT"."DOCS"("ID","BODY") values ('7',EMPTY_BLOB());|
102|UPDATE|SCOTT|DOCS|0A001B00|update "SCOTT"."DOCS" set "BODY" = HEXTORAW('CAFE') where "ID" = '7' and ROWID = 'AAB';|
103|COMMIT||||commit;|
110|UPDATE|SCOTT|EMP|0B000100|update "SCOTT"."EMP" set "NAME" = 'Ann' where "ID" = '1' and "NAME" = 'O''Brien' and ROWID = 'AAA';|
111|DELETE|SCOTT|EMP|0B000100|delete from "SCOTT"."EMP" where "ID" = '1' and "NAME" = 'Ann' and ROWID = 'AAA';|
"#;

    const CANDIDATE: &str = r#"{"c_scn":"103","xid":"0x000a.01b.00000000","payload":[{"op":"begin"},{"op":"c","schema":{"owner":"SCOTT","table":"EMP"},"after":{"ID":1,"NAME":"O'Brien","HIRED":1749945600,"SAL":3.14}},{"op":"c","schema":{"owner":"SCOTT","table":"DOCS"},"after":{"ID":7,"BODY":"CAFE"}},{"op":"commit"}]}
{"c_scn":"112","xid":"0x000b.000.00000100","payload":[{"op":"u","schema":{"owner":"SCOTT","table":"EMP"},"before":{"ID":1,"NAME":"O'Brien"},"after":{"ID":1,"NAME":"Ann","HIRED":1749945600,"SAL":3.14}},{"op":"d","schema":{"owner":"SCOTT","table":"EMP"},"before":{"ID":1,"NAME":"Ann"}}]}
"#;

    #[test]
    fn test_verify_matching_streams() {
        let gt = file_with(LOGMINER);
        let cd = file_with(CANDIDATE);
        let outcome = verify(gt.path(), cd.path(), &VerifyConfig::default()).unwrap();

        assert!(outcome.is_match(), "{}", outcome.report);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.ground_truth.len(), 4);
        assert_eq!(outcome.report.candidate_count, 4);
    }

    #[test]
    fn test_verify_without_lob_merge_mismatches() {
        let gt = file_with(LOGMINER);
        let cd = file_with(CANDIDATE);
        let config = VerifyConfig {
            merge_lobs: false,
            ..Default::default()
        };
        let outcome = verify(gt.path(), cd.path(), &config).unwrap();
        assert!(!outcome.is_match());
        assert_eq!(
            outcome.report.diffs[0],
            "Record count mismatch: ground truth=5, candidate=4"
        );
    }

    #[test]
    fn test_verify_detects_value_difference() {
        let gt = file_with(LOGMINER);
        let cd = file_with(&CANDIDATE.replace(r#""NAME":"Ann","HIRED""#, r#""NAME":"Anna","HIRED""#));
        let outcome = verify(gt.path(), cd.path(), &VerifyConfig::default()).unwrap();
        assert!(outcome
            .report
            .diffs
            .iter()
            .any(|d| d == "  column NAME: ground truth=\"Ann\", candidate=\"Anna\""));
    }

    #[test]
    fn test_unparseable_statement_is_reported_not_fatal() {
        let gt = file_with(&format!("{}112|UPDATE|SCOTT|EMP|x|update oops;|\n", LOGMINER));
        let cd = file_with(CANDIDATE);
        let outcome = verify(gt.path(), cd.path(), &VerifyConfig::default()).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(!outcome.is_match());
    }

    #[test]
    fn test_strict_policy_flags_omitted_candidate_columns() {
        let gt = file_with(LOGMINER);
        let cd = file_with(&CANDIDATE.replace(r#""before":{"ID":1,"NAME":"Ann"}"#, r#""before":{"ID":1}"#));
        let relaxed = verify(gt.path(), cd.path(), &VerifyConfig::default()).unwrap();
        assert!(relaxed.is_match());

        let strict = VerifyConfig {
            column_policy: ColumnPolicy::Strict,
            ..Default::default()
        };
        let outcome = verify(gt.path(), cd.path(), &strict).unwrap();
        assert!(outcome
            .report
            .diffs
            .iter()
            .any(|d| d.contains("column NAME: missing in candidate")));
    }

    #[test]
    fn test_malformed_inputs_are_fatal() {
        let gt = file_with("100|INSERT|SCOTT\n");
        let cd = file_with(CANDIDATE);
        assert!(matches!(
            verify(gt.path(), cd.path(), &VerifyConfig::default()),
            Err(VerifyError::MalformedRedoLine { line: 1, .. })
        ));

        let gt = file_with(LOGMINER);
        let cd = file_with("{broken\n");
        assert!(matches!(
            verify(gt.path(), cd.path(), &VerifyConfig::default()),
            Err(VerifyError::MalformedJson { line: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let cd = file_with(CANDIDATE);
        let result = verify(Path::new("/nonexistent/redo.txt"), cd.path(), &VerifyConfig::default());
        assert!(matches!(result, Err(VerifyError::Io { .. })));
    }
}
