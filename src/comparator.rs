//! 정답 레코드와 후보 레코드 비교
//!
//! 양쪽을 SCN 순으로 정렬(동일 SCN은 입력 순서 유지)한 뒤 인덱스로 짝지어 비교한다.
//! RAC 다중 스레드 캡처로 인한 순서 차이를 흡수하기 위함이다.

use crate::events::{ColumnMap, NormalizedRecord, Operation};
use crate::matcher::ValueMatcher;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// 정답에만 있는 컬럼 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// 후보가 변경되지 않은 컬럼을 생략할 수 있으므로 허용
    #[default]
    Relaxed,
    /// 불일치로 보고
    Strict,
}

/// 비교 대상 이미지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Before,
    After,
}

impl Section {
    fn as_str(&self) -> &'static str {
        match self {
            Section::Before => "before",
            Section::After => "after",
        }
    }
}

/// 비교 결과 보고서
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    pub diffs: Vec<String>,
    pub ground_truth_count: usize,
    pub candidate_count: usize,
}

impl DiffReport {
    pub fn is_match(&self) -> bool {
        self.diffs.is_empty()
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_match() {
            return writeln!(f, "MATCH: {} records verified", self.ground_truth_count);
        }
        writeln!(f, "MISMATCH: ground truth vs candidate output differs:")?;
        for diff in &self.diffs {
            writeln!(f, "{}", diff)?;
        }
        writeln!(f)?;
        writeln!(f, "Ground-truth records: {}", self.ground_truth_count)?;
        writeln!(f, "Candidate records: {}", self.candidate_count)
    }
}

/// SCN 오름차순 안정 정렬 (입력은 건드리지 않음)
pub fn sort_by_scn(records: &[NormalizedRecord]) -> Vec<&NormalizedRecord> {
    let mut sorted: Vec<&NormalizedRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.scn_number());
    sorted
}

pub struct RecordComparator {
    matcher: ValueMatcher,
    policy: ColumnPolicy,
}

impl RecordComparator {
    pub fn new(matcher: ValueMatcher, policy: ColumnPolicy) -> Self {
        RecordComparator { matcher, policy }
    }

    pub fn policy(&self) -> ColumnPolicy {
        self.policy
    }

    pub fn compare(
        &self,
        ground_truth: &[NormalizedRecord],
        candidate: &[NormalizedRecord],
    ) -> DiffReport {
        let truth = sort_by_scn(ground_truth);
        let cand = sort_by_scn(candidate);
        let mut diffs = Vec::new();

        if truth.len() != cand.len() {
            diffs.push(format!(
                "Record count mismatch: ground truth={}, candidate={}",
                truth.len(),
                cand.len()
            ));
        }

        for i in 0..truth.len().max(cand.len()) {
            let n = i + 1;
            let (gt, cd) = match (truth.get(i), cand.get(i)) {
                (Some(gt), Some(cd)) => (*gt, *cd),
                (None, Some(cd)) => {
                    diffs.push(format!("Record #{}: extra candidate record: {}", n, cd));
                    continue;
                }
                (Some(gt), None) => {
                    diffs.push(format!("Record #{}: extra ground-truth record: {}", n, gt));
                    continue;
                }
                (None, None) => break,
            };

            if gt.op != cd.op {
                diffs.push(format!(
                    "Record #{}: operation mismatch: ground truth={}, candidate={}",
                    n, gt.op, cd.op
                ));
                continue;
            }

            if gt.table != cd.table {
                diffs.push(format!(
                    "Record #{}: table mismatch: ground truth={}, candidate={}",
                    n, gt.table, cd.table
                ));
            }

            let mut sections = Vec::new();
            if gt.op.has_after() {
                sections.push((Section::After, &gt.after, &cd.after));
            }
            if gt.op.has_before() {
                sections.push((Section::Before, &gt.before, &cd.before));
            }

            for (section, gt_cols, cd_cols) in sections {
                let col_diffs = self.compare_columns(gt.op, section, gt_cols, cd_cols, &gt.omitted);
                if !col_diffs.is_empty() {
                    diffs.push(format!(
                        "Record #{} ({}) '{}' column diffs:",
                        n,
                        gt.op,
                        section.as_str()
                    ));
                    diffs.extend(col_diffs);
                }
            }
        }

        let report = DiffReport {
            diffs,
            ground_truth_count: ground_truth.len(),
            candidate_count: candidate.len(),
        };
        info!(
            "Compared {} ground-truth / {} candidate records: {} diff lines",
            report.ground_truth_count,
            report.candidate_count,
            report.diffs.len()
        );
        report
    }

    fn compare_columns(
        &self,
        op: Operation,
        section: Section,
        gt_cols: &ColumnMap,
        cd_cols: &ColumnMap,
        omitted: &BTreeSet<String>,
    ) -> Vec<String> {
        let mut diffs = Vec::new();
        let keys: BTreeSet<&String> = gt_cols.keys().chain(cd_cols.keys()).collect();

        for key in keys {
            match (gt_cols.get(key), cd_cols.get(key)) {
                (Some(gt_val), None) => {
                    if self.policy == ColumnPolicy::Strict {
                        diffs.push(format!(
                            "  column {}: missing in candidate, ground truth={}",
                            key, gt_val
                        ));
                    }
                }
                (None, Some(cd_val)) => {
                    if tolerates_candidate_only(op, section, key, omitted) {
                        continue;
                    }
                    diffs.push(format!(
                        "  column {}: missing in ground truth, candidate={}",
                        key, cd_val
                    ));
                }
                (Some(gt_val), Some(cd_val)) => {
                    match self.matcher.match_rule(gt_val, cd_val) {
                        Some(rule) => debug!("column {} matched by {:?}", key, rule),
                        None => diffs.push(format!(
                            "  column {}: ground truth={}, candidate={}",
                            key, gt_val, cd_val
                        )),
                    }
                }
                (None, None) => {}
            }
        }
        diffs
    }
}

impl Default for RecordComparator {
    fn default() -> Self {
        RecordComparator::new(ValueMatcher::default(), ColumnPolicy::default())
    }
}

/// 후보에만 있는 컬럼 허용 여부.
/// UPDATE after 이미지는 보충 로깅으로 더 넓게 캡처되고, 정답에서 제외된 LOB 컬럼은
/// 애초에 비교할 값이 없다.
fn tolerates_candidate_only(
    op: Operation,
    section: Section,
    column: &str,
    omitted: &BTreeSet<String>,
) -> bool {
    (op == Operation::Update && section == Section::After)
        || (section == Section::After && omitted.contains(column))
}
