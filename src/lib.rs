//! LogMiner 기반 CDC 출력 검증
//!
//! Oracle LogMiner 가 재구성한 SQL_REDO 를 정답으로 삼아 CDC 커넥터의 JSON 이벤트가
//! 의미상 동일한지 확인한다.
//! 주요 기능:
//! - SQL_REDO 문장에서 before/after 컬럼 값 복원
//! - LOB 분할 redo 레코드 병합
//! - 숫자/날짜/줄바꿈 차이를 흡수하는 값 비교
//! - 레코드 단위 차이 보고서

pub mod candidate;
pub mod comparator;
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod lob;
pub mod logminer;
pub mod matcher;
pub mod pipeline;
pub mod redo_parser;
pub mod scanner;

pub use comparator::{ColumnPolicy, DiffReport, RecordComparator};
pub use config::VerifyConfig;
pub use error::{RedoParseError, Result, VerifyError};
pub use events::{NormalizedRecord, Operation, ParsedRecord, ScalarValue};
pub use extractor::ValueExtractor;
pub use lob::LobMerger;
pub use matcher::ValueMatcher;
pub use pipeline::{verify, VerifyOutcome};
pub use redo_parser::SqlRedoParser;
