/// LogMiner 정답 대비 CDC 출력 검증 도구
///
/// 종료 코드: 0 일치, 1 불일치, 2 사용법 오류, 3 실행 오류
use clap::Parser;
use redo_verify::comparator::ColumnPolicy;
use redo_verify::config::VerifyConfig;
use redo_verify::logminer::write_json_lines;
use redo_verify::pipeline::verify;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(name = "redo_verify")]
#[command(about = "Compare CDC connector output against LogMiner SQL_REDO ground truth")]
struct Cli {
    /// LogMiner 파이프 구분 출력 또는 정규화된 JSON 라인 파일
    ground_truth: PathBuf,

    /// CDC 커넥터 JSON 라인 출력
    candidate: PathBuf,

    /// 정답에만 있는 컬럼을 불일치로 보고
    #[arg(long, env = "REDO_VERIFY_STRICT_COLUMNS")]
    strict_columns: bool,

    /// LOB 분할 레코드 병합 비활성화
    #[arg(long, env = "REDO_VERIFY_NO_LOB_MERGE")]
    no_lob_merge: bool,

    /// 숫자 비교 상대 오차
    #[arg(long, env = "REDO_VERIFY_TOLERANCE", default_value_t = 1e-6)]
    tolerance: f64,

    /// 병합된 정답 레코드를 JSON 라인으로 저장
    #[arg(long, value_name = "PATH")]
    dump_ground_truth: Option<PathBuf>,

    /// 디버그 로그 출력
    #[arg(short, long)]
    verbose: bool,
}

const EXIT_MATCH: u8 = 0;
const EXIT_MISMATCH: u8 = 1;
const EXIT_FAULT: u8 = 3;

fn main() -> ExitCode {
    // 사용법 오류 시 clap 이 stderr 출력 후 코드 2로 종료
    let cli = Cli::parse();

    // 로깅 초기화 (stdout 은 보고서 전용)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    ExitCode::from(run(&cli))
}

/// 검증을 실행하고 보고서를 출력한 뒤 종료 코드를 돌려준다
fn run(cli: &Cli) -> u8 {
    let config = VerifyConfig {
        column_policy: if cli.strict_columns {
            ColumnPolicy::Strict
        } else {
            ColumnPolicy::Relaxed
        },
        merge_lobs: !cli.no_lob_merge,
        relative_tolerance: cli.tolerance,
    };

    let outcome = match verify(&cli.ground_truth, &cli.candidate, &config) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Verification aborted: {}", e);
            return EXIT_FAULT;
        }
    };

    if let Some(path) = &cli.dump_ground_truth {
        let written = File::create(path)
            .map_err(|e| redo_verify::VerifyError::io(path, e))
            .and_then(|file| write_json_lines(&outcome.ground_truth, BufWriter::new(file)));
        match written {
            Ok(()) => info!("Wrote {} ground-truth records to {}", outcome.ground_truth.len(), path.display()),
            Err(e) => {
                error!("Failed to write ground truth: {}", e);
                return EXIT_FAULT;
            }
        }
    }

    print!("{}", outcome.report);

    if outcome.is_match() {
        EXIT_MATCH
    } else {
        EXIT_MISMATCH
    }
}
