use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;
use tracing::info;

use mathvar_core::GeneratedProblem;

const TITLE: &str = "단일 문제 변형 생성기 결과";
const IMAGE_PLACEHOLDER: &str = "[원본 이미지 사용]";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export: no generated variants")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `generated_problems_YYYY-MM-DD.txt`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("generated_problems_{}.txt", date.format("%Y-%m-%d"))
}

/// Render the generated variants of a batch as plain text. The original
/// entry is left out.
pub fn render_txt(
    problems: &[GeneratedProblem],
    generated_at: NaiveDateTime,
) -> Result<String, ExportError> {
    let variants: Vec<&GeneratedProblem> = problems.iter().filter(|p| p.is_generated).collect();
    if variants.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "생성 일시: {}", korean_timestamp(generated_at));
    let _ = writeln!(out, "총 변형 문제 수: {}개", variants.len());
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    for (i, p) in variants.iter().enumerate() {
        let _ = writeln!(out, "[{}]", p.sequence);
        let _ = writeln!(out, "\n【문제】");
        let _ = writeln!(out, "{}\n", p.problem_text.as_deref().unwrap_or(IMAGE_PLACEHOLDER));
        let _ = writeln!(out, "【해설】");
        let _ = writeln!(out, "{}", p.solution_text.as_deref().unwrap_or(IMAGE_PLACEHOLDER));
        if i + 1 < variants.len() {
            let _ = writeln!(out, "\n{}\n", "-".repeat(30));
        }
    }
    Ok(out)
}

/// Korean locale date-time, e.g. `2026. 10. 19. 오후 3:04:05`.
fn korean_timestamp(at: NaiveDateTime) -> String {
    let meridiem = if at.hour() < 12 { "오전" } else { "오후" };
    format!(
        "{} {} {}",
        at.format("%Y. %-m. %-d."),
        meridiem,
        at.format("%-I:%M:%S")
    )
}

/// Render and write the batch into `dir`, returning the file path.
pub fn write_txt(
    dir: &Path,
    problems: &[GeneratedProblem],
    generated_at: NaiveDateTime,
) -> Result<PathBuf, ExportError> {
    let content = render_txt(problems, generated_at)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(generated_at.date()));
    std::fs::write(&path, content)?;
    info!("Exported {} bytes to {}", path.metadata()?.len(), path.display());
    Ok(path)
}
