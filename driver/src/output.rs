use app_similarity::SimilarityResult;
use common::{
    codec::{part_file_name, write_lines, SUCCESS_MARKER},
    Result,
};
use eyre::WrapErr;
use std::{
    fs::{self, create_dir_all, File},
    path::{Path, PathBuf},
};

/// `doc_a<TAB>doc_b<TAB>score`
pub fn format_result(result: &SimilarityResult) -> String {
    format!("{}\t{:.6}", result.pair, result.score)
}

/// Writes `results` in order, then the success marker. A directory without
/// the marker holds no valid output.
pub fn write_results(results: &[SimilarityResult], dir: &Path) -> Result<PathBuf> {
    create_dir_all(dir).wrap_err_with(|| format!("failed to create {}", dir.display()))?;

    let part = dir.join(part_file_name(0));
    let temp = dir.join(format!(".{}.tmp", part_file_name(0)));
    let lines: Vec<String> = results.iter().map(format_result).collect();
    write_lines(&temp, &lines)?;
    fs::rename(&temp, &part).wrap_err_with(|| format!("failed to commit {}", part.display()))?;

    File::create(dir.join(SUCCESS_MARKER))
        .wrap_err_with(|| format!("failed to mark {} complete", dir.display()))?;
    Ok(part)
}
