use crate::task::{MapTask, ReduceTask};
use common::{
    codec::{decode_records, encode_record, part_file_name, partition},
    App, Result,
};
use eyre::WrapErr;
use futures::future::try_join_all;
use itertools::Itertools;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, read_to_string, File},
    io::{AsyncWriteExt, BufWriter},
    task,
};
use uuid::Uuid;

async fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(path)
        .await
        .wrap_err_with(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    // sync
    writer.into_inner().sync_all().await?;
    Ok(())
}

fn map_partition<A: App>(app: &A, content: &str, n_reduce: u64) -> Result<Vec<Vec<String>>> {
    let records = decode_records::<A::InKey, A::InValue>(content)?;
    let mut buckets = vec![Vec::new(); n_reduce as usize];
    for (k2, v2) in records.into_iter().flat_map(|(k, v)| app.map(k, v)) {
        buckets[partition(&k2, n_reduce) as usize].push(encode_record(&k2, &v2)?);
    }
    Ok(buckets)
}

fn reduce_partition<A: App>(app: &A, contents: &[String]) -> Result<Vec<String>> {
    let mut k2v2s = Vec::new();
    for content in contents {
        k2v2s.extend(decode_records::<A::Key, A::Value>(content)?);
    }
    k2v2s.sort_by(|a, b| a.0.cmp(&b.0));

    let mut lines = Vec::new();
    for (k, kvs) in k2v2s.into_iter().group_by(|kv| kv.0.clone()).into_iter() {
        if let Some(output) = app.reduce(&k, kvs.map(|kv| kv.1).collect_vec()) {
            lines.push(encode_record(&k, &output)?);
        }
    }
    Ok(lines)
}

/// Maps one input partition into `n_reduce` intermediate files under
/// `temp_dir`. File names are unique per attempt.
pub async fn run_map<A: App>(app: Arc<A>, map: MapTask, temp_dir: &Path) -> Result<Vec<PathBuf>> {
    let MapTask {
        index,
        file,
        n_reduce,
    } = map;

    let content = read_to_string(&file)
        .await
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let buckets = task::spawn_blocking(move || map_partition(&*app, &content, n_reduce))
        .await?
        .wrap_err_with(|| format!("failed to map {}", file.display()))?;

    let intermediate_filenames = (0..n_reduce)
        .map(|j| temp_dir.join(format!("mr-{}-{}-{}", index, j, Uuid::new_v4())))
        .collect_vec();
    try_join_all(
        intermediate_filenames
            .iter()
            .zip(buckets.iter())
            .map(|(path, lines)| write_lines(path, lines)),
    )
    .await?;

    Ok(intermediate_filenames)
}

/// Reduces one partition and moves the result into `output_dir` once it is
/// completely written. Returns the output path and its record count.
pub async fn run_reduce<A: App>(
    app: Arc<A>,
    reduce: ReduceTask,
    temp_dir: &Path,
    output_dir: &Path,
) -> Result<(PathBuf, usize)> {
    let ReduceTask { index, files } = reduce;

    let contents = try_join_all(files.iter().map(read_to_string))
        .await
        .wrap_err_with(|| format!("failed to read map outputs for partition {}", index))?;
    let lines = task::spawn_blocking(move || reduce_partition(&*app, &contents))
        .await?
        .wrap_err_with(|| format!("failed to reduce partition {}", index))?;

    let (temp_path, output_path) = (
        temp_dir.join(format!("{}-{}", part_file_name(index), Uuid::new_v4())),
        output_dir.join(part_file_name(index)),
    );
    write_lines(&temp_path, &lines).await?;
    // rename
    fs::rename(&temp_path, &output_path)
        .await
        .wrap_err_with(|| format!("failed to commit {}", output_path.display()))?;

    Ok((output_path, lines.len()))
}
