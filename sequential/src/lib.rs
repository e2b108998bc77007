use common::{
    codec::{decode_records, encode_record, part_file_name, partition, write_lines},
    App, Job, JobReport, Result, Substrate,
};
use eyre::{ensure, WrapErr};
use itertools::Itertools;
use log::info;
use std::fs::{create_dir_all, read_to_string};

/// Runs a whole job on the calling thread. No retries: any failure fails the
/// job.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

impl Substrate for Sequential {
    fn run<A: App>(&self, job: Job<A>) -> Result<JobReport> {
        let Job {
            name,
            app,
            inputs,
            output_dir,
            n_reduce,
        } = job;
        ensure!(n_reduce > 0, "{}: at least one reduce partition is required", name);
        info!("{}: {} map partitions, {} reduce partitions", name, inputs.len(), n_reduce);

        let mut intermediate = Vec::new();
        for file in &inputs {
            let content = read_to_string(file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;
            let records = decode_records::<A::InKey, A::InValue>(&content)
                .wrap_err_with(|| format!("failed to decode {}", file.display()))?;
            intermediate.extend(records.into_iter().flat_map(|(k, v)| app.map(k, v)));
        }
        intermediate.sort_by(|a, b| a.0.cmp(&b.0));

        let mut partitions = vec![Vec::new(); n_reduce as usize];
        let mut records_out = 0;
        for (k, kvs) in intermediate
            .into_iter()
            .group_by(|kv| kv.0.clone())
            .into_iter()
        {
            if let Some(output) = app.reduce(&k, kvs.map(|kv| kv.1).collect_vec()) {
                partitions[partition(&k, n_reduce) as usize].push(encode_record(&k, &output)?);
                records_out += 1;
            }
        }

        create_dir_all(&output_dir)
            .wrap_err_with(|| format!("failed to create {}", output_dir.display()))?;
        let mut outputs = Vec::with_capacity(partitions.len());
        for (index, lines) in partitions.iter().enumerate() {
            let path = output_dir.join(part_file_name(index as u64));
            write_lines(&path, lines)?;
            outputs.push(path);
        }

        info!("{}: done, {} records", name, records_out);
        Ok(JobReport {
            outputs,
            map_tasks: inputs.len(),
            reduce_tasks: n_reduce as usize,
            records_out,
            retries: 0,
        })
    }
}
