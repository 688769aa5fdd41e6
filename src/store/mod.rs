use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::ScoringProfile;
use crate::model::{EvalResult, ResumeKey};

mod row;

pub use row::COLUMNS;
use row::{KeyRow, ResultRow};

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    profile: ScoringProfile,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>, profile: ScoringProfile) -> Self {
        Self {
            path: path.into(),
            profile,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn initialize(&self) -> Result<()> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "results file already present");
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        self.write_header(&file)?;
        info!(path = %self.path.display(), "initialized results file");
        Ok(())
    }

    pub fn append_result(&self, result: &EvalResult) -> Result<()> {
        let needs_header = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;
        if needs_header {
            self.write_header(&file)?;
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&file);
            writer
                .serialize(ResultRow::from_result(result))
                .with_context(|| format!("failed to append row to {}", self.path.display()))?;
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", self.path.display()))?;
        }
        file.sync_data()
            .with_context(|| format!("failed to sync {}", self.path.display()))?;

        debug!(
            model = %result.model_name,
            question = result.question_number,
            with_context = result.context_provided,
            "result appended"
        );
        Ok(())
    }

    pub fn load_existing_keys(&self) -> HashSet<ResumeKey> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no existing results file");
            return HashSet::new();
        }

        match self.read_keys() {
            Ok(keys) => {
                info!(count = keys.len(), path = %self.path.display(), "loaded existing results");
                keys
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "failed to load existing results; treating every cell as pending"
                );
                HashSet::new()
            }
        }
    }

    pub fn load_all(&self) -> Result<Vec<EvalResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut results = Vec::new();
        for (index, row) in reader.deserialize::<ResultRow>().enumerate() {
            let line = index + 2;
            let row = row.with_context(|| {
                format!("failed to read row at line {line} of {}", self.path.display())
            })?;
            let result = row.into_result(self.profile).with_context(|| {
                format!("invalid row at line {line} of {}", self.path.display())
            })?;
            results.push(result);
        }

        info!(count = results.len(), path = %self.path.display(), "loaded all results");
        Ok(results)
    }

    pub fn write_all(&self, results: &[EvalResult]) -> Result<()> {
        if results.is_empty() {
            warn!(path = %self.path.display(), "no results to write; leaving file untouched");
            return Ok(());
        }

        info!(path = %self.path.display(), result_count = results.len(), "writing results file");
        let file = File::create(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(true)
                .from_writer(&file);
            for result in results {
                writer
                    .serialize(ResultRow::from_result(result))
                    .with_context(|| format!("failed to write row to {}", self.path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", self.path.display()))?;
        }
        file.sync_all()
            .with_context(|| format!("failed to sync {}", self.path.display()))?;
        Ok(())
    }

    fn read_keys(&self) -> Result<HashSet<ResumeKey>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut keys = HashSet::new();
        for row in reader.deserialize::<KeyRow>() {
            let row = row.context("failed to read results row")?;
            keys.insert(row.into_key()?);
        }
        Ok(keys)
    }

    fn write_header(&self, file: &File) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(COLUMNS)
            .with_context(|| format!("failed to write header to {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("failed to sync {}", self.path.display()))?;
        Ok(())
    }
}
