use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{EvalResult, ResumeKey};
use crate::report::log_summary;
use crate::store::ResultStore;

#[derive(Debug, Default, PartialEq)]
pub struct StoreStatus {
    pub row_count: usize,
    pub distinct_keys: usize,
    pub duplicate_rows: usize,
    pub rows_per_model: BTreeMap<String, usize>,
}

impl StoreStatus {
    pub fn from_results(results: &[EvalResult]) -> Self {
        let mut keys: HashSet<ResumeKey> = HashSet::new();
        let mut rows_per_model = BTreeMap::new();
        for result in results {
            keys.insert(result.key());
            *rows_per_model.entry(result.model_name.clone()).or_insert(0) += 1;
        }

        Self {
            row_count: results.len(),
            distinct_keys: keys.len(),
            duplicate_rows: results.len() - keys.len(),
            rows_per_model,
        }
    }
}

pub fn run(args: StatusArgs) -> Result<()> {
    let store = ResultStore::new(&args.results.output_csv_path, args.results.scoring_profile);
    info!(path = %store.path().display(), "status requested");

    if !store.path().exists() {
        warn!(path = %store.path().display(), "results file missing");
        return Ok(());
    }

    let results = store.load_all()?;
    let status = StoreStatus::from_results(&results);
    info!(
        rows = status.row_count,
        distinct_cells = status.distinct_keys,
        duplicate_rows = status.duplicate_rows,
        "results file status"
    );
    if status.duplicate_rows > 0 {
        warn!(
            duplicate_rows = status.duplicate_rows,
            "results file holds repeated cells"
        );
    }
    for (model, rows) in &status.rows_per_model {
        info!(model = %model, rows, "model rows");
    }

    log_summary(&results);
    Ok(())
}
