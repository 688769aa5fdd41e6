use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RankArgs;
use crate::model::EvalResult;
use crate::percentile;
use crate::report::log_summary;
use crate::store::ResultStore;

pub fn run(args: RankArgs) -> Result<()> {
    let store = ResultStore::new(&args.results.output_csv_path, args.results.scoring_profile);
    info!(
        path = %store.path().display(),
        profile = args.results.scoring_profile.as_str(),
        "ranking results"
    );

    if !store.path().exists() {
        warn!(path = %store.path().display(), "results file missing; nothing to rank");
        return Ok(());
    }

    let results = rerank(&store)?;
    log_summary(&results);
    Ok(())
}

pub fn rerank(store: &ResultStore) -> Result<Vec<EvalResult>> {
    let mut results = store
        .load_all()
        .context("failed to reload results for ranking")?;
    if results.is_empty() {
        warn!(path = %store.path().display(), "no results to rank");
        return Ok(results);
    }

    percentile::annotate(&mut results);
    store.write_all(&results)?;
    info!(count = results.len(), "percentile ranks updated");
    Ok(results)
}
