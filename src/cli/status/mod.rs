//! Status command - raw document counts per status

use crate::cli::{bootstrap, print_json};

pub async fn run() -> anyhow::Result<()> {
    let state = bootstrap().await?;
    let counts = state.raw_store.count_by_status().await?;
    print_json(&counts)
}
