use anyhow::{Context, anyhow};
use async_recursion::async_recursion;
use tracing::instrument;

/// Removes `path` whatever it is, a directory is removed together with its contents.
///
/// Children of a directory are removed concurrently. Every child is attempted even if some
/// of them fail, the errors are combined into one.
#[instrument]
#[async_recursion]
pub async fn rm(path: &std::path::Path) -> anyhow::Result<()> {
    tracing::debug!("remove: {:?}", path);
    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .with_context(|| format!("failed reading metadata from {path:?}"))?;
    if !metadata.is_dir() {
        return tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("failed removing {path:?}"));
    }
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("cannot open directory {path:?} for reading"))?;
    let mut join_set = tokio::task::JoinSet::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {path:?}"))?
    {
        let entry_path = entry.path();
        join_set.spawn(async move { rm(&entry_path).await });
    }
    drop(entries);
    let mut errors = vec![];
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(error)) => errors.push(error),
            Err(error) => errors.push(error.into()),
        }
    }
    if !errors.is_empty() {
        tracing::debug!("remove: {:?} failed with: {:?}", path, &errors);
        let messages: Vec<String> = errors.iter().map(|error| format!("{error:#}")).collect();
        return Err(anyhow!("{}", messages.join("; ")));
    }
    tokio::fs::remove_dir(path)
        .await
        .with_context(|| format!("failed removing directory {path:?}"))?;
    tracing::debug!("remove: {:?} succeeded!", path);
    Ok(())
}
