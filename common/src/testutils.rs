use anyhow::Context;
use async_recursion::async_recursion;
use proptest::prelude::*;

/// Number of non-directory entries created by [`setup_test_dir`].
pub const LEAF_COUNT: usize = 7;

pub async fn setup_test_dir() -> anyhow::Result<tempfile::TempDir> {
    let tmp_dir = tempfile::Builder::new().prefix("tsh_test").tempdir()?;
    // foo
    // |- 0.txt
    // |- bar
    //    |- 1.txt
    //    |- 2.txt
    //    |- 3.txt
    // |- baz
    //    |- 4.txt
    //    |- 5.txt -> ../bar/2.txt
    //    |- 6.txt -> (absolute path) .../foo/bar/3.txt
    let foo_path = tmp_dir.path().join("foo");
    tokio::fs::create_dir(&foo_path).await?;
    tokio::fs::write(foo_path.join("0.txt"), "0").await?;
    let bar_path = foo_path.join("bar");
    tokio::fs::create_dir(&bar_path).await?;
    tokio::fs::write(bar_path.join("1.txt"), "1").await?;
    tokio::fs::write(bar_path.join("2.txt"), "2").await?;
    tokio::fs::write(bar_path.join("3.txt"), "3").await?;
    let baz_path = foo_path.join("baz");
    tokio::fs::create_dir(&baz_path).await?;
    tokio::fs::write(baz_path.join("4.txt"), "4").await?;
    tokio::fs::symlink("../bar/2.txt", baz_path.join("5.txt")).await?;
    tokio::fs::symlink(bar_path.join("3.txt"), baz_path.join("6.txt")).await?;
    Ok(tmp_dir)
}

/// Builds a wide and deep tree: `width` subdirectories per level, `depth` levels, every
/// directory holding two files.
#[async_recursion]
pub async fn create_deep_tree(
    root: &std::path::Path,
    width: usize,
    depth: usize,
) -> anyhow::Result<usize> {
    tokio::fs::create_dir_all(root).await?;
    tokio::fs::write(root.join("a.txt"), root.to_string_lossy().as_bytes()).await?;
    tokio::fs::write(root.join("b.txt"), vec![7u8; 4096]).await?;
    let mut files = 2;
    if depth > 0 {
        for idx in 0..width {
            files += create_deep_tree(&root.join(format!("d{idx}")), width, depth - 1).await?;
        }
    }
    Ok(files)
}

/// Relative file paths with their contents, directory components start with `d` and file
/// names with `f` so a path is never both a file and a directory.
pub fn tree_strategy() -> impl Strategy<Value = Vec<(std::path::PathBuf, Vec<u8>)>> {
    let path = (prop::collection::vec("d[a-c]", 0..4), "f[0-9]").prop_map(|(dirs, file)| {
        let mut path: std::path::PathBuf = dirs.iter().collect();
        path.push(file);
        path
    });
    prop::collection::btree_map(path, prop::collection::vec(any::<u8>(), 0..64), 0..24)
        .prop_map(|files| files.into_iter().collect())
}

pub async fn create_tree(
    root: &std::path::Path,
    files: &[(std::path::PathBuf, Vec<u8>)],
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(root).await?;
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, contents).await?;
    }
    Ok(())
}

/// Checks that every entry under `src` exists under `dst` with the same type and contents,
/// returning an error on the first difference. Symlinks are compared by their targets.
#[async_recursion]
pub async fn check_dirs_identical(
    src: &std::path::Path,
    dst: &std::path::Path,
) -> anyhow::Result<()> {
    let mut src_entries = tokio::fs::read_dir(src).await?;
    let mut count = 0;
    while let Some(src_entry) = src_entries.next_entry().await? {
        count += 1;
        let src_entry_path = src_entry.path();
        let src_entry_name = src_entry_path.file_name().context("entry without a name")?;
        let dst_entry_path = dst.join(src_entry_name);
        let src_md = tokio::fs::symlink_metadata(&src_entry_path)
            .await
            .context(format!("Source file {:?} is missing!", &src_entry_path))?;
        let dst_md = tokio::fs::symlink_metadata(&dst_entry_path)
            .await
            .context(format!(
                "Destination file {:?} is missing!",
                &dst_entry_path
            ))?;
        anyhow::ensure!(
            src_md.file_type() == dst_md.file_type(),
            "{dst_entry_path:?} has a different type"
        );
        if src_md.is_symlink() {
            let src_link = tokio::fs::read_link(&src_entry_path).await?;
            let dst_link = tokio::fs::read_link(&dst_entry_path).await?;
            anyhow::ensure!(src_link == dst_link, "{dst_entry_path:?} points elsewhere");
        } else if src_md.is_file() {
            let src_contents = tokio::fs::read(&src_entry_path).await?;
            let dst_contents = tokio::fs::read(&dst_entry_path).await?;
            anyhow::ensure!(
                src_contents == dst_contents,
                "{dst_entry_path:?} has different contents"
            );
        } else {
            check_dirs_identical(&src_entry_path, &dst_entry_path).await?;
        }
    }
    let mut dst_entries = tokio::fs::read_dir(dst).await?;
    let mut dst_count = 0;
    while dst_entries.next_entry().await?.is_some() {
        dst_count += 1;
    }
    anyhow::ensure!(count == dst_count, "{dst:?} has extra entries");
    Ok(())
}

/// Collects relative paths of all non-directory entries under `root`.
#[async_recursion]
pub async fn list_leaves(
    root: &std::path::Path,
    prefix: &std::path::Path,
) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let mut leaves = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let relative = prefix.join(entry.file_name());
        if entry.file_type().await?.is_dir() {
            leaves.extend(list_leaves(&entry.path(), &relative).await?);
        } else {
            leaves.push(relative);
        }
    }
    Ok(leaves)
}

pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}
