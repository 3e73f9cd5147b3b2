use async_recursion::async_recursion;
use tracing::instrument;

use crate::entry::{self, DirectoryEntry, Operation};
use crate::error::Error;
use crate::report::TransferReport;

/// Creates `dst` unless it already is a directory.
pub(crate) async fn ensure_dir(dst: &std::path::Path, report: &mut TransferReport) {
    match tokio::fs::create_dir(dst).await {
        Ok(()) => report.directories_created += 1,
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            if !tokio::fs::metadata(dst).await.is_ok_and(|md| md.is_dir()) {
                report.fail(Error::Io {
                    path: dst.to_path_buf(),
                    reason: "exists and is not a directory".to_string(),
                });
            }
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            // parents are missing, only happens for the root of a transfer
            match tokio::fs::create_dir_all(dst).await {
                Ok(()) => report.directories_created += 1,
                Err(error) => report.fail(Error::io(dst, &error)),
            }
        }
        Err(error) => report.fail(Error::io(dst, &error)),
    }
}

/// Removes a source directory emptied by a move, only if nothing under it failed.
pub(crate) async fn remove_moved_dir(
    operation: Operation,
    src: &std::path::Path,
    report: &mut TransferReport,
) {
    if operation != Operation::Move || !report.is_success() {
        return;
    }
    match tokio::fs::remove_dir(src).await {
        Ok(()) => report.directories_removed += 1,
        Err(error) => report.fail(Error::io(src, &error)),
    }
}

#[async_recursion]
async fn walk_dir(
    operation: Operation,
    src: &std::path::Path,
    dst: &std::path::Path,
) -> TransferReport {
    tracing::debug!("walking {:?}", src);
    let mut report = TransferReport::default();
    ensure_dir(dst, &mut report).await;
    let mut entries = match tokio::fs::read_dir(src).await {
        Ok(entries) => entries,
        Err(error) => {
            report.fail(Error::io(src, &error));
            return report;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                report.fail(Error::io(src, &error));
                break;
            }
        };
        let entry = match DirectoryEntry::from_dir_entry(&entry).await {
            Ok(entry) => entry,
            Err(error) => {
                report.fail(error);
                continue;
            }
        };
        let Some(name) = entry.path.file_name() else {
            continue;
        };
        let dst_path = dst.join(name);
        if entry.is_dir() {
            report = report + walk_dir(operation, &entry.path, &dst_path).await;
        } else {
            report.record(entry::transfer_entry(operation, &entry, &dst_path).await);
        }
    }
    drop(entries);
    remove_moved_dir(operation, src, &mut report).await;
    report
}

/// Mirrors the `src` directory into `dst` depth-first on the calling task.
///
/// Children are processed in the order the directory enumeration yields them. Failures
/// of individual entries are collected in the report and do not stop the walk. When
/// moving, every source directory whose subtree moved without errors is removed.
#[instrument]
pub async fn walk(
    operation: Operation,
    src: &std::path::Path,
    dst: &std::path::Path,
) -> TransferReport {
    let start = std::time::Instant::now();
    let mut report = walk_dir(operation, src, dst).await;
    report.total_elapsed = start.elapsed();
    tracing::info!(
        "sequential {} of {:?} finished, {} failures",
        operation,
        src,
        report.failures.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils;
    use proptest::prelude::*;
    use std::os::unix::fs::PermissionsExt;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn copy_mirrors_tree() -> anyhow::Result<()> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let test_path = tmp_dir.path();
        let report = walk(Operation::Copy, &test_path.join("foo"), &test_path.join("bar")).await;
        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.files_transferred, testutils::LEAF_COUNT);
        assert_eq!(report.directories_created, 3);
        assert!(report.total_elapsed > std::time::Duration::ZERO);
        testutils::check_dirs_identical(&test_path.join("foo"), &test_path.join("bar")).await?;
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn copy_is_idempotent() -> anyhow::Result<()> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let test_path = tmp_dir.path();
        let src = test_path.join("foo");
        let dst = test_path.join("bar");
        let first = walk(Operation::Copy, &src, &dst).await;
        let second = walk(Operation::Copy, &src, &dst).await;
        assert!(first.is_success() && second.is_success(), "{:?}", second.failures);
        assert_eq!(second.files_transferred, testutils::LEAF_COUNT);
        assert_eq!(second.directories_created, 0);
        testutils::check_dirs_identical(&src, &dst).await?;
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn move_empties_source() -> anyhow::Result<()> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let test_path = tmp_dir.path();
        let expected = test_path.join("expected");
        walk(Operation::Copy, &test_path.join("foo"), &expected).await;
        let report = walk(Operation::Move, &test_path.join("foo"), &test_path.join("bar")).await;
        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.directories_removed, 3);
        assert!(!test_path.join("foo").exists());
        testutils::check_dirs_identical(&expected, &test_path.join("bar")).await?;
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn unreadable_entries_do_not_stop_siblings() -> anyhow::Result<()> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let test_path = tmp_dir.path();
        let unreadable = [
            test_path.join("foo").join("0.txt"),
            test_path.join("foo").join("baz"),
        ];
        for path in &unreadable {
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o000)).await?;
        }
        let report = walk(Operation::Copy, &test_path.join("foo"), &test_path.join("bar")).await;
        for path in &unreadable {
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
        }
        if testutils::running_as_root() {
            return Ok(());
        }
        // foo
        // |- 0.txt  <- cannot be read
        // |- bar    <- copied
        // |- baz    <- cannot be listed
        let failed: Vec<_> = report.failures.iter().filter_map(Error::path).collect();
        assert_eq!(failed.len(), 2, "{:?}", report.failures);
        assert!(failed.contains(&unreadable[0].as_path()));
        assert!(failed.contains(&unreadable[1].as_path()));
        assert_eq!(report.files_transferred, 3);
        for name in ["1.txt", "2.txt", "3.txt"] {
            assert!(test_path.join("bar").join("bar").join(name).exists());
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn copies_random_trees(tree in testutils::tree_strategy()) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let tmp_dir = tempfile::tempdir().unwrap();
                let src = tmp_dir.path().join("src");
                testutils::create_tree(&src, &tree).await.unwrap();
                let report = walk(Operation::Copy, &src, &tmp_dir.path().join("dst")).await;
                assert!(report.is_success(), "{:?}", report.failures);
                assert_eq!(report.files_transferred, tree.len());
                testutils::check_dirs_identical(&src, &tmp_dir.path().join("dst")).await.unwrap();
            });
        }
    }
}
