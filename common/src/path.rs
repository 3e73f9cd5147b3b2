use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Directory,
}

/// A source path that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: std::path::PathBuf,
    pub kind: SourceKind,
}

impl ResolvedSource {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == SourceKind::Directory
    }
}

fn absolute(raw: &str) -> Result<std::path::PathBuf, Error> {
    if raw.is_empty() {
        return Err(Error::InvalidArgument("empty path".to_string()));
    }
    std::path::absolute(raw).map_err(|error| Error::io(std::path::Path::new(raw), &error))
}

/// Makes `raw` absolute and checks what it points to. Symlinks are followed.
pub async fn resolve_source(raw: &str) -> Result<ResolvedSource, Error> {
    let path = absolute(raw)?;
    match tokio::fs::metadata(&path).await {
        Ok(metadata) => {
            let kind = if metadata.is_dir() {
                SourceKind::Directory
            } else {
                SourceKind::File
            };
            tracing::debug!("resolved source {:?} as {:?}", &path, kind);
            Ok(ResolvedSource { path, kind })
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(path)),
        Err(error) => Err(Error::io(&path, &error)),
    }
}

/// Makes the destination absolute, it does not need to exist.
///
/// - Without trailing slash the path is the final destination name:
///   `A/B -> C/D` creates `C/D`
/// - With trailing slash the path is a directory to transfer into:
///   `A/B -> C/D/` creates `C/D/B`
pub fn resolve_destination(raw: &str, source: &ResolvedSource) -> Result<std::path::PathBuf, Error> {
    let destination = absolute(raw)?;
    if raw.ends_with('/') {
        let name = source.path.file_name().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "source {} has no file name to place into {}",
                source.path.display(),
                raw
            ))
        })?;
        return Ok(destination.join(name));
    }
    Ok(destination)
}

/// Resolves symlinks and `..` in the longest existing prefix of `path`, the missing rest
/// is appended lexically since it cannot contain symlinks.
async fn canonical(path: &std::path::Path) -> Result<std::path::PathBuf, Error> {
    let mut existing = path;
    let mut missing = vec![];
    loop {
        match tokio::fs::canonicalize(existing).await {
            Ok(mut resolved) => {
                for component in missing.iter().rev() {
                    match component {
                        std::path::Component::ParentDir => {
                            resolved.pop();
                        }
                        std::path::Component::Normal(name) => resolved.push(name),
                        _ => {}
                    }
                }
                return Ok(resolved);
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let (Some(component), Some(parent)) =
                    (existing.components().next_back(), existing.parent())
                else {
                    return Err(Error::io(path, &error));
                };
                missing.push(component);
                existing = parent;
            }
            Err(error) => return Err(Error::io(existing, &error)),
        }
    }
}

/// Rejects transfers whose destination is the source itself or lies inside it.
///
/// Both paths are compared after resolving symlinks and `..`, a source spelled differently
/// from the destination must not slip through: the walker would keep descending into its
/// own output.
pub async fn check_not_nested(
    source: &ResolvedSource,
    destination: &std::path::Path,
) -> Result<(), Error> {
    let real_source = canonical(&source.path).await?;
    let real_destination = canonical(destination).await?;
    tracing::debug!(
        "comparing {:?} with destination {:?}",
        &real_source,
        &real_destination
    );
    if real_destination == real_source {
        return Err(Error::InvalidArgument(format!(
            "{} and {} are the same path",
            source.path.display(),
            destination.display()
        )));
    }
    if source.is_dir() && real_destination.starts_with(&real_source) {
        return Err(Error::InvalidArgument(format!(
            "cannot transfer directory {} into itself, {}",
            source.path.display(),
            destination.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let missing = tmp_dir.path().join("no").join("such").join("path");
        let error = resolve_source(missing.to_str().unwrap()).await.unwrap_err();
        assert_eq!(error, Error::NotFound(missing.clone()));
        assert!(error.to_string().contains(missing.to_str().unwrap()));
    }

    #[tokio::test]
    async fn classifies_files_and_directories() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let file = tmp_dir.path().join("x.txt");
        tokio::fs::write(&file, "x").await?;
        let resolved = resolve_source(file.to_str().unwrap()).await?;
        assert_eq!(resolved.kind, SourceKind::File);
        assert!(resolved.path.is_absolute());
        let resolved = resolve_source(tmp_dir.path().to_str().unwrap()).await?;
        assert_eq!(resolved.kind, SourceKind::Directory);
        Ok(())
    }

    #[tokio::test]
    async fn relative_source_becomes_absolute() -> anyhow::Result<()> {
        // the test binary runs in the package directory
        let resolved = resolve_source("Cargo.toml").await?;
        assert!(resolved.path.is_absolute());
        assert!(resolved.path.ends_with("Cargo.toml"));
        Ok(())
    }

    #[test]
    fn empty_source_is_invalid() {
        assert!(matches!(absolute(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn trailing_slash_places_source_inside() -> anyhow::Result<()> {
        let source = ResolvedSource {
            path: std::path::PathBuf::from("/tmp/a"),
            kind: SourceKind::Directory,
        };
        assert_eq!(
            resolve_destination("/tmp/c/", &source)?,
            std::path::PathBuf::from("/tmp/c/a")
        );
        assert_eq!(
            resolve_destination("/tmp/c", &source)?,
            std::path::PathBuf::from("/tmp/c")
        );
        Ok(())
    }

    async fn source_dir(path: &std::path::Path) -> ResolvedSource {
        resolve_source(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn nested_destination_is_rejected() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let a = tmp_dir.path().join("a");
        tokio::fs::create_dir(&a).await?;
        let source = source_dir(&a).await;
        assert!(check_not_nested(&source, &a.join("b")).await.is_err());
        assert!(check_not_nested(&source, &a.join("b").join("c")).await.is_err());
        assert!(check_not_nested(&source, &a).await.is_err());
        assert!(check_not_nested(&source, &tmp_dir.path().join("ab")).await.is_ok());
        assert!(check_not_nested(&source, &tmp_dir.path().join("c")).await.is_ok());
        let file = tmp_dir.path().join("a.txt");
        tokio::fs::write(&file, "a").await?;
        let source = resolve_source(file.to_str().unwrap()).await?;
        assert!(check_not_nested(&source, &file).await.is_err());
        assert!(check_not_nested(&source, &tmp_dir.path().join("a.txt.bak")).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn dotdot_source_is_resolved_before_comparing() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let a = tmp_dir.path().join("a");
        tokio::fs::create_dir(&a).await?;
        let source = source_dir(&a.join("..").join("a")).await;
        let error = check_not_nested(&source, &a.join("sub")).await.unwrap_err();
        assert!(matches!(error, Error::InvalidArgument(_)));
        // the destination may also take a detour through a missing directory
        let detour = a.join("x").join("..").join("sub");
        let source = source_dir(&a).await;
        assert!(check_not_nested(&source, &detour).await.is_err());
        let outside = a.join("..").join("c");
        assert!(check_not_nested(&source, &outside).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn symlinked_source_is_resolved_before_comparing() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let a = tmp_dir.path().join("a");
        tokio::fs::create_dir(&a).await?;
        let link = tmp_dir.path().join("link_to_a");
        tokio::fs::symlink(&a, &link).await?;
        let source = source_dir(&link).await;
        assert!(source.is_dir());
        let error = check_not_nested(&source, &a.join("sub")).await.unwrap_err();
        assert!(matches!(error, Error::InvalidArgument(_)));
        // and the other way around, a destination reaching into the source through a link
        let source = source_dir(&a).await;
        assert!(check_not_nested(&source, &link.join("sub")).await.is_err());
        Ok(())
    }
}
