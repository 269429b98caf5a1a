//! Atomic page commits: temp-write then rename.
//!
//! A page is streamed into a uniquely-named temp file next to its
//! final location and renamed into place only after the stream fully
//! succeeds. A failed production (including a timeout) removes the
//! temp file and leaves the target untouched, so a failed build never
//! leaves truncated pages or stray `*.tmp` files behind.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::CommitFailure;
use crate::render::RenderStream;

/// Per-process sequence for collision-free temp names under
/// concurrent commits.
static COMMIT_SEQ: AtomicU64 = AtomicU64::new(0);

/// `page.html` -> `page.html.<pid>-<seq>-<millis>.tmp`, colocated with
/// the target so the final rename never crosses filesystems.
fn temp_path(target: &Path) -> PathBuf {
    let seq = COMMIT_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut name = target.as_os_str().to_os_string();
    name.push(format!(".{:x}-{seq:x}-{millis}.tmp", process::id()));
    PathBuf::from(name)
}

/// Write `stream` to `target`, renaming into place only on full
/// success.
///
/// Parent directories are created as needed. On any failure the temp
/// file is removed first and the original error re-raised; `target`
/// is never truncated or partially overwritten.
pub async fn commit_stream(target: &Path, mut stream: RenderStream) -> Result<(), CommitFailure> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(target);

    match write_stream(&temp, &mut stream).await {
        Ok(()) => match fs::rename(&temp, target).await {
            Ok(()) => Ok(()),
            Err(error) => {
                fs::remove_file(&temp).await.ok();
                Err(error.into())
            }
        },
        Err(error) => {
            fs::remove_file(&temp).await.ok();
            Err(error)
        }
    }
}

async fn write_stream(temp: &Path, stream: &mut RenderStream) -> Result<(), CommitFailure> {
    let mut file = fs::File::create(temp).await?;
    while let Some(chunk) = stream.next_chunk().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::render::{Markup, render_to_stream};

    fn tmp_entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_commit_writes_target_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("page/index.html");

        let stream = render_to_stream(Markup::from_string("<p>hi</p>"), None);
        commit_stream(&target, stream).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "<p>hi</p>");
        assert!(tmp_entries(target.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_production_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index.html");

        let markup = Markup::from_producer(|sink| async move {
            sink.write("some bytes").await?;
            anyhow::bail!("render died")
        });
        let result = commit_stream(&target, render_to_stream(markup, None)).await;

        assert!(matches!(
            result,
            Err(CommitFailure::Render(RenderError::Failed(_)))
        ));
        assert!(!target.exists());
        assert!(tmp_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_overwrite_preserves_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index.html");
        std::fs::write(&target, "previous build").unwrap();

        let markup = Markup::from_producer(|sink| async move {
            sink.write("half a page").await?;
            anyhow::bail!("render died")
        });
        let result = commit_stream(&target, render_to_stream(markup, None)).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "previous build");
        assert!(tmp_entries(dir.path()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cleans_up_and_tags_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("slow.html");

        let markup = Markup::from_producer(|sink| async move {
            sink.write("started").await?;
            std::future::pending::<()>().await;
            Ok(())
        });
        let stream = render_to_stream(markup, Some(std::time::Duration::from_millis(10)));
        let result = commit_stream(&target, stream).await;

        assert!(matches!(
            result,
            Err(CommitFailure::Render(RenderError::Timeout(_)))
        ));
        assert!(!target.exists());
        assert!(tmp_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_commits_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.html");
        let b = dir.path().join("b.html");

        let (ra, rb) = tokio::join!(
            commit_stream(&a, render_to_stream(Markup::from_string("aaa"), None)),
            commit_stream(&b, render_to_stream(Markup::from_string("bbb"), None)),
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(std::fs::read_to_string(&a).unwrap(), "aaa");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "bbb");
        assert!(tmp_entries(dir.path()).is_empty());
    }
}
