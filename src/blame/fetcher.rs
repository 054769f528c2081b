// Blame fetcher.
// Resolves a workspace file to its repository coordinates and fetches its blame once per session.

use std::sync::Arc;

use crate::auth::CredentialProvider;
use crate::error::{BlameError, Result};
use crate::github::{BlameQuery, BlameSource};
use crate::workspace::{FileIdentity, ProviderLocation, WorkspaceProvider};

use super::cache::{BlameCache, Lookup, Outcome};
use super::{BlameFile, CancellationToken};

/// Memoized, de-duplicated blame fetching keyed by file identity.
pub struct BlameFetcher {
    workspace: Arc<dyn WorkspaceProvider>,
    credentials: Arc<dyn CredentialProvider>,
    source: Arc<dyn BlameSource>,
    cache: BlameCache,
}

impl BlameFetcher {
    pub fn new(
        workspace: Arc<dyn WorkspaceProvider>,
        credentials: Arc<dyn CredentialProvider>,
        source: Arc<dyn BlameSource>,
    ) -> Self {
        Self {
            workspace,
            credentials,
            source,
            cache: BlameCache::new(),
        }
    }

    /// Blame for a file.
    ///
    /// Concurrent callers for the same file share one fetch. Returns `Ok(None)`
    /// only to a caller whose own token cancelled the fetch before the remote
    /// request; nothing is cached in that case, and callers that joined it start
    /// a fetch of their own. Failures evict the entry so a later call retries.
    pub async fn resolve(
        &self,
        file: &FileIdentity,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<Arc<BlameFile>>> {
        loop {
            match self.cache.lookup(file) {
                Lookup::Hit(blame) => {
                    tracing::trace!(%file, "Blame cache hit");
                    return Ok(Some(blame));
                }
                Lookup::Wait(waiter) => {
                    tracing::trace!(%file, "Joining in-flight blame fetch");
                    match waiter.wait().await {
                        // Abandoned or cancelled by its owner: claim a fresh fetch under our own token.
                        None | Some(Ok(None)) => {
                            tracing::trace!(%file, "Joined fetch ended without a result, retrying");
                        }
                        Some(outcome) => return outcome,
                    }
                }
                Lookup::Claimed(pending) => {
                    let outcome = self.fetch(file, cancel).await;
                    match &outcome {
                        Ok(Some(blame)) => {
                            tracing::debug!(%file, ranges = blame.ranges.len(), "Blame fetched")
                        }
                        Ok(None) => tracing::debug!(%file, "Blame fetch cancelled"),
                        Err(e) => tracing::warn!(%file, error = %e, "Blame fetch failed"),
                    }
                    return pending.complete(outcome);
                }
            }
        }
    }

    /// Completed blame for a file without fetching.
    pub fn cached(&self, file: &FileIdentity) -> Option<Arc<BlameFile>> {
        self.cache.get(file)
    }

    pub fn cache(&self) -> &BlameCache {
        &self.cache
    }

    /// Forget every result. Used on teardown.
    pub fn clear(&self) {
        self.cache.clear();
    }

    async fn fetch(&self, file: &FileIdentity, cancel: Option<&CancellationToken>) -> Outcome {
        let token = self.credentials.token().await?;

        let revision = self
            .workspace
            .revision(file)
            .await?
            .ok_or_else(|| BlameError::MetadataUnavailable(file.to_string()))?;
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Ok(None);
        }

        let provider_path = self
            .workspace
            .provider_path(file)
            .ok_or_else(|| BlameError::MetadataUnavailable(file.to_string()))?;
        let location = ProviderLocation::parse(&provider_path)?;

        let query = BlameQuery {
            repository: location.repo.clone(),
            owner: location.owner.clone(),
            revision: revision.revision.clone(),
            path: location.path.clone(),
        };
        tracing::debug!(%file, owner = %query.owner, repo = %query.repository, revision = %query.revision, "Requesting blame");
        let ranges = self.source.blame(&token, &query).await?;

        Ok(Some(Arc::new(BlameFile {
            location,
            revision,
            ranges,
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::auth::StaticToken;
    use crate::blame::cache::EntryState;
    use crate::github::{BlameRange, Commit, CommitAuthor, GitUser};
    use crate::logging;
    use crate::workspace::{HeadType, RevisionInfo};

    pub(crate) fn range(start: u32, end: u32, age: i64) -> BlameRange {
        BlameRange {
            starting_line: start,
            ending_line: end,
            age,
            commit: Commit {
                oid: format!("{:040x}", start),
                message: format!("change lines {}-{}", start, end),
                authored_date: Utc::now(),
                url: "https://github.com/o/r/commit/1".to_string(),
                author: CommitAuthor {
                    name: "Ada".to_string(),
                    user: Some(GitUser {
                        url: "https://github.com/ada".to_string(),
                        avatar_url: None,
                    }),
                },
            },
        }
    }

    /// Workspace where every `vfs://github/...` file is on `main`.
    pub(crate) struct MockWorkspace {
        /// Cancelled while the revision is being resolved.
        pub on_revision: Option<CancellationToken>,
    }

    impl MockWorkspace {
        pub(crate) fn new() -> Self {
            Self { on_revision: None }
        }
    }

    #[async_trait]
    impl WorkspaceProvider for MockWorkspace {
        async fn revision(&self, file: &FileIdentity) -> Result<Option<RevisionInfo>> {
            tokio::task::yield_now().await;
            if let Some(token) = &self.on_revision {
                token.cancel();
            }
            if self.provider_path(file).is_none() {
                return Ok(None);
            }
            Ok(Some(RevisionInfo {
                kind: HeadType::Branch,
                name: "main".to_string(),
                revision: "main".to_string(),
            }))
        }

        fn provider_path(&self, file: &FileIdentity) -> Option<String> {
            file.as_str()
                .strip_prefix("vfs://github")
                .map(str::to_string)
        }
    }

    /// Blame source replaying scripted responses and counting calls.
    pub(crate) struct MockSource {
        pub calls: AtomicUsize,
        pub queries: Mutex<Vec<BlameQuery>>,
        responses: Mutex<VecDeque<Result<Vec<BlameRange>>>>,
    }

    impl MockSource {
        pub(crate) fn new(responses: Vec<Result<Vec<BlameRange>>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BlameSource for MockSource {
        async fn blame(&self, _token: &str, query: &BlameQuery) -> Result<Vec<BlameRange>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            tokio::task::yield_now().await;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![range(1, 1, 0)]))
        }
    }

    pub(crate) fn fetcher(workspace: MockWorkspace, source: Arc<MockSource>) -> BlameFetcher {
        BlameFetcher::new(
            Arc::new(workspace),
            Arc::new(StaticToken::new("token")),
            source,
        )
    }

    fn file() -> FileIdentity {
        FileIdentity::github("o/r/src/lib.rs", None)
    }

    #[tokio::test]
    async fn test_resolve_builds_query() {
        logging::init_test();
        let source = Arc::new(MockSource::new(vec![Ok(vec![range(1, 3, 2)])]));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));

        let blame = fetcher.resolve(&file(), None).await.unwrap().unwrap();
        assert_eq!(blame.ranges.len(), 1);
        assert_eq!(blame.location.path, "src/lib.rs");
        assert_eq!(
            source.queries.lock().unwrap()[0],
            BlameQuery {
                repository: "r".to_string(),
                owner: "o".to_string(),
                revision: "main".to_string(),
                path: "src/lib.rs".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_request() {
        let source = Arc::new(MockSource::new(vec![Ok(vec![range(1, 3, 2)])]));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = file();

        let (first, second) = tokio::join!(fetcher.resolve(&file, None), fetcher.resolve(&file, None));
        let first = first.unwrap().unwrap();
        let second = second.unwrap().unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_cached_result_is_stable() {
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = file();

        let fetched = fetcher.resolve(&file, None).await.unwrap().unwrap();
        let again = fetcher.resolve(&file, None).await.unwrap().unwrap();
        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&fetched, &again));
        assert!(Arc::ptr_eq(&fetcher.cached(&file).unwrap(), &fetched));
        assert!(Arc::ptr_eq(&fetcher.cached(&file).unwrap(), &fetched));
    }

    #[tokio::test]
    async fn test_failure_is_retried_by_next_call() {
        let source = Arc::new(MockSource::new(vec![Err(BlameError::RemoteRequestFailed(
            "503".to_string(),
        ))]));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = file();

        let err = fetcher.resolve(&file, None).await.unwrap_err();
        assert_eq!(err, BlameError::RemoteRequestFailed("503".to_string()));
        assert_eq!(fetcher.cache().state(&file), EntryState::NotStarted);

        assert!(fetcher.resolve(&file, None).await.unwrap().is_some());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_waiters_share_the_failure() {
        let source = Arc::new(MockSource::new(vec![Err(BlameError::MalformedResponse(
            "no ranges".to_string(),
        ))]));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = file();

        let (first, second) = tokio::join!(fetcher.resolve(&file, None), fetcher.resolve(&file, None));
        assert!(matches!(first, Err(BlameError::MalformedResponse(_))));
        assert!(matches!(second, Err(BlameError::MalformedResponse(_))));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remote_and_cache() {
        let token = CancellationToken::new();
        let workspace = MockWorkspace {
            on_revision: Some(token.clone()),
        };
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = fetcher(workspace, Arc::clone(&source));
        let file = file();

        assert!(fetcher.resolve(&file, Some(&token)).await.unwrap().is_none());
        assert_eq!(source.calls(), 0);
        assert_eq!(fetcher.cache().state(&file), EntryState::NotStarted);

        assert!(fetcher.resolve(&file, None).await.unwrap().is_some());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_waiter_is_not_cancelled_by_owner_token() {
        let token = CancellationToken::new();
        let workspace = MockWorkspace {
            on_revision: Some(token.clone()),
        };
        let source = Arc::new(MockSource::new(vec![Ok(vec![range(1, 4, 3)])]));
        let fetcher = fetcher(workspace, Arc::clone(&source));
        let file = file();

        let (cancelled, joined) = tokio::join!(
            fetcher.resolve(&file, Some(&token)),
            fetcher.resolve(&file, None)
        );
        assert!(cancelled.unwrap().is_none());
        let joined = joined.unwrap().unwrap();
        assert_eq!(joined.ranges.len(), 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(fetcher.cache().state(&file), EntryState::Done);
        assert!(Arc::ptr_eq(&fetcher.cached(&file).unwrap(), &joined));
    }

    #[tokio::test]
    async fn test_untracked_file_is_metadata_unavailable() {
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = FileIdentity::new("file:///tmp/notes.txt");

        assert!(matches!(
            fetcher.resolve(&file, None).await,
            Err(BlameError::MetadataUnavailable(_))
        ));
        assert_eq!(source.calls(), 0);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = BlameFetcher::new(
            Arc::new(MockWorkspace::new()),
            Arc::new(StaticToken::new("")),
            Arc::clone(&source) as Arc<dyn BlameSource>,
        );
        assert!(matches!(
            fetcher.resolve(&file(), None).await,
            Err(BlameError::AuthFailed(_))
        ));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_distinct_files_fetch_independently() {
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let a = FileIdentity::github("o/r/a.rs", None);
        let b = FileIdentity::github("o/r/b.rs", None);

        let (a, b) = tokio::join!(fetcher.resolve(&a, None), fetcher.resolve(&b, None));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let source = Arc::new(MockSource::new(Vec::new()));
        let fetcher = fetcher(MockWorkspace::new(), Arc::clone(&source));
        let file = file();

        fetcher.resolve(&file, None).await.unwrap();
        fetcher.clear();
        assert!(fetcher.cached(&file).is_none());
        fetcher.resolve(&file, None).await.unwrap();
        assert_eq!(source.calls(), 2);
    }
}
