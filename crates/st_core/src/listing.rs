//! Listing page: the first page of summaries plus manual "load more".

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cms::{ContentSource, PageFetcher};
use crate::config::CmsConfig;
use crate::types::{ListingEntry, SummaryPage};
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub current_page: u32,
    pub next_page_token: Option<String>,
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many entries were appended.
    Appended(usize),
    /// No continuation token; nothing was fetched.
    Exhausted,
    /// Another load is still outstanding; nothing was fetched.
    InFlight,
}

pub struct ListingController {
    state: Mutex<PaginationState>,
    visited: Mutex<HashSet<String>>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ListingController {
    pub fn new(state: PaginationState) -> Self {
        Self {
            state: Mutex::new(state),
            visited: Mutex::new(HashSet::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Shapes the initially supplied page, formatting every date once.
    pub fn from_initial(page: SummaryPage) -> Result<Self> {
        let entries = page
            .results
            .into_iter()
            .map(ListingEntry::from_document)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(PaginationState {
            current_page: page.page,
            next_page_token: page.next_page,
            entries,
        }))
    }

    fn lock(&self) -> MutexGuard<'_, PaginationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the continuation page and appends its entries.
    ///
    /// Without a token this is a no-op. While a previous call is still
    /// awaiting its response, further calls return [`LoadOutcome::InFlight`]
    /// without fetching. On error the state is left as it was. A returned
    /// token that was already fetched ends the listing instead of looping.
    pub async fn load_next_page<F>(&self, fetcher: &F) -> Result<LoadOutcome>
    where
        F: PageFetcher + ?Sized,
    {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Continuation fetch already in flight, ignoring");
            return Ok(LoadOutcome::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let token = self.lock().next_page_token.clone();
        let Some(token) = token else {
            return Ok(LoadOutcome::Exhausted);
        };

        debug!("Fetching continuation page {}", token);
        let page = fetcher.fetch_page(&token).await?;
        let fetched = page
            .results
            .into_iter()
            .map(ListingEntry::from_document)
            .collect::<Result<Vec<_>>>()?;
        let appended = fetched.len();

        let next_page_token = {
            let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
            visited.insert(token);
            page.next_page.filter(|next| {
                let repeated = visited.contains(next);
                if repeated {
                    warn!("Continuation token {} was already fetched, stopping", next);
                }
                !repeated
            })
        };

        let mut state = self.lock();
        state.entries.extend(fetched);
        state.next_page_token = next_page_token;
        state.current_page = page.page;

        Ok(LoadOutcome::Appended(appended))
    }

    /// Loads up to `pages` continuation pages, stopping once exhausted.
    /// Returns how many pages were fetched.
    pub async fn load_pages<F>(&self, fetcher: &F, pages: usize) -> Result<usize>
    where
        F: PageFetcher + ?Sized,
    {
        let mut loaded = 0;
        for _ in 0..pages {
            match self.load_next_page(fetcher).await? {
                LoadOutcome::Appended(_) => loaded += 1,
                LoadOutcome::Exhausted | LoadOutcome::InFlight => break,
            }
        }
        Ok(loaded)
    }

    /// Follows continuation tokens until none remain.
    pub async fn load_all<F>(&self, fetcher: &F) -> Result<usize>
    where
        F: PageFetcher + ?Sized,
    {
        self.load_pages(fetcher, usize::MAX).await
    }

    pub fn entries(&self) -> Vec<ListingEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_page(&self) -> u32 {
        self.lock().current_page
    }

    pub fn next_page_token(&self) -> Option<String> {
        self.lock().next_page_token.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().next_page_token.is_some()
    }

    pub fn snapshot(&self) -> PaginationState {
        self.lock().clone()
    }
}

/// Loads the first listing page the way the static build does.
pub async fn load_initial_listing<S>(source: &S, config: &CmsConfig) -> Result<ListingController>
where
    S: ContentSource + ?Sized,
{
    let page = source
        .fetch_by_type(&config.document_type, config.page_size)
        .await?;
    ListingController::from_initial(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, SummaryData};
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn doc(uid: &str, date: &str, title: &str) -> Document<SummaryData> {
        Document {
            uid: Some(uid.to_string()),
            first_publication_date: Some(date.to_string()),
            data: SummaryData {
                title: title.to_string(),
                subtitle: "S".to_string(),
                author: "A".to_string(),
            },
        }
    }

    fn page(number: u32, next: Option<&str>, results: Vec<Document<SummaryData>>) -> SummaryPage {
        SummaryPage {
            page: number,
            results_per_page: 1,
            total_results_size: 0,
            total_pages: 0,
            next_page: next.map(str::to_string),
            prev_page: None,
            results,
        }
    }

    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, SummaryPage>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl MockFetcher {
        fn with_page(mut self, token: &str, page: SummaryPage) -> Self {
            self.pages.insert(token.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch_page(&self, next_page: &str) -> Result<SummaryPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.pages
                .get(next_page)
                .cloned()
                .ok_or_else(|| Error::NotFound(next_page.to_string()))
        }
    }

    fn initial() -> ListingController {
        ListingController::from_initial(page(
            1,
            Some("url2"),
            vec![doc("a", "2021-01-01", "T")],
        ))
        .unwrap()
    }

    #[test]
    fn test_initial_dates_are_formatted() {
        let listing = initial();
        let entries = listing.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary.title, "T");
        assert!(entries[0].published.starts_with("01 "));
        assert!(entries[0].published.ends_with("2021"));
        assert_eq!(listing.current_page(), 1);
        assert!(listing.has_more());
    }

    #[tokio::test]
    async fn test_load_next_page_appends_in_order() {
        let listing = initial();
        let before = listing.entries();
        let fetcher = MockFetcher::default().with_page(
            "url2",
            page(2, None, vec![doc("b", "2021-03-19T00:00:00Z", "U"), doc("c", "2021-03-20", "V")]),
        );

        let outcome = listing.load_next_page(&fetcher).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended(2));

        let after = listing.entries();
        assert_eq!(&after[..1], &before[..]);
        let uids: Vec<_> = after.iter().map(|e| e.summary.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
        assert!(after[1].published.to_lowercase().contains("mar"));
        assert_eq!(listing.current_page(), 2);
        assert!(!listing.has_more());
    }

    #[tokio::test]
    async fn test_no_token_is_a_noop() {
        let listing = ListingController::from_initial(page(1, None, vec![doc("a", "2021-01-01", "T")])).unwrap();
        let before = listing.snapshot();
        let fetcher = MockFetcher::default();

        let outcome = listing.load_next_page(&fetcher).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Exhausted);
        assert_eq!(listing.snapshot(), before);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let listing = initial();
        let fetcher = MockFetcher::default().with_page("url2", page(2, None, vec![doc("a", "2021-01-01", "T")]));
        listing.load_next_page(&fetcher).await.unwrap();
        assert_eq!(listing.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        let listing = initial();
        let before = listing.snapshot();
        let fetcher = MockFetcher::default();

        assert!(listing.load_next_page(&fetcher).await.is_err());
        assert_eq!(listing.snapshot(), before);

        // The in-flight flag is released after a failure.
        let fetcher = fetcher.with_page("url2", page(2, None, vec![]));
        assert_eq!(listing.load_next_page(&fetcher).await.unwrap(), LoadOutcome::Appended(0));
    }

    #[tokio::test]
    async fn test_concurrent_loads_issue_a_single_fetch() {
        let gate = Arc::new(Notify::new());
        let fetcher = MockFetcher {
            gate: Some(gate.clone()),
            ..Default::default()
        }
        .with_page("url2", page(2, Some("url3"), vec![doc("b", "2021-01-02", "U")]));
        let listing = initial();

        let (first, second, _) = futures::join!(
            listing.load_next_page(&fetcher),
            listing.load_next_page(&fetcher),
            async { gate.notify_one() },
        );

        assert_eq!(first.unwrap(), LoadOutcome::Appended(1));
        assert_eq!(second.unwrap(), LoadOutcome::InFlight);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(listing.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_token_ends_the_listing() {
        let listing = initial();
        let fetcher = MockFetcher::default()
            .with_page("url2", page(2, Some("url3"), vec![doc("b", "2021-01-02", "U")]))
            .with_page("url3", page(3, Some("url2"), vec![doc("c", "2021-01-03", "V")]));

        assert_eq!(listing.load_all(&fetcher).await.unwrap(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(listing.len(), 3);
        assert!(!listing.has_more());
    }

    #[tokio::test]
    async fn test_self_referencing_token() {
        let listing = initial();
        let fetcher = MockFetcher::default()
            .with_page("url2", page(2, Some("url2"), vec![doc("b", "2021-01-02", "U")]));

        assert_eq!(listing.load_all(&fetcher).await.unwrap(), 1);
        assert_eq!(listing.len(), 2);
        assert!(listing.next_page_token().is_none());
    }

    #[tokio::test]
    async fn test_load_all_follows_tokens() {
        let listing = initial();
        let fetcher = MockFetcher::default()
            .with_page("url2", page(2, Some("url3"), vec![doc("b", "2021-01-02", "U")]))
            .with_page("url3", page(3, None, vec![doc("c", "2021-01-03", "V")]));

        assert_eq!(listing.load_all(&fetcher).await.unwrap(), 2);
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.current_page(), 3);
        assert_eq!(listing.load_pages(&fetcher, 5).await.unwrap(), 0);
    }
}
