use crate::core::error::ProviderError;
use crate::metrics::collector::Metrics;
use crate::models::search::{SearchRequest, SearchResult};
use crate::monitor::MonitoringConfig;
use crate::providers::SourceProvider;
use crate::stores::blacklist::BlacklistStore;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fans a query out to every selected provider and merges the answers
pub struct SearchAggregator {
    /// Priority order
    providers: Vec<Arc<dyn SourceProvider>>,
    blacklist: Arc<BlacklistStore>,
    config: Arc<MonitoringConfig>,
    metrics: Arc<Metrics>,
}

struct Ranked {
    priority: usize,
    result: SearchResult,
}

impl SearchAggregator {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        blacklist: Arc<BlacklistStore>,
        config: Arc<MonitoringConfig>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            providers,
            blacklist,
            config,
            metrics,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Query, merge, filter and rank
    ///
    /// Provider failures and timeouts only shrink the result set. The output
    /// never contains a blacklisted identifier and is ordered by seeds, then
    /// size, then source priority, then title.
    pub async fn search(&self, request: &SearchRequest) -> Vec<SearchResult> {
        self.metrics.increment_searches();
        let started = Instant::now();

        let selected: Vec<(usize, &Arc<dyn SourceProvider>)> = self
            .providers
            .iter()
            .enumerate()
            .filter(|(_, provider)| match &request.sources {
                Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(provider.name())),
                None => true,
            })
            .collect();

        if selected.is_empty() {
            warn!(query = %request.query, "No enabled source matches the request");
            return Vec::new();
        }

        let queries = selected
            .iter()
            .map(|(priority, provider)| self.query_provider(*priority, provider, &request.query));
        let responses = join_all(queries).await;

        let raw_count: usize = responses.iter().map(|r| r.len()).sum();
        let merged = dedup(responses.into_iter().flatten());

        let min_size = request.min_size.unwrap_or(self.config.min_size);
        let max_size = request.max_size.unwrap_or(self.config.max_size);

        let mut ranked: Vec<Ranked> = merged
            .into_iter()
            .filter(|r| !self.blacklist.contains(&r.result.info_hash))
            .filter(|r| !request.exclude.iter().any(|e| e.eq_ignore_ascii_case(&r.result.info_hash)))
            .filter(|r| r.result.size >= min_size && r.result.size <= max_size)
            .filter(|r| match (request.quality, r.result.quality) {
                (None, _) => true,
                // A declared tag is authoritative; keywords only stand in for a missing one
                (Some(wanted), Some(declared)) => wanted == declared,
                (Some(wanted), None) => wanted.matches_title(&r.result.title),
            })
            .filter(|r| has_video_payload(&r.result, &self.config.video_extensions))
            .collect();

        ranked.sort_by(rank);
        ranked.truncate(self.config.max_results);

        info!(
            query = %request.query,
            sources = selected.len(),
            raw = raw_count,
            returned = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );

        ranked.into_iter().map(|r| r.result).collect()
    }

    async fn query_provider(
        &self,
        priority: usize,
        provider: &Arc<dyn SourceProvider>,
        query: &str,
    ) -> Vec<Ranked> {
        let outcome = tokio::time::timeout(
            self.config.search_timeout,
            provider.query(query, self.config.max_results),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.config.search_timeout.as_secs())));

        match outcome {
            Ok(results) => {
                debug!(source = provider.name(), count = results.len(), "Provider answered");
                results
                    .into_iter()
                    .map(|result| Ranked { priority, result })
                    .collect()
            }
            Err(e) => {
                self.metrics.increment_provider_failures();
                warn!(source = provider.name(), error = %e, "Provider failed, continuing without it");
                Vec::new()
            }
        }
    }
}

/// Keep one copy per identifier: most seeds, then higher-priority source
fn dedup(results: impl Iterator<Item = Ranked>) -> Vec<Ranked> {
    let mut by_hash: HashMap<String, Ranked> = HashMap::new();

    for candidate in results {
        match by_hash.get(&candidate.result.info_hash) {
            Some(existing)
                if existing.result.seeds > candidate.result.seeds
                    || (existing.result.seeds == candidate.result.seeds
                        && existing.priority <= candidate.priority) => {}
            _ => {
                by_hash.insert(candidate.result.info_hash.clone(), candidate);
            }
        }
    }

    by_hash.into_values().collect()
}

fn has_video_payload(result: &SearchResult, extensions: &[String]) -> bool {
    if result.files.is_empty() {
        return true;
    }
    result.files.iter().any(|file| {
        let file = file.to_ascii_lowercase();
        extensions.iter().any(|ext| file.ends_with(ext.as_str()))
    })
}

fn rank(a: &Ranked, b: &Ranked) -> Ordering {
    b.result
        .seeds
        .cmp(&a.result.seeds)
        .then_with(|| b.result.size.cmp(&a.result.size))
        .then_with(|| a.priority.cmp(&b.priority))
        .then_with(|| a.result.title.cmp(&b.result.title))
        .then_with(|| a.result.info_hash.cmp(&b.result.info_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::blacklist::BlacklistReason;
    use crate::models::search::Quality;
    use crate::test_support::{result, FailingProvider, SlowProvider, StaticProvider};
    use std::time::Duration;

    const GB: u64 = 1_073_741_824;

    fn aggregator(providers: Vec<Arc<dyn SourceProvider>>, blacklist: Arc<BlacklistStore>) -> SearchAggregator {
        let config = MonitoringConfig {
            search_timeout: Duration::from_millis(200),
            max_results: 10,
            ..MonitoringConfig::default()
        };
        SearchAggregator::new(providers, blacklist, Arc::new(config), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_timed_out_provider_is_skipped() {
        let provider_b = StaticProvider::new(
            "b",
            vec![
                result('1', "Show S01E01 720p", GB, 5, "b"),
                result('2', "Show S01E01 1080p", GB, 40, "b"),
                result('3', "Show S01E01 480p", GB, 12, "b"),
            ],
        );
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(SlowProvider::new("a", Duration::from_secs(10))),
            Arc::new(provider_b),
        ];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let results = aggregator.search(&SearchRequest::new("Show S01E01")).await;

        let seeds: Vec<u32> = results.iter().map(|r| r.seeds).collect();
        assert_eq!(seeds, vec![40, 12, 5]);
        assert_eq!(aggregator.metrics.provider_failures.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_failing_provider_does_not_abort_search() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(FailingProvider::new("a")),
            Arc::new(StaticProvider::new("b", vec![result('1', "Movie 1080p", GB, 3, "b")])),
        ];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let results = aggregator.search(&SearchRequest::new("Movie")).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_blacklisted_and_excluded_results_are_dropped() {
        let blacklist = Arc::new(BlacklistStore::in_memory());
        blacklist.add(&"1".repeat(40), "old", BlacklistReason::Stalled).unwrap();

        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(StaticProvider::new(
            "a",
            vec![
                result('1', "Movie 1080p", GB, 100, "a"),
                result('2', "Movie 1080p", GB, 50, "a"),
                result('3', "Movie 1080p", GB, 10, "a"),
            ],
        ))];
        let aggregator = aggregator(providers, Arc::clone(&blacklist));

        let mut request = SearchRequest::new("Movie");
        request.exclude = vec!["3".repeat(40)];
        let results = aggregator.search(&request).await;

        let hashes: Vec<String> = results.into_iter().map(|r| r.info_hash).collect();
        assert_eq!(hashes, vec!["2".repeat(40)]);
    }

    #[tokio::test]
    async fn test_size_quality_and_payload_filters() {
        let mut no_video = result('4', "Movie 1080p", GB, 90, "a");
        no_video.files = vec!["Movie.exe".into(), "readme.txt".into()];
        let mut with_video = result('5', "Movie 1080p", GB, 80, "a");
        with_video.files = vec!["sample.txt".into(), "Movie.1080p.MKV".into()];
        let mut declared = result('6', "Movie", GB, 70, "a");
        declared.quality = Some(Quality::FullHd1080);

        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(StaticProvider::new(
            "a",
            vec![
                result('1', "Movie 1080p", 1024, 100, "a"),
                result('2', "Movie 1080p", 60 * GB, 100, "a"),
                result('3', "Movie 720p", GB, 100, "a"),
                no_video,
                with_video,
                declared,
            ],
        ))];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let results = aggregator
            .search(&SearchRequest::new("Movie").with_quality(Some(Quality::FullHd1080)))
            .await;

        let hashes: Vec<String> = results.into_iter().map(|r| r.info_hash).collect();
        assert_eq!(hashes, vec!["5".repeat(40), "6".repeat(40)]);
    }

    #[tokio::test]
    async fn test_declared_quality_wins_over_title_keywords() {
        let mut declared_1080 = result('1', "Movie HD", GB, 90, "a");
        declared_1080.quality = Some(Quality::FullHd1080);
        let mut undeclared = result('2', "Movie HD", GB, 80, "a");
        undeclared.quality = None;
        let mut declared_720 = result('3', "Movie", GB, 70, "a");
        declared_720.quality = Some(Quality::Hd720);

        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(StaticProvider::new(
            "a",
            vec![declared_1080, undeclared, declared_720],
        ))];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let results = aggregator
            .search(&SearchRequest::new("Movie").with_quality(Some(Quality::Hd720)))
            .await;

        let hashes: Vec<String> = results.into_iter().map(|r| r.info_hash).collect();
        assert_eq!(hashes, vec!["2".repeat(40), "3".repeat(40)]);
    }

    #[tokio::test]
    async fn test_explicit_size_bounds_override_defaults() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(StaticProvider::new(
            "a",
            vec![
                result('1', "Movie", GB, 10, "a"),
                result('2', "Movie", 3 * GB, 10, "a"),
            ],
        ))];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let mut request = SearchRequest::new("Movie");
        request.min_size = Some(2 * GB);
        request.max_size = Some(4 * GB);
        let results = aggregator.search(&request).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].info_hash, "2".repeat(40));
    }

    #[tokio::test]
    async fn test_dedup_keeps_best_copy_and_ranking_ties() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(StaticProvider::new(
                "first",
                vec![
                    result('1', "Same", GB, 10, "first"),
                    result('2', "Tie", GB, 7, "first"),
                ],
            )),
            Arc::new(StaticProvider::new(
                "second",
                vec![
                    result('1', "Same", GB, 25, "second"),
                    result('2', "Tie", GB, 7, "second"),
                    result('3', "Bigger", 2 * GB, 7, "second"),
                ],
            )),
        ];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let results = aggregator.search(&SearchRequest::new("x")).await;

        let summary: Vec<(char, u32, &str)> = results
            .iter()
            .map(|r| (r.info_hash.chars().next().unwrap(), r.seeds, r.source.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![('1', 25, "second"), ('3', 7, "second"), ('2', 7, "first")]
        );
    }

    #[tokio::test]
    async fn test_requested_sources_are_intersected() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(StaticProvider::new("a", vec![result('1', "Movie", GB, 1, "a")])),
            Arc::new(StaticProvider::new("b", vec![result('2', "Movie", GB, 1, "b")])),
        ];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        let mut request = SearchRequest::new("Movie");
        request.sources = Some(vec!["B".into(), "unknown".into()]);
        let results = aggregator.search(&request).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "b");

        request.sources = Some(vec!["unknown".into()]);
        assert!(aggregator.search(&request).await.is_empty());
    }

    #[tokio::test]
    async fn test_results_are_truncated() {
        let results: Vec<SearchResult> = "0123456789abcdef"
            .chars()
            .map(|c| result(c, "Movie", GB, 1, "a"))
            .collect();
        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(StaticProvider::new("a", results))];
        let aggregator = aggregator(providers, Arc::new(BlacklistStore::in_memory()));

        assert_eq!(aggregator.search(&SearchRequest::new("Movie")).await.len(), 10);
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let make = || -> Vec<Arc<dyn SourceProvider>> {
            vec![
                Arc::new(StaticProvider::new(
                    "a",
                    vec![result('1', "B", GB, 5, "a"), result('2', "A", GB, 5, "a")],
                )),
                Arc::new(StaticProvider::new("b", vec![result('3', "A", GB, 5, "b")])),
            ]
        };

        let first = aggregator(make(), Arc::new(BlacklistStore::in_memory()))
            .search(&SearchRequest::new("x"))
            .await;
        let second = aggregator(make(), Arc::new(BlacklistStore::in_memory()))
            .search(&SearchRequest::new("x"))
            .await;

        assert_eq!(first, second);
        let titles: Vec<&str> = first.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "A"]);
    }
}
