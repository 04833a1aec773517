use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::models::CardSet;
use crate::services::normalize::normalize_name;
use crate::services::pokemon_tcg::{PokemonTcgClient, PokemonTcgError};

/// How long a failed fetch suppresses further fetches.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(30);

struct CachedSets {
    fetched_at: Instant,
    sets: Arc<Vec<CardSet>>,
}

#[derive(Default)]
struct CacheState {
    cached: Option<CachedSets>,
    failed_at: Option<Instant>,
}

/// In-memory copy of the Pokemon TCG set list, refetched once it is older than `ttl`.
pub struct SetCache {
    ttl: Duration,
    failure_backoff: Duration,
    inner: RwLock<CacheState>,
}

enum Lookup {
    Hit(Arc<Vec<CardSet>>),
    BackingOff(Option<Arc<Vec<CardSet>>>),
    Miss,
}

impl SetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            inner: RwLock::new(CacheState::default()),
        }
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    fn lookup(&self, state: &CacheState) -> Lookup {
        if let Some(cached) = state.cached.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Lookup::Hit(cached.sets.clone());
            }
        }

        match state.failed_at {
            Some(failed_at) if failed_at.elapsed() < self.failure_backoff => {
                Lookup::BackingOff(state.cached.as_ref().map(|c| c.sets.clone()))
            }
            _ => Lookup::Miss,
        }
    }

    fn backing_off(stale: Option<Arc<Vec<CardSet>>>) -> Result<Arc<Vec<CardSet>>, PokemonTcgError> {
        stale.ok_or_else(|| {
            PokemonTcgError::ApiError("Set list unavailable, retry pending".to_string())
        })
    }

    /// Returns the cached list, fetching it when missing or expired.
    ///
    /// A failed refetch serves the stale list if there is one, and no
    /// refetch is attempted again until the failure backoff has passed.
    pub async fn sets(&self, client: &PokemonTcgClient) -> Result<Arc<Vec<CardSet>>, PokemonTcgError> {
        match self.lookup(&*self.inner.read().await) {
            Lookup::Hit(sets) => return Ok(sets),
            Lookup::BackingOff(stale) => return Self::backing_off(stale),
            Lookup::Miss => {}
        }

        let mut guard = self.inner.write().await;

        // another request may have refreshed while we waited for the lock
        match self.lookup(&guard) {
            Lookup::Hit(sets) => return Ok(sets),
            Lookup::BackingOff(stale) => return Self::backing_off(stale),
            Lookup::Miss => {}
        }

        match client.fetch_sets().await {
            Ok(sets) => {
                let sets = Arc::new(sets);
                guard.cached = Some(CachedSets {
                    fetched_at: Instant::now(),
                    sets: sets.clone(),
                });
                guard.failed_at = None;
                Ok(sets)
            }
            Err(e) => {
                guard.failed_at = Some(Instant::now());
                match guard.cached.as_ref() {
                    Some(stale) => {
                        tracing::warn!(
                            error = %e,
                            age_secs = stale.fetched_at.elapsed().as_secs(),
                            "Set list refresh failed, serving stale copy"
                        );
                        Ok(stale.sets.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Refetches regardless of age. Returns the number of sets now cached.
    pub async fn refresh(&self, client: &PokemonTcgClient) -> Result<usize, PokemonTcgError> {
        let sets = client.fetch_sets().await?;
        let count = sets.len();

        let mut guard = self.inner.write().await;
        guard.cached = Some(CachedSets {
            fetched_at: Instant::now(),
            sets: Arc::new(sets),
        });
        guard.failed_at = None;

        Ok(count)
    }

    /// Age of the cached list, `None` before the first fetch.
    pub async fn age(&self) -> Option<Duration> {
        self.inner
            .read()
            .await
            .cached
            .as_ref()
            .map(|cached| cached.fetched_at.elapsed())
    }
}

fn set_aliases(name: &str) -> Vec<String> {
    let normalized = normalize_name(name);
    let mut aliases = vec![normalized.clone()];

    let trimmed = normalized
        .strip_prefix("pokemon ")
        .unwrap_or(&normalized)
        .trim_end_matches(" set")
        .to_string();
    if trimmed != normalized && !trimmed.is_empty() {
        aliases.push(trimmed);
    }

    aliases
}

/// Resolves a set name as written by the vision model against the set list.
pub fn find_set<'a>(sets: &'a [CardSet], name: &str) -> Option<&'a CardSet> {
    let raw = name.trim();
    let aliases = set_aliases(raw);
    if aliases[0].is_empty() {
        return None;
    }

    let exact = sets.iter().find(|set| {
        let set_name = normalize_name(&set.name);
        aliases.contains(&set_name)
            || set.id.eq_ignore_ascii_case(raw)
            || set
                .ptcgo_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(raw))
    });
    if exact.is_some() {
        return exact;
    }

    let query = &aliases[0];

    // "Scarlet & Violet Obsidian Flames" contains "obsidian flames"
    let contained = sets
        .iter()
        .map(|set| (set, normalize_name(&set.name)))
        .filter(|(_, set_name)| set_name.len() >= 3 && query.contains(set_name.as_str()))
        .max_by_key(|(_, set_name)| set_name.len())
        .map(|(set, _)| set);
    if contained.is_some() {
        return contained;
    }

    // "Obsidian" is the start of "Obsidian Flames"
    if query.len() < 4 {
        return None;
    }
    sets.iter()
        .map(|set| (set, normalize_name(&set.name)))
        .filter(|(_, set_name)| set_name.contains(query.as_str()))
        .min_by_key(|(_, set_name)| set_name.len())
        .map(|(set, _)| set)
}

/// Sets whose printed card count matches the total on a collector number like `25/165`.
pub fn sets_with_printed_total(sets: &[CardSet], printed_total: u32) -> Vec<&CardSet> {
    sets.iter()
        .filter(|set| set.printed_total == Some(printed_total))
        .collect()
}
