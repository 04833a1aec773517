use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::services::card_resolver::CardResolver;

/// Fetches the set list now so the first scan does not pay for it.
pub async fn warm_set_cache(resolver: &CardResolver) {
    match resolver.set_cache().refresh(resolver.pokemon_tcg()).await {
        Ok(count) => tracing::info!(set_count = count, "Set list cache warmed"),
        Err(e) => tracing::warn!(error = %e, "Set list warm-up failed, will fetch on demand"),
    }
}

/// Background job that refetches the set list every `every`.
///
/// The returned scheduler must be kept alive; shut it down on exit.
pub async fn start_set_refresher(
    resolver: CardResolver,
    every: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let resolver = resolver.clone();
        Box::pin(async move {
            warm_set_cache(&resolver).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(every_secs = every.as_secs(), "Set list refresher scheduled");

    Ok(scheduler)
}
