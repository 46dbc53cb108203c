/// Read-through caching over an optional Redis cache.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the result for a background write and returns it. Cache read failures are
/// logged and treated as misses so a Redis outage never fails a catalog call.
///
/// # Arguments
/// * `$cache`: an `Option<Cache>`; `None` disables caching.
/// * `$key`: the `CacheKey` for the value; its TTL applies to the write.
/// * `$block`: a future yielding `AppResult<T>`, run on a miss.
///
/// # Example
/// ```rust,ignore
/// let page: ApiPage<ApiTitle> = cached!(self.cache, key, async move {
///     self.get_json(&path, &[]).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.as_ref() {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(cached) => Ok(cached),
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = $cache.as_ref() {
                        cache.set_in_background(&key, &value);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
