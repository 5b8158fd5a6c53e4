use std::sync::Arc;
use std::time::{Duration, Instant};

use redis_basic::{
    cache::{Cache, STORE_METHOD},
    client::RedisClient,
    config::{Config, Subcommand},
    key_value_store::MemoryStore,
    setup_logging,
    store::Store,
    web::{Fetcher, HttpFetcher, PageCache},
};
use tracing::info;

const DEMO_URL: &str = "http://example.com";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();

    let config = Config::new(std::env::args())?;

    let store: Arc<dyn Store> = if config.memory {
        info!("using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(RedisClient::connect(&config.address()).await?)
    };

    match config.subcommand {
        Subcommand::Store(value) => {
            let cache = Cache::from_store(store);
            println!("{}", cache.store(value).await?);
        }
        Subcommand::Get(key) => {
            let cache = Cache::from_store(store);
            match cache.get(&key).await? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("(nil)"),
            }
        }
        Subcommand::Page(url) => {
            let pages = PageCache::new(store, HttpFetcher::new()).with_ttl(config.ttl);
            println!("{}", pages.get_page(&url).await?);
        }
        Subcommand::Replay => {
            let cache = Cache::from_store(store);
            println!("{}", cache.replay(STORE_METHOD).await?);
        }
        Subcommand::Demo(url) => {
            demo(store, config.ttl, url.as_deref().unwrap_or(DEMO_URL)).await?;
        }
    }

    Ok(())
}

async fn demo(store: Arc<dyn Store>, ttl: u64, url: &str) -> anyhow::Result<()> {
    let cache = Cache::new(Arc::clone(&store)).await?;

    let text_key = cache.store("hello").await?;
    let int_key = cache.store(42i64).await?;
    let float_key = cache.store(1.0).await?;

    println!("{} -> {:?}", text_key, cache.get_str(&text_key).await?);
    println!("{} -> {:?}", int_key, cache.get_int(&int_key).await?);
    println!("{} -> {:?}", float_key, cache.get_str(&float_key).await?);
    println!();
    println!("{}", cache.replay(STORE_METHOD).await?);
    println!();

    let pages = PageCache::new(store, HttpFetcher::new()).with_ttl(ttl);

    timed_fetch(&pages, url, "first fetch (network)").await?;
    timed_fetch(&pages, url, "second fetch (cached)").await?;

    println!("waiting {}s for the cached page to expire", ttl + 1);
    tokio::time::sleep(Duration::from_secs(ttl + 1)).await;

    timed_fetch(&pages, url, "third fetch (network again)").await?;

    println!("{} was requested {} times", url, pages.access_count(url).await?);

    Ok(())
}

async fn timed_fetch<S, F>(pages: &PageCache<S, F>, url: &str, label: &str) -> anyhow::Result<()>
where
    S: Store,
    F: Fetcher,
{
    let started = Instant::now();
    let body = pages.get_page(url).await?;
    println!("{}: {} bytes in {:?}", label, body.len(), started.elapsed());

    Ok(())
}
