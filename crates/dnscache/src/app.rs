use anyhow::Context as _;

use crate::util::unix_now;
use crate::{Args, Config, Dispatcher, DnsServer, Forwarder, Store};

pub struct App;

impl App {
    pub async fn run_until_completion(args: Args) -> anyhow::Result<()> {
        let config = Config::load_or_create(&args.config)
            .await
            .context("refusing to start with a broken config")?;

        let store = Store::restore(&args.cache_path, unix_now()).await;
        let forwarder = Forwarder::new(config.forwarder.socket_addr());
        tracing::info!(resolver = ?forwarder.upstream_resolver(), "Forwarding cache misses");

        let dispatcher = Dispatcher::new(forwarder, store);
        let mut server = DnsServer::bind(config.cache_server.socket_addr(), dispatcher)
            .await
            .context("failed to instantiate the DNS server")?;

        server.run(shutdown_signal()).await?;

        tracing::info!(path = ?args.cache_path, "Saving cache...");
        let store = server.into_dispatcher().into_store();
        store
            .save(&args.cache_path)
            .await
            .context("failed to save the cache")?;
        tracing::info!(entries = store.len(), "Cache has been saved");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for the interrupt signal: {}", e);
        // Never resolves, the server keeps running
        std::future::pending::<()>().await;
    }
}
