use crm_core::Config;

// Use mimalloc as the global allocator for lower fragmentation,
// especially on musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Store, identity provider, services and routes
    let (_state, router) = crm_api::setup::initialize_app(config.clone()).await?;

    crm_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
