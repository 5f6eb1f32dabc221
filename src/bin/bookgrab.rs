use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bookgrab::catalog::CatalogHttpClient;
use bookgrab::config::Config;
use bookgrab::download::HttpFetcher;
use bookgrab::session::Session;
use bookgrab::tui;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().into_diagnostic()?;
    let catalog =
        CatalogHttpClient::new(config.catalog_url, config.mirror_url).into_diagnostic()?;
    let fetcher = HttpFetcher::new().into_diagnostic()?;

    let mut session = Session::new(catalog, fetcher, config.save_root);
    tui::run(&mut session)
}
