use s3s_browse::config::{DEFAULT_REGION, StorageConfig};
use s3s_browse::logging::WithLogging;
use s3s_browse::service::BrowseServiceBuilder;

use std::time::Duration;

use tokio::net::TcpListener;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;

use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(version)]
struct Opt {
    /// Host name to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to listen on.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Bucket to browse.
    #[arg(long, env = "S3_BUCKET_NAME")]
    bucket: String,

    /// Custom S3 endpoint URL.
    #[arg(long, env = "S3_ENDPOINT")]
    endpoint: Option<String>,

    /// Access key used for signing.
    #[arg(long, env = "S3_ACCESS_KEY_ID", requires = "secret_key")]
    access_key: Option<String>,

    /// Secret key used for signing.
    #[arg(long, env = "S3_SECRET_ACCESS_KEY", requires = "access_key", hide_env_values = true)]
    secret_key: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Use path-style addressing (implied by `--endpoint`).
    #[arg(long, env = "S3_FORCE_PATH_STYLE")]
    force_path_style: bool,

    /// Timeout for each backend operation, in seconds.
    #[arg(long, env = "S3_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl Opt {
    fn storage_config(&self) -> StorageConfig {
        let mut config = StorageConfig::new(self.bucket.clone()).with_region(self.region.clone());
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let (Some(ak), Some(sk)) = (&self.access_key, &self.secret_key) {
            config = config.with_credentials(ak.clone(), sk.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(secs);
        }
        config.force_path_style |= self.force_path_style;
        config
    }
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Accepts a missing `.env` file, rejects an unreadable or malformed one.
fn check_env_file<T>(loaded: dotenvy::Result<T>) -> anyhow::Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(anyhow::Error::new(err).context("failed to load .env file")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    check_env_file(dotenvy::dotenv())?;

    let opt = Opt::parse();
    setup_tracing();
    run(opt).await
}

async fn run(opt: Opt) -> anyhow::Result<()> {
    let config = opt.storage_config();
    let client = s3s_browse::aws::build_client(&config).await;

    let service = WithLogging::new(BrowseServiceBuilder::new(client, config.bucket.clone()).build());

    let addr = format!("{}:{}", opt.host, opt.port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let http_server = ConnBuilder::new(TokioExecutor::new());
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();

    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());

    info!(bucket = %config.bucket, "server is running at http://{local_addr}");

    loop {
        let (socket, _) = tokio::select! {
            res = listener.accept() => {
                match res {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::error!("error accepting connection: {err}");
                        continue;
                    }
                }
            }
            _ = ctrl_c.as_mut() => {
                break;
            }
        };

        let conn = http_server.serve_connection(TokioIo::new(socket), service.clone());
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!("error serving connection: {err}");
            }
        });
    }

    tokio::select! {
        () = graceful.shutdown() => {
            tracing::debug!("Gracefully shutdown!");
        },
        () = tokio::time::sleep(Duration::from_secs(10)) => {
            tracing::debug!("Waited 10 seconds for graceful shutdown, aborting...");
        }
    }

    info!("server is stopped");
    Ok(())
}
