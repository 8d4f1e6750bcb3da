//! Upload a local file to S3-compatible storage.
//!
//! ```text
//! cargo run --example upload_file -- <path> <bucket> <key> [part size MiB] [workers]
//! ```
//!
//! Set `S3_ENDPOINT_URL` to target storage other than AWS, e.g. a local MinIO
//! at `http://127.0.0.1:9000`. Press Ctrl-C to cancel, which aborts the upload.
use multipart_file_upload::aws_config as config;
use multipart_file_upload::aws_sdk;
use multipart_file_upload::{ByteSize, DEFAULT_PART_SIZE, SdkClient, UploadBuilder};
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse("multipart_file_upload=info")?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse()?;
    let client = sdk_client().await?;

    let mut builder = UploadBuilder::new(client)
        .part_size(args.part_size)
        .verbose(true);
    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    let mut session = builder
        .build_from_file((args.bucket, args.key), &args.path)
        .await?;

    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let res = session.upload().await?;
    println!("{}", serde_json::to_string_pretty(&res)?);
    println!(
        "{} in {:.2?} ({}/s)",
        ByteSize::b(res.total_bytes),
        res.elapsed,
        ByteSize::b(res.bytes_per_sec() as u64),
    );
    Ok(())
}

struct Args {
    path: PathBuf,
    bucket: String,
    key: String,
    part_size: ByteSize,
    workers: Option<usize>,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = std::env::args().skip(1);
        let usage = "usage: upload_file <path> <bucket> <key> [part size MiB] [workers]";
        let path = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
        let bucket = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
        let key = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
        let part_size = match args.next() {
            Some(mib) => ByteSize::mib(mib.parse()?),
            None => DEFAULT_PART_SIZE,
        };
        let workers = args.next().map(|n| n.parse()).transpose()?;

        Ok(Self {
            path: path.into(),
            bucket,
            key,
            part_size,
            workers,
        })
    }
}

async fn sdk_client() -> anyhow::Result<SdkClient> {
    let mut loader = config::from_env().app_name(config::AppName::new("upload-file")?);
    let endpoint = std::env::var("S3_ENDPOINT_URL").ok();
    if let Some(url) = &endpoint {
        loader = loader.endpoint_url(url);
    }
    let sdk_config = loader.load().await;

    // Most S3-compatible services do not support virtual-hosted buckets.
    let s3_config = aws_sdk::config::Builder::from(&sdk_config)
        .force_path_style(endpoint.is_some())
        .build();
    Ok(SdkClient::new(aws_sdk::Client::from_conf(s3_config)))
}
