use cdnchain::{
    CdnConfig, ImageTransform, ReqwestCdnBackend, Security, SourceRef, StorageAccess,
    StorageLocation, StorageOptions, Task, TransformError,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cdnchain")]
#[command(about = "Build, debug and store CDN transformation chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Url(ChainArgs),
    Debug(ChainArgs),
    Store(StoreArgs),
}

#[derive(clap::Args, Debug)]
struct ChainArgs {
    #[arg(long)]
    handle: Option<String>,
    #[arg(long)]
    external_url: Option<String>,
    #[arg(long = "task")]
    tasks: Vec<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    policy: Option<String>,
    #[arg(long)]
    signature: Option<String>,
    #[arg(long)]
    cdn_url: Option<String>,
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    #[command(flatten)]
    chain: ChainArgs,
    #[arg(long, value_enum)]
    location: Option<LocationArg>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    container: Option<String>,
    #[arg(long)]
    path: Option<String>,
    #[arg(long)]
    filename: Option<String>,
    #[arg(long, value_enum)]
    access: Option<AccessArg>,
    #[arg(long, action = ArgAction::SetTrue)]
    base64decode: bool,
    #[arg(long)]
    mimetype: Option<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LocationArg {
    S3,
    Gcs,
    Azure,
    Dropbox,
    Rackspace,
}

impl From<LocationArg> for StorageLocation {
    fn from(value: LocationArg) -> Self {
        match value {
            LocationArg::S3 => Self::S3,
            LocationArg::Gcs => Self::Gcs,
            LocationArg::Azure => Self::Azure,
            LocationArg::Dropbox => Self::Dropbox,
            LocationArg::Rackspace => Self::Rackspace,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AccessArg {
    Public,
    Private,
}

impl From<AccessArg> for StorageAccess {
    fn from(value: AccessArg) -> Self {
        match value {
            AccessArg::Public => Self::Public,
            AccessArg::Private => Self::Private,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Url(args) => url_command(args),
        Commands::Debug(args) => debug_command(args).await,
        Commands::Store(args) => store_command(args).await,
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn url_command(args: ChainArgs) -> Result<ExitCode, String> {
    let transform = build_transform(&args)?;
    match transform.url().map_err(|e| e.to_string())? {
        Some(url) => {
            println!("{url}");
            Ok(ExitCode::SUCCESS)
        }
        None => Err("url is only available for stored handles".to_string()),
    }
}

async fn debug_command(args: ChainArgs) -> Result<ExitCode, String> {
    let transform = build_transform(&args)?;
    let report = transform.debug().await.map_err(describe_error)?;
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

async fn store_command(args: StoreArgs) -> Result<ExitCode, String> {
    let mut transform = build_transform(&args.chain)?;
    let options = storage_options(&args);
    let (link, response) = transform
        .store_with_response(Some(options))
        .await
        .map_err(describe_error)?;

    if args.json {
        let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!("handle: {}", link.handle());
        println!("url: {}", response.url);
        if let Some(size) = response.size {
            println!("size: {size}");
        }
        if let Some(mime_type) = response.mime_type.as_deref() {
            println!("type: {mime_type}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn build_transform(args: &ChainArgs) -> Result<ImageTransform<ReqwestCdnBackend>, String> {
    let config = build_config(args)?;
    let backend = ReqwestCdnBackend::from_config(&config).map_err(|e| e.to_string())?;
    let source = source_ref(args.handle.as_deref(), args.external_url.as_deref())?;

    let mut transform = ImageTransform::new(config, backend, source).map_err(|e| e.to_string())?;
    for raw in &args.tasks {
        let task: Task = raw.parse().map_err(|e: TransformError| e.to_string())?;
        transform.add_task(task).map_err(|e| e.to_string())?;
    }
    Ok(transform)
}

fn build_config(args: &ChainArgs) -> Result<CdnConfig, String> {
    let mut config = CdnConfig::from_env();
    if let Some(api_key) = args.api_key.as_deref() {
        config = config.with_api_key(api_key);
    }
    if let Some(cdn_url) = args.cdn_url.as_deref() {
        config = config.with_cdn_base_url(cdn_url);
    }
    match (args.policy.as_deref(), args.signature.as_deref()) {
        (Some(policy), Some(signature)) => {
            config = config.with_security(Security::new(policy, signature));
        }
        (None, None) => {}
        _ => return Err("--policy and --signature must be given together".to_string()),
    }
    Ok(config)
}

fn source_ref(handle: Option<&str>, external_url: Option<&str>) -> Result<SourceRef, String> {
    match (handle, external_url) {
        (Some(_), Some(_)) => Err("provide only one of --handle or --external-url".to_string()),
        (None, None) => Err("one of --handle or --external-url is required".to_string()),
        (Some(handle), None) => Ok(SourceRef::Handle(handle.to_string())),
        (None, Some(url)) => Ok(SourceRef::External(url.to_string())),
    }
}

fn storage_options(args: &StoreArgs) -> StorageOptions {
    StorageOptions {
        location: args.location.map(Into::into),
        region: args.region.clone(),
        container: args.container.clone(),
        path: args.path.clone(),
        filename: args.filename.clone(),
        access: args.access.map(Into::into),
        base64decode: args.base64decode.then_some(true),
        mimetype: args.mimetype.clone(),
    }
}

fn describe_error(error: TransformError) -> String {
    match error {
        TransformError::Http { status, message } => {
            format!("cdn rejected the chain with status {status}: {message}")
        }
        other => other.to_string(),
    }
}
