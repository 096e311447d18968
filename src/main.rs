use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3tree::{Error, Node, S3Tree, S3TreeConfig};

/// Browse an S3 bucket like a directory tree
#[derive(Parser, Debug)]
#[command(name = "s3tree", version, about)]
struct Cli {
    /// JSON config file; falls back to AWS_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List directories and files directly below a path
    Ls {
        bucket: String,
        path: Option<String>,
        /// Print the listing as JSON records
        #[arg(long)]
        json: bool,
    },
    /// Print the content of one object
    Cat { bucket: String, key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3tree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration / 加载配置
    let config = match &cli.config {
        Some(path) => S3TreeConfig::load(path)?,
        None => S3TreeConfig::from_env(),
    };

    match cli.command {
        Command::Ls { bucket, path, json } => {
            let tree = S3Tree::open(&config, &bucket, path.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print_tree(&tree);
            }
        }
        Command::Cat { bucket, key } => {
            let (parent, name) = match key.rsplit_once('/') {
                Some((parent, name)) => (Some(parent), name),
                None => (None, key.as_str()),
            };

            let tree = S3Tree::open(&config, &bucket, parent).await?;
            let file = tree
                .files()
                .find(|f| f.name() == name)
                .ok_or_else(|| Error::FileNotFound(key.clone()))?;

            print!("{}", file.read().await?);
        }
    }

    Ok(())
}

fn print_tree(tree: &S3Tree) {
    tracing::info!(
        "{} directories, {} files in s3://{}/{}",
        tree.num_directories(),
        tree.num_files(),
        tree.bucket(),
        tree.path()
    );

    for node in tree {
        match node {
            Node::Directory(d) => println!("{:>10}  {:25}  {}/", "-", "", d.name()),
            Node::File(f) => println!(
                "{:>10}  {:25}  {}",
                f.size(),
                f.last_modified().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                f.name()
            ),
        }
    }
}
