mod catalog;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use courier_core::impls::InMemoryDocumentStore;
use courier_core::ports::{DocumentSession, IdGenerator, Page, SystemClock, UlidGenerator};
use courier_core::{BehaviorKind, DispatchError, Mediator, MediatorConfig};

use crate::catalog::{CreateProduct, DeleteProduct, GetProductById, GetProducts};

/// Dispatches catalog commands and queries through an in-process mediator.
#[derive(Debug, Parser)]
#[command(name = "courier", version)]
struct Cli {
    /// Mediator config (JSON). Defaults to `{"pipeline": ["logging", "validation"]}`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start with an empty catalog.
    #[arg(long, global = true)]
    no_seed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scripted walk through valid and invalid requests.
    Demo,
    /// List products, one page at a time.
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one product.
    Get { id: String },
    /// Create a product.
    Create {
        #[arg(long, default_value = "")]
        name: String,
        /// Repeat for several categories.
        #[arg(long)]
        category: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_file: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
    },
    /// Delete a product.
    Delete { id: String },
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MediatorConfig> {
    match path {
        Some(path) => MediatorConfig::from_path(path)
            .with_context(|| format!("loading mediator config from {}", path.display())),
        None => Ok(MediatorConfig::with_pipeline([BehaviorKind::Logging, BehaviorKind::Validation])),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 失敗を種類ごとに 1 行で表示（デモ用）
fn report(label: &str, err: &DispatchError) {
    match err.validation_failures() {
        Some(failures) => {
            println!("{label}: rejected ({:?})", err.kind());
            for failure in failures.iter() {
                println!("  - {}: {}", failure.field, failure.message);
            }
        }
        None => println!("{label}: {:?} ({err})", err.kind()),
    }
}

async fn demo(mediator: &Mediator) -> anyhow::Result<()> {
    // (A) 入力が不正なコマンド → Handler に届く前に全部まとめて拒否
    let invalid = CreateProduct {
        name: String::new(),
        category: Vec::new(),
        description: String::new(),
        image_file: String::new(),
        price: 0.0,
    };
    if let Err(err) = mediator.send(invalid).await {
        report("create (invalid)", &err);
    }

    // (B) 正しいコマンド → 永続化して ID を返す
    let created = mediator
        .send(CreateProduct {
            name: "Courier Bag".to_string(),
            category: vec!["Accessories".to_string()],
            description: "Waterproof messenger bag".to_string(),
            image_file: "courier-bag.png".to_string(),
            price: 79.0,
        })
        .await?;
    println!("create: {}", created.id);

    // (C) クエリ（Validation は適用されない）
    let product = mediator.send(GetProductById { id: created.id.clone() }).await?;
    print_json(&product)?;

    // (D) 削除 → もう一度取得すると not_found
    mediator.send(DeleteProduct { id: created.id.clone() }).await?;
    if let Err(err) = mediator.send(GetProductById { id: created.id }).await {
        report("get (deleted)", &err);
    }

    let listing = mediator
        .send(GetProducts {
            page: Page::default(),
            category: None,
        })
        .await?;
    println!("catalog holds {} product(s) on page 1", listing.products.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let session = DocumentSession::new(Arc::new(InMemoryDocumentStore::new()));
    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(SystemClock));

    if !cli.no_seed {
        catalog::seed(&session, ids.as_ref()).await?;
    }

    let mediator = catalog::register(Mediator::builder().config(config), session, ids)?.build()?;

    match cli.command {
        Command::Demo => demo(&mediator).await?,
        Command::List { page, size, category } => {
            let result = mediator
                .send(GetProducts {
                    page: Page::new(page, size),
                    category,
                })
                .await?;
            print_json(&result.products)?;
        }
        Command::Get { id } => print_json(&mediator.send(GetProductById { id }).await?)?,
        Command::Create {
            name,
            category,
            description,
            image_file,
            price,
        } => {
            let created = mediator
                .send(CreateProduct {
                    name,
                    category,
                    description,
                    image_file,
                    price,
                })
                .await;
            match created {
                Ok(created) => print_json(&created)?,
                Err(err) => {
                    report("create", &err);
                    std::process::exit(2);
                }
            }
        }
        Command::Delete { id } => print_json(&mediator.send(DeleteProduct { id }).await?)?,
    }

    Ok(())
}
