use clap::{Parser, Subcommand};
use facility_pipeline::app::aggregation_use_case::AggregationUseCase;
use facility_pipeline::app::ports::{ObjectStorePort, QueryServicePort};
use facility_pipeline::app::transform_use_case::TransformUseCase;
use facility_pipeline::clock::SystemClock;
use facility_pipeline::config::PipelineConfig;
use facility_pipeline::error::PipelineError;
use facility_pipeline::infra::http_object_store::HttpObjectStore;
use facility_pipeline::infra::http_query_service::HttpQueryService;
use facility_pipeline::infra::object_store::FsObjectStore;
use facility_pipeline::logging;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "facility_pipeline")]
#[command(about = "Healthcare facility accreditation data pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter facilities with accreditations expiring in the next 6 months
    Transform,
    /// Run the state-counts query and archive its result
    Aggregate {
        /// Trigger event payload: inline JSON or a path to a JSON file
        #[arg(long)]
        event: Option<String>,
    },
}

fn build_object_store() -> Arc<dyn ObjectStorePort> {
    if let Some(store) = HttpObjectStore::from_env() {
        info!("Using HTTP object store from environment");
        Arc::new(store)
    } else {
        info!("Using local filesystem object store under ./data");
        Arc::new(FsObjectStore::new("data"))
    }
}

fn build_query_service() -> Result<Arc<dyn QueryServicePort>, PipelineError> {
    match HttpQueryService::from_env() {
        Some(service) => Ok(Arc::new(service)),
        None => Err(PipelineError::Config(
            "FACILITY_QUERY_API_URL is not set; the aggregation job needs a query service"
                .to_string(),
        )),
    }
}

fn load_event(event: Option<String>) -> serde_json::Value {
    let Some(raw) = event else {
        return serde_json::json!({});
    };
    let text = if Path::new(&raw).exists() {
        match std::fs::read_to_string(&raw) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read event file '{}': {}", raw, e);
                raw
            }
        }
    } else {
        raw
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Event payload is not valid JSON ({}), logging it verbatim", e);
            serde_json::json!({ "raw": text })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default()?;

    match cli.command {
        Commands::Transform => {
            println!("🔄 Running expiry-filter transform...");
            let store = build_object_store();
            let use_case = TransformUseCase::new(store, Arc::new(SystemClock), config.storage);
            let summary = use_case.run().await;

            println!("\n📊 Transform results:");
            println!("   Total facilities: {}", summary.total_facilities);
            println!("   Expiring: {}", summary.expiring_facilities);
            println!("   Output: {}", summary.output_uri);
            if !summary.errors.is_empty() {
                warn!("{} errors encountered during transform run", summary.errors.len());
                println!("\n⚠️  Errors encountered:");
                for error in &summary.errors {
                    println!("   - {}", error);
                }
            }
        }
        Commands::Aggregate { event } => {
            println!("📈 Running aggregation-and-archive job...");
            let store = build_object_store();
            let query_service = build_query_service()?;
            let use_case = AggregationUseCase::new(
                store,
                query_service,
                Arc::new(SystemClock),
                config.aggregation,
            );

            let response = use_case.run(&load_event(event)).await?;
            println!("✅ {}", response.body.message);
            println!("   Result: {}", response.body.result_path);
        }
    }
    Ok(())
}
