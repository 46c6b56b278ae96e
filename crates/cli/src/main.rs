//! `dataservice-fetch` entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration** — command-line flags (with environment fallbacks)
//!    via `clap`. Nothing below this binary reads flags, files, or environment.
//! 2. **Wire observability** — `tracing-subscriber` with an `EnvFilter`, human
//!    or JSON output, and an optional OpenTelemetry OTLP exporter. See
//!    [`observability`].
//! 3. **Construct infrastructure** — build the single process-wide
//!    [`ByteBlockChecker`], the [`LocalWorkers`] table, and the
//!    [`TransferRegistry`], register both transports into it, then share it
//!    with the worker client.
//! 4. **Stream a task** — read elements for one task until end of sequence,
//!    printing one JSON line per element on stdout. Ctrl-C cancels the client.

mod observability;
mod summary;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use grpc::{ByteBlockChecker, DefaultCredentialsFactory};
use tracing::{info, warn};
use transfer::{
    BandwidthCeiling, ElementRequest, LocalWorkers, ProtocolName, TaskId, TransferProtocol,
    TransferRegistry, WorkerAddress,
};
use worker_client::{create_worker_client, WorkerClientConfig};

use crate::summary::ElementSummary;

/// Stream the elements of one task from a data-service worker.
#[derive(Debug, Parser)]
#[command(name = "dataservice-fetch", version)]
struct Args {
    /// Worker address, e.g. `localhost:5051`.
    #[arg(long, env = "DATASERVICE_WORKER_ADDRESS")]
    address: String,

    /// Base protocol used for credentials (`grpc` or `grpc+tls`).
    #[arg(long, default_value = "grpc")]
    protocol: String,

    /// Preferred transfer protocol.
    #[arg(long, default_value = TransferProtocol::GRPC)]
    transfer_protocol: String,

    /// Task whose elements are read.
    #[arg(long)]
    task_id: i64,

    /// Aggregate bandwidth ceiling for network reads, in bits per second.
    #[arg(long, env = "DATASERVICE_MAX_BANDWIDTH_BPS")]
    max_bandwidth_bps: Option<u64>,

    /// Bytes accumulated between two bandwidth checks.
    #[arg(long)]
    check_block_bytes: Option<u64>,

    /// Stop after this many elements.
    #[arg(long)]
    max_elements: Option<u64>,

    /// Let the worker answer with `skip` instead of an element.
    #[arg(long)]
    allow_skip: bool,

    /// Pause before asking again after the worker says `skip`.
    #[arg(long, default_value_t = 100)]
    skip_backoff_ms: u64,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// OTLP/gRPC collector endpoint for trace export, e.g. `http://localhost:4317`.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let telemetry = observability::init(args.log_json, args.otlp_endpoint.as_deref())?;
    let outcome = run(args).await;
    telemetry.shutdown();
    outcome
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = WorkerClientConfig {
        address: WorkerAddress::new(args.address).context("--address must not be empty")?,
        protocol: ProtocolName::new(args.protocol).context("--protocol must not be empty")?,
        transfer_protocol: TransferProtocol::new(args.transfer_protocol)
            .context("--transfer-protocol must not be empty")?,
        max_bandwidth: args.max_bandwidth_bps.and_then(BandwidthCeiling::new),
    };

    let throttle = config.max_bandwidth.map(|ceiling| {
        Arc::new(match args.check_block_bytes {
            Some(block) => ByteBlockChecker::with_check_block_size(ceiling, block),
            None => ByteBlockChecker::new(ceiling),
        })
    });
    let local_workers = Arc::new(LocalWorkers::new());
    let mut registry = TransferRegistry::new();
    grpc::register(
        &mut registry,
        Arc::new(DefaultCredentialsFactory::new()),
        throttle,
    )
    .context("failed to register the grpc transfer protocol")?;
    local::register(&mut registry, local_workers.clone())
        .context("failed to register the local transfer protocol")?;
    info!(protocols = ?registry.protocols(), "transfer protocols registered");

    let client = Arc::new(
        create_worker_client(config, Arc::new(registry), local_workers)
            .context("failed to create worker client")?,
    );
    info!(
        client_id = %client.id(),
        address = %client.config().address,
        transfer_protocol = ?client.transfer_protocol(),
        "worker client ready"
    );

    let canceller = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling outstanding reads");
            canceller.try_cancel();
        }
    });

    let task_id = TaskId::new(args.task_id);
    let skip_backoff = Duration::from_millis(args.skip_backoff_ms);
    let mut stdout = std::io::stdout();
    let mut fetched = 0u64;
    while args.max_elements.map_or(true, |max| fetched < max) {
        let request = ElementRequest::new(task_id).with_allow_skip(args.allow_skip);
        let result = match client.get_element(&request).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                warn!(error = %e, "reads cancelled");
                break;
            }
            Err(e) => return Err(e).context(format!("failed to read element for task {task_id}")),
        };
        if result.end_of_sequence {
            info!(task_id = %task_id, elements = fetched, "end of sequence");
            break;
        }
        if result.skip {
            tokio::time::sleep(skip_backoff).await;
            continue;
        }

        let summary = ElementSummary::new(fetched, &result);
        serde_json::to_writer(&mut stdout, &summary)?;
        writeln!(stdout)?;
        fetched += 1;
    }
    Ok(())
}
