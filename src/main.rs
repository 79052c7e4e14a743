#[macro_use]
extern crate rocket;

use pvpoll_rs::api::dataglen::Dataglen;
use pvpoll_rs::api::growatt::Growatt;
use pvpoll_rs::envelope::Envelope;
use pvpoll_rs::metrics;
use pvpoll_rs::pipeline::chained::ChainedWalk;
use pvpoll_rs::pipeline::paginated::PaginatedListing;
use pvpoll_rs::pipeline::Pipeline;
use pvpoll_rs::publisher::{MeshClient, Publisher};
use pvpoll_rs::rescheduler::Rescheduler;
use pvpoll_rs::Error;
use rocket::serde::json::Json;
use rocket::State;
use settings::PollerConfig;
use std::future::Future;
use std::process;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

mod settings;

type SharedPublisher = Arc<Publisher<MeshClient>>;

/// Structure containing state for API handlers.
pub struct StateData {
    publishers: Vec<(&'static str, SharedPublisher)>,
}

#[get("/metrics")]
async fn metrics_route() -> Result<String, Error> {
    metrics::read()
}

/// Last envelope successfully published by the `source` pipeline.
#[get("/last-envelope/<source>")]
async fn last_envelope_route(source: &str, state: &State<StateData>) -> Option<Json<Envelope>> {
    state
        .publishers
        .iter()
        .find(|(name, _)| *name == source)
        .and_then(|(_, publisher)| publisher.last_published())
        .map(Json)
}

/// Run a pipeline in the background. A pipeline only stops with an error when publishing
/// failed, and there is nowhere to keep unpublished data, so the whole process goes down.
fn supervise<F>(name: &'static str, pipeline: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = pipeline.await {
            log::error!("{}: pipeline failed, terminating: {}", name, e);
            process::exit(1);
        }
    })
}

async fn publisher(settings: &PollerConfig, mesh: &MeshClient) -> Result<SharedPublisher, Error> {
    let publisher = Publisher::new(
        mesh.clone(),
        settings.geospace(),
        settings.failure_policy().unwrap_or_default(),
    );
    publisher.register().await?;
    Ok(Arc::new(publisher))
}

async fn start_pollers(
    settings: &PollerConfig,
    shutdown: &watch::Receiver<bool>,
) -> Result<(StateData, Vec<JoinHandle<()>>), Error> {
    let mesh = MeshClient::new(settings.publish_url())?;
    let mut publishers = Vec::new();
    let mut pollers = Vec::new();

    if let Some(api) = settings.growatt() {
        let publisher = publisher(settings, &mesh).await?;
        let topology = PaginatedListing::new(
            "growatt",
            Growatt::new(api, settings.download_delay())?,
            settings.max_pages(),
        );
        let pipeline = Pipeline::new(
            topology,
            publisher.clone(),
            Rescheduler::new(settings.idle_delay()),
        );
        pollers.push(supervise("growatt", pipeline.run(shutdown.clone())));
        publishers.push(("growatt", publisher));
    }

    if let Some(api) = settings.dataglen() {
        let publisher = publisher(settings, &mesh).await?;
        let topology = ChainedWalk::new("dataglen", Dataglen::new(api, settings.download_delay())?);
        let pipeline = Pipeline::new(
            topology,
            publisher.clone(),
            Rescheduler::new(settings.idle_delay()),
        );
        pollers.push(supervise("dataglen", pipeline.run(shutdown.clone())));
        publishers.push(("dataglen", publisher));
    }

    Ok((StateData { publishers }, pollers))
}

#[rocket::main]
async fn main() {
    env_logger::init();

    let settings = match settings::read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("configuration error: {}", e);
            process::exit(2);
        }
    };

    let (shutdown, shutdown_rx) = watch::channel(false);
    let (state, pollers) = match start_pollers(&settings, &shutdown_rx).await {
        Ok(started) => started,
        Err(e) => {
            log::error!("unable to start polling: {}", e);
            process::exit(1);
        }
    };

    if pollers.is_empty() {
        log::error!("no source configured, set PVPOLL_GROWATT_* or PVPOLL_DATAGLEN_* credentials");
        process::exit(2);
    }

    let launched = rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, last_envelope_route])
        .launch()
        .await;
    if let Err(e) = launched {
        log::error!("http server stopped: {}", e);
    }

    log::info!("shutting down pollers");
    let _ = shutdown.send(true);
    for poller in pollers {
        if let Err(e) = poller.await {
            log::warn!("poller did not stop cleanly: {}", e);
        }
    }
}
