use bomba::api::{run_web_server, ApiState};
use bomba::config::{run_options::get_args, Config};
use bomba::db::SqliteStore;
use bomba::ingest::{correlator::Correlator, register_topics, router::MessageRouter, translator::PumpTranslator};
use bomba::mqtt::mqtt_mon::{monitor_mqtt, Monitor};
use bomba::mqtt::{client_conn, MqttBroker};
use bomba::time::RealTimeProvider;
use bomba::utils::{load_dotenv, start_log};
use std::{error::Error, sync::Arc};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = load_dotenv();
    start_log::<RealTimeProvider>(None);

    info!("Starting application...");
    match dotenv {
        Some(path) => info!(path = %path.display(), "Loaded environment file."),
        None => info!("No .env file, using process environment."),
    }

    let args = get_args();
    let config = Config::load(&args).inspect_err(|e| error!(error = %e, "Invalid configuration."))?;
    info!(database = ?config.database, mqtt = ?config.mqtt, "Configuration loaded.");
    let addr = config.web_server.socket_addr()?;

    let store = Arc::new(SqliteStore::new(config.database.path())?);

    let (client, event_loop) = client_conn(&config.mqtt);
    let broker = Arc::new(MqttBroker::new(client));
    let mut router = MessageRouter::new(Correlator::new(store.clone()), PumpTranslator::new(store.clone()), broker);
    register_topics(&mut router).await?;
    let monitor = Monitor::new(router, config.mqtt.reconnect_policy());

    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let ingest_stop = stop_tx.clone();
    let ingest = tokio::spawn({
        let stop_rx = stop_rx.clone();
        async move {
            let result = monitor_mqtt(monitor, event_loop, stop_rx).await;
            _ = ingest_stop.send(true);
            result
        }
    });

    let web_stop = stop_tx.clone();
    let state = ApiState::new(store, Arc::new(RealTimeProvider));
    let web = tokio::spawn({
        let stop_rx = stop_rx.clone();
        async move {
            let result = run_web_server(state, addr, stop_rx).await;
            _ = web_stop.send(true);
            result
        }
    });

    tokio::spawn({
        let stop_tx = stop_tx.clone();
        let mut stop_rx = stop_rx;
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down."),
                _ = stop_rx.wait_for(|stop| *stop) => {}
            }
            _ = stop_tx.send(true);
        }
    });

    let (ingest, web) = tokio::join!(ingest, web);
    ingest??;
    web??;
    info!("Application stopped.");
    Ok(())
}
