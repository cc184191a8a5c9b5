use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskbox::broker::{BrokerConnection, Producer};
use taskbox::config::Config;
use taskbox::dispatch::Dispatcher;
use taskbox::handlers::HandlerRegistry;
use taskbox::mail::{EmailSender, MailHandlerFactory, Mailer, SmtpEmailSender};
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Run the background worker until SIGINT/SIGTERM.
pub async fn run_worker(config_path: Option<PathBuf>) -> Result<(), AnyError> {
    let config = load_config(config_path)?;

    let broker = Arc::new(BrokerConnection::new(config.broker.clone()));

    let sender: Arc<dyn EmailSender> = Arc::new(SmtpEmailSender::new(&config.mail)?);
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(MailHandlerFactory::new(&config.mail, sender)))?;
    let registry = Arc::new(registry);

    let dispatcher = Dispatcher::new(
        broker.clone(),
        registry.clone(),
        config.worker.clone(),
        Duration::from_secs(config.broker.reconnect_delay_secs),
    );

    let handles = dispatcher.start();
    info!(consumers = handles.len(), "Worker running");

    shutdown_signal().await;

    dispatcher.shutdown();
    for handle in handles {
        let _ = handle.await;
    }
    broker.close().await;

    Ok(())
}

/// Queue a single outbound email and exit (stands in for the HTTP layer's
/// producer call).
pub async fn enqueue_mail(
    config_path: Option<PathBuf>,
    to: Vec<String>,
    subject: String,
    body: String,
    is_html: bool,
) -> Result<(), AnyError> {
    let config = load_config(config_path)?;

    let broker = Arc::new(BrokerConnection::new(config.broker.clone()));
    let mailer = Mailer::new(Producer::new(broker.clone()), config.mail.clone());

    mailer.queue_email(&to, &subject, &body, is_html).await?;
    broker.close().await;

    Ok(())
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
