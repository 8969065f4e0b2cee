use tracing_subscriber::EnvFilter;

pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("tungstenite=warn".parse().expect("static directive"))
        .add_directive("tokio_tungstenite=warn".parse().expect("static directive"));

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(filter)
        .init();
}
