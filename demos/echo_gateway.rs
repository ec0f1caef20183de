use std::sync::Arc;

use tower_gateway::prelude::*;

// Configuration - update these to match your backend
const RPC_ENDPOINT: &str = "http://127.0.0.1:50051";
const LISTEN_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("🚀 Tower-Gateway Echo Example\n");

    // Describe the backend service: a unary Echo and a server-streaming
    // Repeat, both taking a message and a count
    let request = MessageDescriptor::new(
        "demo.EchoRequest",
        vec![
            FieldDescriptor::new("message", FieldKind::String),
            FieldDescriptor::new("count", FieldKind::Int32),
        ],
    );
    let response = MessageDescriptor::new(
        "demo.EchoResponse",
        vec![FieldDescriptor::new("message", FieldKind::String)],
    );

    let service = ServiceBinding::new(
        "demo.EchoService",
        vec![
            MethodBinding::new(
                "demo.EchoService",
                "Echo",
                Verb::Get,
                vec![FieldPath::parse("message")?],
                vec![],
                BodyBinding::None,
                Streaming::Unary,
                request.clone(),
                response.clone(),
            )?,
            MethodBinding::new(
                "demo.EchoService",
                "Repeat",
                Verb::Get,
                vec![FieldPath::parse("message")?],
                vec![FieldPath::parse("count")?],
                BodyBinding::None,
                Streaming::ServerStream,
                request,
                response,
            )?,
        ],
    );
    let patterns: Vec<Arc<dyn Pattern>> = vec![
        Arc::new(TemplatePattern::new("/v1/echo/{message}")),
        Arc::new(TemplatePattern::new("/v1/repeat/{message}")),
    ];

    // Dial the backend eagerly and mount the routes; the connection closes
    // on ctrl-c
    let mut mux = GatewayMux::new();
    let config = GatewayConfig::new(RPC_ENDPOINT);
    match register_service_from_endpoint(&mut mux, service, patterns, &config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    {
        Ok(()) => println!("✓ Connected to backend at {RPC_ENDPOINT}"),
        Err(e) => {
            eprintln!(
                r#"✗ Failed to register service: {e}

    Note: Make sure RPC_ENDPOINT points to a running gRPC backend"#
            );
            return Ok(());
        }
    }

    println!("  Routes:");
    println!("    GET /v1/echo/{{message}}");
    println!("    GET /v1/repeat/{{message}}?count=N");
    println!();

    let app = axum::Router::new().fallback_service(mux);
    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    println!("✓ Gateway listening on http://{LISTEN_ADDR}");
    println!("  Try: curl http://{LISTEN_ADDR}/v1/echo/hello\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    println!("\n✅ Gateway shut down cleanly");

    Ok(())
}
