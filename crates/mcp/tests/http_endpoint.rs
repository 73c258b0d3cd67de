mod common;

use std::sync::Arc;

use common::{search_config, search_connector};
use mesh_mcp::{AuthGateway, MeshGateway, MeshHttpServer, SessionRegistry, resolve_bind_address};
use rmcp::ServiceExt as _;
use rmcp::model::CallToolRequestParams;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use serde_json::json;

#[tokio::test]
async fn mcp_clients_see_the_package_and_reach_the_backend() {
    let connector = Arc::new(search_connector());
    let registry = Arc::new(SessionRegistry::new(Arc::new(search_config()), connector.clone()));
    registry.initialize().await;
    let gateway = Arc::new(MeshGateway::new(AuthGateway::disabled(), registry));
    let running = MeshHttpServer::new(resolve_bind_address("127.0.0.1:0").unwrap(), gateway)
        .start()
        .await
        .unwrap();

    let endpoint = format!("http://{}/search", running.bound_address());
    let transport = StreamableHttpClientTransport::with_client(
        reqwest::Client::new(),
        StreamableHttpClientTransportConfig::with_uri(endpoint),
    );
    let client = ().serve(transport).await.unwrap();

    let tools = client.list_all_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|tool| tool.name.to_string()).collect();
    assert_eq!(names, vec!["fs_read_file", "fs_list_dir", "web_fetch"]);

    let result = client
        .call_tool(CallToolRequestParams {
            name: "web_fetch".into(),
            arguments: json!({"url": "https://example.com"}).as_object().cloned(),
            task: None,
            meta: None,
        })
        .await
        .unwrap();
    assert_ne!(result.is_error, Some(true));
    assert_eq!(connector.server("web").recorded_calls()[0].0, "fetch");

    let _ = client.cancel().await;
    running.stop().await.unwrap();
}
