//! MCP server: JSON-RPC message handling and tool dispatch

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    jsonrpc::{
        error_response, success_response, JsonRpcRequest, JsonRpcResponse, RequestId,
        JSONRPC_VERSION,
    },
    mcp::{
        Implementation, InitializeRequest, InitializeResponse, ServerCapabilities, TextContent,
        ToolsCallRequest, ToolsCallResponse, ToolsCapability, ToolsListResponse,
        LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_PING, METHOD_TOOLS_CALL,
        METHOD_TOOLS_LIST, SUPPORTED_PROTOCOL_VERSIONS,
    },
    tools::{self, ToolKind, DEFAULT_PAGE, DEFAULT_PAGE_SIZE},
    McpError, McpResult,
};
use starlink_client::{ClientError, StarlinkClient, CLIENT_ID_ENV, CLIENT_SECRET_ENV};

/// MCP server fronting a [`StarlinkClient`]
pub struct McpServer {
    client: StarlinkClient,
}

impl McpServer {
    pub fn new(client: StarlinkClient) -> Self {
        Self { client }
    }

    /// Process a single JSON-RPC message; `None` means no response is due
    /// (the message was a notification).
    pub async fn process_message(&self, body: &[u8]) -> McpResult<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = serde_json::from_slice(body).map_err(|e| {
            error!("Failed to parse JSON-RPC request: {}", e);
            McpError::Serialization(e)
        })?;

        debug!("Processing method: {}", request.method);

        if request.jsonrpc != JSONRPC_VERSION {
            return Ok(Some(error_response(
                request.id,
                crate::jsonrpc::JsonRpcError::invalid_request()
                    .with_data(json!({"message": "Invalid JSON-RPC version"})),
            )));
        }

        // Notifications carry no id and get no response
        if request.id.is_none() {
            debug!("Received notification, ignoring");
            return Ok(None);
        }

        let response = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(&request)?,
            METHOD_PING => success_response(request.id.clone(), json!({})),
            METHOD_TOOLS_LIST => self.handle_tools_list(&request)?,
            METHOD_TOOLS_CALL => self.handle_tools_call(&request).await?,
            _ => error_response(
                request.id,
                crate::jsonrpc::JsonRpcError::method_not_found()
                    .with_data(json!({"method": request.method})),
            ),
        };

        Ok(Some(response))
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let init_request: InitializeRequest = match &request.params {
            Some(params) => serde_json::from_value(params.clone())?,
            None => InitializeRequest { protocol_version: String::new() },
        };

        // Echo the client's version when supported, otherwise offer ours
        let protocol_version =
            if SUPPORTED_PROTOCOL_VERSIONS.contains(&init_request.protocol_version.as_str()) {
                init_request.protocol_version
            } else {
                LATEST_PROTOCOL_VERSION.to_string()
            };

        let response = InitializeResponse {
            protocol_version,
            capabilities: ServerCapabilities { tools: ToolsCapability { list_changed: None } },
            server_info: Implementation {
                name: "starlink-enterprise-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Manage Starlink terminals, service lines and addresses through the Starlink Enterprise API".to_string(),
            ),
        };

        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let response = ToolsListResponse { tools: tools::catalog() };
        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| McpError::InvalidArguments("Missing params for tools/call".to_string()))?;

        let call_request: ToolsCallRequest = serde_json::from_value(params.clone())?;
        let arguments = call_request.arguments.unwrap_or_else(|| json!({}));

        debug!("Calling tool: {}", call_request.name);

        // Every dispatch failure is rendered as a text result here; errors
        // never cross the transport boundary unhandled.
        let response = match self.dispatch(&call_request.name, &arguments).await {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload)?;
                ToolsCallResponse { content: vec![TextContent::new(text)], is_error: None }
            }
            Err(err) => {
                warn!("Tool '{}' failed: {}", call_request.name, err);
                ToolsCallResponse {
                    content: vec![TextContent::new(render_error(&err))],
                    is_error: Some(true),
                }
            }
        };

        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }

    /// Map a tool name and argument bag to the corresponding API call.
    ///
    /// Required fields fail with `MissingArgument` before any network I/O;
    /// optional pagination fields fall back to their documented defaults.
    pub async fn dispatch(&self, name: &str, args: &Value) -> McpResult<Value> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        let payload = match kind {
            ToolKind::ListUserTerminals => {
                let page = tools::optional_u32(args, "page", DEFAULT_PAGE);
                let page_size = tools::optional_u32(args, "page_size", DEFAULT_PAGE_SIZE);
                self.client.list_user_terminals(page, page_size).await?
            }
            ToolKind::GetTerminalDetails => {
                let id = tools::required_str(args, "user_terminal_id")?;
                self.client.get_terminal_details(id).await?
            }
            ToolKind::GetTerminalTelemetry => {
                let id = tools::required_str(args, "user_terminal_id")?;
                self.client.get_terminal_telemetry(id).await?
            }
            ToolKind::GetTerminalHistory => {
                let id = tools::required_str(args, "user_terminal_id")?;
                let start_time = tools::required_str(args, "start_time")?;
                let end_time = tools::required_str(args, "end_time")?;
                self.client.get_terminal_history(id, start_time, end_time).await?
            }
            ToolKind::ListServiceLines => {
                let page = tools::optional_u32(args, "page", DEFAULT_PAGE);
                let page_size = tools::optional_u32(args, "page_size", DEFAULT_PAGE_SIZE);
                self.client.list_service_lines(page, page_size).await?
            }
            ToolKind::GetServiceLineDetails => {
                let id = tools::required_str(args, "service_line_id")?;
                self.client.get_service_line_details(id).await?
            }
            ToolKind::GetDataUsage => {
                let id = tools::required_str(args, "service_line_id")?;
                let start_date = tools::required_str(args, "start_date")?;
                let end_date = tools::required_str(args, "end_date")?;
                self.client.get_data_usage(id, start_date, end_date).await?
            }
            ToolKind::ListAddresses => {
                let page = tools::optional_u32(args, "page", DEFAULT_PAGE);
                self.client.list_addresses(page).await?
            }
            ToolKind::GetAddressDetails => {
                let id = tools::required_str(args, "address_id")?;
                self.client.get_address_details(id).await?
            }
            ToolKind::CheckServiceAvailability => {
                let latitude = tools::required_f64(args, "latitude")?;
                let longitude = tools::required_f64(args, "longitude")?;
                self.client.check_service_availability(latitude, longitude).await?
            }
            ToolKind::GetAccountOverview => self.client.account_overview().await,
            ToolKind::ListSubscriptionProducts => self.client.list_subscription_products().await?,
        };

        Ok(payload)
    }
}

/// Render a dispatch failure as the uniform error text returned to the agent
fn render_error(err: &McpError) -> String {
    let mut message = format!("Error: {}\n\n", err);

    if matches!(err, McpError::Client(ClientError::Config(_))) {
        message.push_str("Please set the following environment variables:\n");
        message.push_str(&format!("  - {}\n", CLIENT_ID_ENV));
        message.push_str(&format!("  - {}\n\n", CLIENT_SECRET_ENV));
        message.push_str("Contact your Starlink account manager to request API access.");
    }

    message
}

/// Serve MCP over stdio, one JSON-RPC message per line
pub async fn serve_stdio(client: StarlinkClient) -> McpResult<()> {
    info!("Starting Starlink Enterprise MCP server (stdio mode)");

    let server = McpServer::new(client);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in BufReader::new(stdin).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        // MCP does not support JSON-RPC batch requests
        if line.trim_start().starts_with('[') {
            error!("Batch requests are not supported");
            let response = error_response(
                None,
                crate::jsonrpc::JsonRpcError::invalid_request()
                    .with_data(json!({"message": "Batch requests are not supported"})),
            );
            writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            stdout.flush()?;
            continue;
        }

        match server.process_message(line.as_bytes()).await {
            Ok(Some(response)) => {
                writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                stdout.flush()?;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Error processing message: {}", e);
                let response = error_response(Some(RequestId::new_uuid()), e.to_jsonrpc_error());
                writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                stdout.flush()?;
            }
        }
    }

    info!("MCP server stopped");
    Ok(())
}

/// Serve MCP over HTTP on a single POST endpoint
pub async fn serve_http(client: StarlinkClient, addr: &str) -> McpResult<()> {
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::Json,
        routing::post,
        Router,
    };
    use uuid::Uuid;

    info!("Starting Starlink Enterprise MCP server (HTTP mode) on {}", addr);

    let server = Arc::new(McpServer::new(client));

    async fn handle_mcp_request(
        State(server): State<Arc<McpServer>>,
        headers: HeaderMap,
        body: axum::body::Bytes,
    ) -> Result<(HeaderMap, Json<Value>), (StatusCode, Json<Value>)> {
        if let Some(protocol_version) = headers.get("mcp-protocol-version") {
            let version_str = protocol_version.to_str().unwrap_or("");
            if !SUPPORTED_PROTOCOL_VERSIONS.contains(&version_str) {
                warn!("Unsupported MCP protocol version: {}", version_str);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Unsupported MCP protocol version",
                        "supported_versions": SUPPORTED_PROTOCOL_VERSIONS
                    })),
                ));
            }
        }

        fn mcp_headers() -> HeaderMap {
            let mut response_headers = HeaderMap::new();
            if let Ok(value) = "application/json".parse() {
                response_headers.insert("content-type", value);
            }
            if let Ok(value) = LATEST_PROTOCOL_VERSION.parse() {
                response_headers.insert("mcp-protocol-version", value);
            }
            if let Ok(value) = Uuid::new_v4().to_string().parse() {
                response_headers.insert("mcp-session-id", value);
            }
            response_headers
        }

        match server.process_message(&body[..]).await {
            Ok(Some(response)) => {
                let payload = serde_json::to_value(response).map_err(|e| {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()})))
                })?;
                Ok((mcp_headers(), Json(payload)))
            }
            Ok(None) => Ok((mcp_headers(), Json(json!({})))),
            Err(e) => {
                error!("Error processing MCP request: {}", e);
                let status = match e {
                    McpError::InvalidArguments(_) | McpError::MissingArgument(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    McpError::ToolNotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let payload = serde_json::to_value(e.to_jsonrpc_error())
                    .unwrap_or_else(|_| json!({"error": "internal error"}));
                Err((status, Json(payload)))
            }
        }
    }

    let app = Router::new().route("/mcp", post(handle_mcp_request)).with_state(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| McpError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("HTTP MCP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| McpError::Internal(format!("HTTP server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use starlink_client::Credentials;

    fn server_with_credentials(mock: &MockServer, client_id: &str, secret: &str) -> McpServer {
        let client =
            StarlinkClient::with_base_url(Credentials::new(client_id, secret), mock.base_url())
                .unwrap();
        McpServer::new(client)
    }

    fn configured_server(mock: &MockServer) -> McpServer {
        server_with_credentials(mock, "client-1", "secret-1")
    }

    fn mock_token_endpoint(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok-1", "expires_in": 3600}));
        });
    }

    fn rpc(method: &str, params: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn missing_required_argument_names_the_field_without_network_io() {
        let mock = MockServer::start();
        let token = mock.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(200).json_body(serde_json::json!({"access_token": "tok"}));
        });

        let server = configured_server(&mock);
        let err = server.dispatch("get_terminal_details", &json!({})).await.unwrap_err();

        assert!(matches!(err, McpError::MissingArgument("user_terminal_id")), "got {:?}", err);
        token.assert_hits(0);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let mock = MockServer::start();
        let server = configured_server(&mock);

        let err = server.dispatch("reboot_terminal", &json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn terminal_listing_applies_pagination_defaults() {
        let mock = MockServer::start();
        mock_token_endpoint(&mock);
        let resource = mock.mock(|when, then| {
            when.method(GET)
                .path("/user-terminals")
                .query_param("page", "1")
                .query_param("pageSize", "50");
            then.status(200).json_body(serde_json::json!({"results": []}));
        });

        let server = configured_server(&mock);
        server.dispatch("list_user_terminals", &json!({})).await.unwrap();
        resource.assert();
    }

    #[tokio::test]
    async fn availability_arguments_round_trip_into_query_parameters() {
        let mock = MockServer::start();
        mock_token_endpoint(&mock);
        let resource = mock.mock(|when, then| {
            when.method(GET)
                .path("/availability")
                .query_param("latitude", "37.7")
                .query_param("longitude", "-122.4");
            then.status(200).json_body(serde_json::json!({"available": true}));
        });

        let server = configured_server(&mock);
        server
            .dispatch("check_service_availability", &json!({"latitude": 37.7, "longitude": -122.4}))
            .await
            .unwrap();
        resource.assert();
    }

    #[tokio::test]
    async fn tools_list_exposes_the_full_catalog() {
        let mock = MockServer::start();
        let server = configured_server(&mock);

        let response =
            server.process_message(&rpc("tools/list", json!({}))).await.unwrap().unwrap();
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();

        assert_eq!(tools.len(), 12);
        assert!(tools.iter().any(|t| t["name"] == "get_account_overview"));
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn initialize_negotiates_a_supported_protocol_version() {
        let mock = MockServer::start();
        let server = configured_server(&mock);

        let response = server
            .process_message(&rpc("initialize", json!({"protocolVersion": "2024-11-05"})))
            .await
            .unwrap()
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");

        let response = server
            .process_message(&rpc("initialize", json!({"protocolVersion": "1999-01-01"})))
            .await
            .unwrap()
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], LATEST_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "starlink-enterprise-mcp-server");
    }

    #[tokio::test]
    async fn unconfigured_credentials_produce_instructional_error_text() {
        let mock = MockServer::start();
        let server = server_with_credentials(&mock, "", "");

        let response = server
            .process_message(&rpc("tools/call", json!({"name": "list_user_terminals"})))
            .await
            .unwrap()
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error:"), "unexpected text: {}", text);
        assert!(text.contains("credentials not configured"), "unexpected text: {}", text);
        assert!(text.contains("STARLINK_CLIENT_ID"), "unexpected text: {}", text);
        assert!(text.contains("STARLINK_CLIENT_SECRET"), "unexpected text: {}", text);
    }

    #[tokio::test]
    async fn successful_tool_call_returns_pretty_printed_payload() {
        let mock = MockServer::start();
        mock_token_endpoint(&mock);
        mock.mock(|when, then| {
            when.method(GET).path("/subscription-products");
            then.status(200).json_body(serde_json::json!({"products": ["mobility"]}));
        });

        let server = configured_server(&mock);
        let response = server
            .process_message(&rpc("tools/call", json!({"name": "list_subscription_products"})))
            .await
            .unwrap()
            .unwrap();

        let result = response.result.unwrap();
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(text).unwrap(),
            json!({"products": ["mobility"]})
        );
        assert!(text.contains('\n'), "payload should be pretty-printed");
    }

    #[tokio::test]
    async fn api_failure_surfaces_as_error_text_with_status_and_body() {
        let mock = MockServer::start();
        mock_token_endpoint(&mock);
        mock.mock(|when, then| {
            when.method(GET).path("/addresses/addr-1");
            then.status(403).body("forbidden for this account");
        });

        let server = configured_server(&mock);
        let response = server
            .process_message(&rpc(
                "tools/call",
                json!({"name": "get_address_details", "arguments": {"address_id": "addr-1"}}),
            ))
            .await
            .unwrap()
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("403"), "unexpected text: {}", text);
        assert!(text.contains("forbidden for this account"), "unexpected text: {}", text);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let mock = MockServer::start();
        let server = configured_server(&mock);

        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .unwrap();

        assert!(server.process_message(&body).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_is_rejected() {
        let mock = MockServer::start();
        let server = configured_server(&mock);

        let body = serde_json::to_vec(&json!({
            "jsonrpc": "1.0",
            "id": 1,
            "method": "ping"
        }))
        .unwrap();

        let response = server.process_message(&body).await.unwrap().unwrap();
        assert!(response.error.is_some());
    }
}
