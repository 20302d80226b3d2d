use std::sync::Arc;

use domtrace_core::RecorderService;
use mcp_types::CallToolRequestParams;
use mcp_types::ClientRequest as McpClientRequest;
use mcp_types::Implementation;
use mcp_types::InitializeResult;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ListToolsResult;
use mcp_types::MCP_SCHEMA_VERSION;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use mcp_types::ServerCapabilities;
use mcp_types::ServerCapabilitiesTools;
use serde_json::json;
use tokio::task::JoinSet;

use crate::error_code::INVALID_REQUEST_ERROR_CODE;
use crate::outgoing_message::OutgoingMessageSender;
use crate::tool_config::all_tools;
use crate::tool_handlers::handle_tool_call;

pub(crate) struct MessageProcessor {
    outgoing: Arc<OutgoingMessageSender>,
    service: Arc<RecorderService>,
    initialized: bool,
    /// In-flight `tools/call` tasks, awaited by [`Self::drain_tool_calls`].
    tool_calls: JoinSet<()>,
}

impl MessageProcessor {
    /// Create a new `MessageProcessor`, retaining a handle to the outgoing
    /// `Sender` so handlers can enqueue messages to be written to stdout.
    pub(crate) fn new(outgoing: OutgoingMessageSender, service: Arc<RecorderService>) -> Self {
        Self {
            outgoing: Arc::new(outgoing),
            service,
            initialized: false,
            tool_calls: JoinSet::new(),
        }
    }

    /// Waits for every tool call already started. Called once the read loop
    /// has stopped so a call that is launching a browser finishes (and
    /// registers its session) before the service shuts down.
    pub(crate) async fn drain_tool_calls(&mut self) {
        if !self.tool_calls.is_empty() {
            tracing::info!("waiting for {} in-flight tool call(s)", self.tool_calls.len());
        }
        while let Some(joined) = self.tool_calls.join_next().await {
            if let Err(err) = joined {
                tracing::warn!("tool call task failed: {err}");
            }
        }
    }

    pub(crate) async fn process_request(&mut self, request: JSONRPCRequest) {
        tracing::trace!("processing JSON-RPC request: {}", request.method);
        let request_id = request.id.clone();
        let client_request = match McpClientRequest::try_from(request) {
            Ok(client_request) => client_request,
            Err(e) => {
                tracing::warn!("Failed to convert request: {e}");
                let error = JSONRPCErrorError {
                    code: INVALID_REQUEST_ERROR_CODE,
                    message: e.to_string(),
                    data: None,
                };
                self.outgoing.send_error(request_id, error).await;
                return;
            }
        };

        match client_request {
            McpClientRequest::InitializeRequest(params) => {
                self.handle_initialize(request_id, params).await;
            }
            McpClientRequest::PingRequest(params) => {
                self.handle_ping(request_id, params).await;
            }
            McpClientRequest::ListToolsRequest(params) => {
                self.handle_list_tools(request_id, params).await;
            }
            McpClientRequest::CallToolRequest(params) => {
                self.handle_call_tool(request_id, params);
            }
        }
    }

    /// This server never issues requests, so responses are unexpected.
    pub(crate) fn process_response(&mut self, response: JSONRPCResponse) {
        tracing::info!("<- response: {:?}", response);
    }

    pub(crate) fn process_notification(&mut self, notification: JSONRPCNotification) {
        tracing::info!("<- notification: {}", notification.method);
    }

    pub(crate) fn process_error(&mut self, err: JSONRPCError) {
        tracing::error!("<- error: {:?}", err);
    }

    async fn send_response<T>(&self, id: RequestId, result: T::Result)
    where
        T: ModelContextProtocolRequest,
    {
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_initialize(
        &mut self,
        id: RequestId,
        params: <mcp_types::InitializeRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::info!("initialize -> params: {:?}", params);

        if self.initialized {
            let error = JSONRPCErrorError {
                code: INVALID_REQUEST_ERROR_CODE,
                message: "initialize called more than once".to_string(),
                data: None,
            };
            self.outgoing.send_error(id, error).await;
            return;
        }
        self.initialized = true;

        let result = InitializeResult {
            capabilities: ServerCapabilities {
                tools: Some(ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
            },
            instructions: None,
            protocol_version: MCP_SCHEMA_VERSION.to_string(),
            server_info: Implementation {
                name: "domtrace-mcp-server".to_string(),
                title: Some("DOM Trace".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        self.send_response::<mcp_types::InitializeRequest>(id, result)
            .await;
    }

    async fn handle_ping(
        &self,
        id: RequestId,
        params: <mcp_types::PingRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::info!("ping -> params: {:?}", params);
        self.send_response::<mcp_types::PingRequest>(id, json!({}))
            .await;
    }

    async fn handle_list_tools(
        &self,
        id: RequestId,
        params: <mcp_types::ListToolsRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::trace!("tools/list -> {params:?}");
        let result = ListToolsResult {
            tools: all_tools(),
            next_cursor: None,
        };
        self.send_response::<mcp_types::ListToolsRequest>(id, result)
            .await;
    }

    /// Tool calls can take as long as a browser launch, so each one runs on
    /// its own task and the read loop keeps going.
    fn handle_call_tool(
        &mut self,
        id: RequestId,
        params: <mcp_types::CallToolRequest as ModelContextProtocolRequest>::Params,
    ) {
        tracing::info!("tools/call -> {}", params.name);
        let CallToolRequestParams { name, arguments } = params;
        let service = self.service.clone();
        let outgoing = self.outgoing.clone();
        // Reap finished calls so the set only holds live ones.
        while self.tool_calls.try_join_next().is_some() {}
        self.tool_calls.spawn(async move {
            let result = handle_tool_call(&service, &name, arguments).await;
            outgoing.send_response(id, result).await;
        });
    }
}
