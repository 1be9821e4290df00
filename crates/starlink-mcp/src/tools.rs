//! Static tool catalog and argument extraction
//!
//! Tools form a closed set: every exposed tool is a `ToolKind` variant with
//! exactly one descriptor and one dispatch arm, checked exhaustively at
//! compile time.

use serde_json::{json, Value};

use crate::error::{McpError, McpResult};
use crate::mcp::Tool;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListUserTerminals,
    GetTerminalDetails,
    GetTerminalTelemetry,
    GetTerminalHistory,
    ListServiceLines,
    GetServiceLineDetails,
    GetDataUsage,
    ListAddresses,
    GetAddressDetails,
    CheckServiceAvailability,
    GetAccountOverview,
    ListSubscriptionProducts,
}

impl ToolKind {
    pub const ALL: [ToolKind; 12] = [
        ToolKind::ListUserTerminals,
        ToolKind::GetTerminalDetails,
        ToolKind::GetTerminalTelemetry,
        ToolKind::GetTerminalHistory,
        ToolKind::ListServiceLines,
        ToolKind::GetServiceLineDetails,
        ToolKind::GetDataUsage,
        ToolKind::ListAddresses,
        ToolKind::GetAddressDetails,
        ToolKind::CheckServiceAvailability,
        ToolKind::GetAccountOverview,
        ToolKind::ListSubscriptionProducts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListUserTerminals => "list_user_terminals",
            ToolKind::GetTerminalDetails => "get_terminal_details",
            ToolKind::GetTerminalTelemetry => "get_terminal_telemetry",
            ToolKind::GetTerminalHistory => "get_terminal_history",
            ToolKind::ListServiceLines => "list_service_lines",
            ToolKind::GetServiceLineDetails => "get_service_line_details",
            ToolKind::GetDataUsage => "get_data_usage",
            ToolKind::ListAddresses => "list_addresses",
            ToolKind::GetAddressDetails => "get_address_details",
            ToolKind::CheckServiceAvailability => "check_service_availability",
            ToolKind::GetAccountOverview => "get_account_overview",
            ToolKind::ListSubscriptionProducts => "list_subscription_products",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn descriptor(self) -> Tool {
        let (description, input_schema) = match self {
            ToolKind::ListUserTerminals => (
                "List all your Starlink user terminals with their current status",
                json!({
                    "type": "object",
                    "properties": {
                        "page": {
                            "type": "number",
                            "description": "Page number for pagination (default: 1)",
                            "default": 1
                        },
                        "page_size": {
                            "type": "number",
                            "description": "Number of results per page (default: 50, max: 100)",
                            "default": 50
                        }
                    }
                }),
            ),
            ToolKind::GetTerminalDetails => (
                "Get detailed information about a specific user terminal including hardware info and configuration",
                json!({
                    "type": "object",
                    "properties": {
                        "user_terminal_id": {
                            "type": "string",
                            "description": "User terminal ID (UUID format)"
                        }
                    },
                    "required": ["user_terminal_id"]
                }),
            ),
            ToolKind::GetTerminalTelemetry => (
                "Get real-time telemetry data for a terminal (uptime, signal quality, obstructions, throughput)",
                json!({
                    "type": "object",
                    "properties": {
                        "user_terminal_id": {
                            "type": "string",
                            "description": "User terminal ID"
                        }
                    },
                    "required": ["user_terminal_id"]
                }),
            ),
            ToolKind::GetTerminalHistory => (
                "Get historical telemetry data for a terminal over a specified time period",
                json!({
                    "type": "object",
                    "properties": {
                        "user_terminal_id": {
                            "type": "string",
                            "description": "User terminal ID"
                        },
                        "start_time": {
                            "type": "string",
                            "description": "Start time in ISO format (e.g., 2024-01-01T00:00:00Z)"
                        },
                        "end_time": {
                            "type": "string",
                            "description": "End time in ISO format"
                        }
                    },
                    "required": ["user_terminal_id", "start_time", "end_time"]
                }),
            ),
            ToolKind::ListServiceLines => (
                "List all your Starlink service lines (subscriptions/accounts)",
                json!({
                    "type": "object",
                    "properties": {
                        "page": {
                            "type": "number",
                            "description": "Page number",
                            "default": 1
                        },
                        "page_size": {
                            "type": "number",
                            "description": "Results per page",
                            "default": 50
                        }
                    }
                }),
            ),
            ToolKind::GetServiceLineDetails => (
                "Get details about a specific service line including subscription status and plan",
                json!({
                    "type": "object",
                    "properties": {
                        "service_line_id": {
                            "type": "string",
                            "description": "Service line ID (UUID format)"
                        }
                    },
                    "required": ["service_line_id"]
                }),
            ),
            ToolKind::GetDataUsage => (
                "Get data usage statistics for a service line over a date range",
                json!({
                    "type": "object",
                    "properties": {
                        "service_line_id": {
                            "type": "string",
                            "description": "Service line ID"
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Start date in YYYY-MM-DD format"
                        },
                        "end_date": {
                            "type": "string",
                            "description": "End date in YYYY-MM-DD format"
                        }
                    },
                    "required": ["service_line_id", "start_date", "end_date"]
                }),
            ),
            ToolKind::ListAddresses => (
                "List all service addresses associated with your account",
                json!({
                    "type": "object",
                    "properties": {
                        "page": {
                            "type": "number",
                            "description": "Page number",
                            "default": 1
                        }
                    }
                }),
            ),
            ToolKind::GetAddressDetails => (
                "Get details about a specific service address",
                json!({
                    "type": "object",
                    "properties": {
                        "address_id": {
                            "type": "string",
                            "description": "Address ID (UUID format)"
                        }
                    },
                    "required": ["address_id"]
                }),
            ),
            ToolKind::CheckServiceAvailability => (
                "Check if Starlink service is available at a specific location",
                json!({
                    "type": "object",
                    "properties": {
                        "latitude": {
                            "type": "number",
                            "description": "Latitude coordinate"
                        },
                        "longitude": {
                            "type": "number",
                            "description": "Longitude coordinate"
                        }
                    },
                    "required": ["latitude", "longitude"]
                }),
            ),
            ToolKind::GetAccountOverview => (
                "Get a complete overview of your Starlink account including all terminals, service lines, and summary statistics",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            ToolKind::ListSubscriptionProducts => (
                "List available Starlink subscription products and service plans",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
        };

        Tool {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// The full descriptor table, in catalog order
pub fn catalog() -> Vec<Tool> {
    ToolKind::ALL.iter().map(|kind| kind.descriptor()).collect()
}

/// Extract a required, non-empty string argument
pub fn required_str<'a>(args: &'a Value, field: &'static str) -> McpResult<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(McpError::MissingArgument(field))
}

/// Extract a required numeric argument
pub fn required_f64(args: &Value, field: &'static str) -> McpResult<f64> {
    args.get(field).and_then(Value::as_f64).ok_or(McpError::MissingArgument(field))
}

/// Optional page-style argument with a default
pub fn optional_u32(args: &Value, field: &str, default: u32) -> u32 {
    args.get(field).and_then(Value::as_u64).map(|value| value as u32).unwrap_or(default)
}
