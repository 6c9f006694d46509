/// 网络 IP 用量查询接口

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::app_state::AppState;
use crate::errors::Error;
use crate::services::ip_usage_service::{
    IpUsageService, NetworkIpUsageListResponse, UsageFilters,
};

/// API 错误响应
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidArgument(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 识别的过滤键；其余的查询参数一律忽略，保持向前兼容
const FILTER_NETWORK_ID: &str = "network_id";
const FILTER_NETWORK_NAME: &str = "network_name";
const FILTER_IP_VERSION: &str = "ip_version";

/// 把查询参数解析为过滤条件
///
/// 同一个键出现多次时只取第一个值（不支持跨值 OR）；
/// 空值不构成约束；ip_version 只接受 4 或 6
fn parse_filters(params: &[(String, String)]) -> Result<UsageFilters, Error> {
    let mut filters = UsageFilters::default();

    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            FILTER_NETWORK_ID => {
                filters.network_id.get_or_insert_with(|| value.clone());
            }
            FILTER_NETWORK_NAME => {
                filters.network_name.get_or_insert_with(|| value.clone());
            }
            FILTER_IP_VERSION => {
                let version = match value.as_str() {
                    "4" => 4,
                    "6" => 6,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "ip_version 只支持 4 或 6: {}",
                            other
                        )))
                    }
                };
                filters.ip_version.get_or_insert(version);
            }
            _ => {}
        }
    }

    Ok(filters)
}

/// 创建路由
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_network_ip_usages))
        .route("/:network_id", get(get_network_ip_usage))
}

/// 获取所有网络的 IP 用量
async fn list_network_ip_usages(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = parse_filters(&params)?;
    let service = IpUsageService::new(state);
    let usages = service.list_network_ip_usages(&filters).await?;
    Ok(Json(NetworkIpUsageListResponse {
        total: usages.len(),
        network_ip_usages: usages,
    }))
}

/// 获取单个网络的 IP 用量
async fn get_network_ip_usage(
    State(state): State<AppState>,
    Path(network_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = IpUsageService::new(state);
    let usage = service.get_network_ip_usage(&network_id).await?;
    Ok(Json(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_filters_recognized_keys() {
        let filters = parse_filters(&params(&[
            ("network_id", "net-1"),
            ("network_name", "net1"),
            ("ip_version", "4"),
        ]))
        .unwrap();

        assert_eq!(filters.network_id.as_deref(), Some("net-1"));
        assert_eq!(filters.network_name.as_deref(), Some("net1"));
        assert_eq!(filters.ip_version, Some(4));
    }

    #[test]
    fn parse_filters_ignores_unknown_keys() {
        let filters = parse_filters(&params(&[
            ("tenant_id", "t-1"),
            ("sort_key", "name"),
            ("network_id", "net-1"),
        ]))
        .unwrap();

        assert_eq!(filters.network_id.as_deref(), Some("net-1"));
        assert!(filters.network_name.is_none());
        assert!(filters.ip_version.is_none());
    }

    #[test]
    fn parse_filters_first_value_wins() {
        let filters = parse_filters(&params(&[
            ("network_id", "net-1"),
            ("network_id", "net-2"),
        ]))
        .unwrap();

        assert_eq!(filters.network_id.as_deref(), Some("net-1"));
    }

    #[test]
    fn parse_filters_empty_value_is_no_constraint() {
        let filters = parse_filters(&params(&[("network_name", "")])).unwrap();
        assert!(filters.network_name.is_none());
    }

    #[test]
    fn parse_filters_rejects_bad_ip_version() {
        let err = parse_filters(&params(&[("ip_version", "5")])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = parse_filters(&params(&[("ip_version", "abc")])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
