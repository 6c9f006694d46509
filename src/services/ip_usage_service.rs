/// 网络 IP 用量统计服务
///
/// 核心聚合逻辑：一条分组外连接查询拿到
/// (网络, 子网, 地址池, 分配计数) 的扁平行集，
/// 再折叠成按网络嵌套的用量结果

use std::collections::{hash_map::Entry, HashMap};
use std::net::IpAddr;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, QueryTrait, RelationTrait, Select,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_state::AppState;
use crate::db::models::{ip_allocation, ip_allocation_pool, network, subnet};
use crate::errors::{Error, Result};

/// 支持的过滤条件
///
/// 每个条件都是等值匹配；None 表示不约束
#[derive(Debug, Default, Clone)]
pub struct UsageFilters {
    pub network_id: Option<String>,
    pub network_name: Option<String>,
    pub ip_version: Option<i32>,
}

/// 分组查询返回的扁平行
///
/// 子网/地址池列来自外连接，可能为 NULL
#[derive(Debug, Clone, FromQueryResult)]
pub struct UsageRow {
    pub network_id: String,
    pub network_name: String,
    pub subnet_id: Option<String>,
    pub subnet_name: Option<String>,
    pub ip_version: Option<i32>,
    pub cidr: Option<String>,
    pub first_ip: Option<String>,
    pub last_ip: Option<String>,
    pub used_ips: Option<i64>,
}

/// 子网级用量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetIpUsage {
    pub subnet_id: String,
    pub name: String,
    pub ip_version: i32,
    pub cidr: String,
    pub used_ips: i64,
    pub total_ips: u128,
}

/// 网络级用量（子网用量的汇总）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIpUsage {
    pub id: String,
    pub name: String,
    pub used_ips: i64,
    pub total_ips: u128,
    pub subnet_ip_allocations: Vec<SubnetIpUsage>,
}

/// 用量列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkIpUsageListResponse {
    pub network_ip_usages: Vec<NetworkIpUsage>,
    pub total: usize,
}

pub struct IpUsageService {
    state: AppState,
}

impl IpUsageService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 查询所有网络的 IP 用量
    pub async fn list_network_ip_usages(
        &self,
        filters: &UsageFilters,
    ) -> Result<Vec<NetworkIpUsage>> {
        let db = self.state.sea_db();

        let query = Self::build_usage_query(filters);
        debug!("用量查询 SQL: {}", query.build(db.get_database_backend()));

        let rows = query.into_model::<UsageRow>().all(db.as_ref()).await?;
        debug!("用量查询返回 {} 行", rows.len());

        Self::fold_rows(rows)
    }

    /// 查询单个网络的 IP 用量
    pub async fn get_network_ip_usage(&self, network_id: &str) -> Result<NetworkIpUsage> {
        let filters = UsageFilters {
            network_id: Some(network_id.to_string()),
            ..Default::default()
        };

        let usages = self.list_network_ip_usages(&filters).await?;
        usages
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("网络 {} 不存在", network_id)))
    }

    /// 构建分组外连接查询
    ///
    /// networks 依次左连接 subnets / ip_allocations / ip_allocation_pools，
    /// 按全部非聚合列分组，COUNT(ip_allocations.subnet_id) 即每组的已用地址数。
    /// 没有子网的网络会产生一条子网列全空的行；没有地址池的子网产生
    /// 地址池列为空的行；多个地址池则每池一行，计数相同
    fn build_usage_query(filters: &UsageFilters) -> Select<network::Entity> {
        let mut query = network::Entity::find()
            .select_only()
            .column_as(network::Column::Id, "network_id")
            .column_as(network::Column::Name, "network_name")
            .column_as(subnet::Column::Id, "subnet_id")
            .column_as(subnet::Column::Name, "subnet_name")
            .column_as(subnet::Column::IpVersion, "ip_version")
            .column_as(subnet::Column::Cidr, "cidr")
            .column_as(ip_allocation_pool::Column::FirstIp, "first_ip")
            .column_as(ip_allocation_pool::Column::LastIp, "last_ip")
            .expr_as(ip_allocation::Column::SubnetId.count(), "used_ips")
            .join(JoinType::LeftJoin, network::Relation::Subnets.def())
            .join(JoinType::LeftJoin, subnet::Relation::IpAllocations.def())
            .join(JoinType::LeftJoin, subnet::Relation::IpAllocationPools.def())
            .group_by(network::Column::Id)
            .group_by(network::Column::Name)
            .group_by(subnet::Column::Id)
            .group_by(subnet::Column::Name)
            .group_by(subnet::Column::IpVersion)
            .group_by(subnet::Column::Cidr)
            .group_by(ip_allocation_pool::Column::FirstIp)
            .group_by(ip_allocation_pool::Column::LastIp);

        if let Some(ref network_id) = filters.network_id {
            query = query.filter(network::Column::Id.eq(network_id.clone()));
        }
        if let Some(ref network_name) = filters.network_name {
            query = query.filter(network::Column::Name.eq(network_name.clone()));
        }
        if let Some(ip_version) = filters.ip_version {
            query = query.filter(subnet::Column::IpVersion.eq(ip_version));
        }

        query
    }

    /// 把扁平行集折叠成按网络嵌套的结果
    ///
    /// 网络按首次出现顺序输出；子网在所属网络内同样按首次出现顺序。
    /// 同一子网因多个地址池出现多行时只记一次 used_ips，
    /// total_ips 取最后一行地址池的范围（与原始行为保持兼容，
    /// 多池子网的总量会被低估）。网络级汇总在最后统一求和
    fn fold_rows(rows: Vec<UsageRow>) -> Result<Vec<NetworkIpUsage>> {
        struct NetAcc {
            id: String,
            name: String,
            subnet_order: Vec<String>,
            subnets: HashMap<String, SubnetIpUsage>,
        }

        let mut order: Vec<String> = Vec::new();
        let mut nets: HashMap<String, NetAcc> = HashMap::new();

        for row in rows {
            let acc = match nets.entry(row.network_id.clone()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    order.push(row.network_id.clone());
                    e.insert(NetAcc {
                        id: row.network_id.clone(),
                        name: row.network_name.clone(),
                        subnet_order: Vec::new(),
                        subnets: HashMap::new(),
                    })
                }
            };

            // 没有子网的网络：保留网络条目，不做子网级处理
            let Some(subnet_id) = row.subnet_id.clone() else {
                continue;
            };

            let cidr = row.cidr.clone().ok_or_else(|| {
                Error::AddressComputation(format!("子网 {} 缺少 CIDR", subnet_id))
            })?;
            let ip_version = row.ip_version.ok_or_else(|| {
                Error::AddressComputation(format!("子网 {} 缺少 ip_version", subnet_id))
            })?;

            // 行带地址池时按池范围计算，否则按 CIDR 计算
            let total_ips = match (&row.first_ip, &row.last_ip) {
                (Some(first_ip), Some(last_ip)) => pool_range_size(first_ip, last_ip)?,
                _ => cidr_total_ips(&cidr, ip_version)?,
            };

            match acc.subnets.entry(subnet_id.clone()) {
                Entry::Occupied(mut e) => {
                    // 同一子网的后续地址池行：覆盖 total_ips
                    e.get_mut().total_ips = total_ips;
                }
                Entry::Vacant(e) => {
                    acc.subnet_order.push(subnet_id.clone());
                    e.insert(SubnetIpUsage {
                        subnet_id,
                        name: row.subnet_name.clone().unwrap_or_default(),
                        ip_version,
                        cidr,
                        used_ips: row.used_ips.unwrap_or(0),
                        total_ips,
                    });
                }
            }
        }

        let mut result = Vec::with_capacity(order.len());
        for network_id in order {
            if let Some(mut acc) = nets.remove(&network_id) {
                let mut usage = NetworkIpUsage {
                    id: acc.id,
                    name: acc.name,
                    used_ips: 0,
                    total_ips: 0,
                    subnet_ip_allocations: Vec::with_capacity(acc.subnet_order.len()),
                };
                for subnet_id in acc.subnet_order.drain(..) {
                    if let Some(subnet_usage) = acc.subnets.remove(&subnet_id) {
                        usage.used_ips += subnet_usage.used_ips;
                        usage.total_ips = usage.total_ips.saturating_add(subnet_usage.total_ips);
                        usage.subnet_ip_allocations.push(subnet_usage);
                    }
                }
                result.push(usage);
            }
        }
        Ok(result)
    }
}

/// 地址池闭区间 [first_ip, last_ip] 的地址数
fn pool_range_size(first_ip: &str, last_ip: &str) -> Result<u128> {
    let first: IpAddr = first_ip.parse().map_err(|_| {
        Error::AddressComputation(format!("无法解析地址池起始地址: {}", first_ip))
    })?;
    let last: IpAddr = last_ip.parse().map_err(|_| {
        Error::AddressComputation(format!("无法解析地址池结束地址: {}", last_ip))
    })?;

    let (first, last) = match (first, last) {
        (IpAddr::V4(first), IpAddr::V4(last)) => (u32::from(first) as u128, u32::from(last) as u128),
        (IpAddr::V6(first), IpAddr::V6(last)) => (u128::from(first), u128::from(last)),
        _ => {
            return Err(Error::AddressComputation(format!(
                "地址池两端地址族不一致: {} - {}",
                first_ip, last_ip
            )))
        }
    };

    if last < first {
        return Err(Error::AddressComputation(format!(
            "地址池区间倒置: {} - {}",
            first_ip, last_ip
        )));
    }

    Ok(last - first + 1)
}

/// 按 CIDR 和地址族计算整块地址数: 2^(位宽 - 前缀长度)
fn cidr_total_ips(cidr: &str, ip_version: i32) -> Result<u128> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| Error::AddressComputation(format!("无效的 CIDR 格式: {}", cidr)))?;

    let addr: IpAddr = addr
        .parse()
        .map_err(|_| Error::AddressComputation(format!("无效的 CIDR 地址: {}", cidr)))?;
    let prefix: u32 = prefix
        .parse()
        .map_err(|_| Error::AddressComputation(format!("无效的 CIDR 前缀: {}", cidr)))?;

    let bits: u32 = match (addr, ip_version) {
        (IpAddr::V4(_), 4) => 32,
        (IpAddr::V6(_), 6) => 128,
        _ => {
            return Err(Error::AddressComputation(format!(
                "CIDR {} 与 ip_version {} 不一致",
                cidr, ip_version
            )))
        }
    };

    if prefix > bits {
        return Err(Error::AddressComputation(format!(
            "CIDR 前缀长度超出范围: {}",
            cidr
        )));
    }

    // ::/0 的大小超出 u128 表示范围，饱和到最大值
    Ok(1u128.checked_shl(bits - prefix).unwrap_or(u128::MAX))
}
