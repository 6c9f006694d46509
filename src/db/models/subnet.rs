/// 子网数据模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 子网模型
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subnets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub network_id: String,
    pub name: String,
    pub ip_version: i32,  // 4 或 6
    pub cidr: String,
    pub gateway_ip: Option<String>,

    // 时间戳
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::network::Entity",
        from = "Column::NetworkId",
        to = "super::network::Column::Id"
    )]
    Network,

    #[sea_orm(has_many = "super::ip_allocation_pool::Entity")]
    IpAllocationPools,

    #[sea_orm(has_many = "super::ip_allocation::Entity")]
    IpAllocations,
}

impl Related<super::network::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Network.def()
    }
}

impl Related<super::ip_allocation_pool::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IpAllocationPools.def()
    }
}

impl Related<super::ip_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IpAllocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
