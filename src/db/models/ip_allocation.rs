/// IP 分配数据模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// IP 分配模型
///
/// 一条记录即一个已被消费的地址；用量统计只关心每个子网的记录数
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ip_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub network_id: String,
    pub subnet_id: String,
    pub ip_address: String,
    pub port_id: Option<String>,

    // 时间戳
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subnet::Entity",
        from = "Column::SubnetId",
        to = "super::subnet::Column::Id"
    )]
    Subnet,

    #[sea_orm(
        belongs_to = "super::network::Entity",
        from = "Column::NetworkId",
        to = "super::network::Column::Id"
    )]
    Network,
}

impl Related<super::subnet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subnet.def()
    }
}

impl Related<super::network::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Network.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
