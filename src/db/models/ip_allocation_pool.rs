/// IP 地址池数据模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// IP 地址池模型
///
/// first_ip/last_ip 为闭区间，描述子网内一段可自动分配的连续地址
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ip_allocation_pools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub subnet_id: String,
    pub first_ip: String,
    pub last_ip: String,

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
}

impl Related<super::subnet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subnet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
