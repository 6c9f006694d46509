/// 应用全局状态

use std::sync::Arc;

use sea_orm::DatabaseConnection;

/// 应用状态
///
/// DatabaseConnection 在启用 mock 特性时不实现 Clone，
/// 统一用 Arc 共享连接
#[derive(Clone)]
pub struct AppState {
    /// SeaORM 数据库连接 - 所有查询共用
    pub sea_db: Arc<DatabaseConnection>,
}

impl AppState {
    pub fn new(sea_db: DatabaseConnection) -> Self {
        Self {
            sea_db: Arc::new(sea_db),
        }
    }

    /// 获取 SeaORM 数据库连接（共享句柄）
    pub fn sea_db(&self) -> Arc<DatabaseConnection> {
        self.sea_db.clone()
    }
}
