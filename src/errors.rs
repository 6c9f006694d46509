use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("数据库错误: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("地址计算错误: {0}")]
    AddressComputation(String),
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
