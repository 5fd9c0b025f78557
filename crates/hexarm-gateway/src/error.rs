//! 网关层错误类型定义

use thiserror::Error;

/// 网关层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 传输层故障或 IO 线程已退出；对整个进程是终态
    #[error("Gateway down: transport failed or IO thread exited")]
    Down,

    /// 完成通道在未解决前被丢弃（IO 线程异常退出）
    #[error("Completion dropped before resolution")]
    CompletionLost,
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

/// 网关全局事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent {
    /// 传输层故障，所有挂起操作已以 [`GatewayError::Down`] 终结
    Down,
}
