//! 完成句柄
//!
//! 微控制器的"命令 + 完成回报"模型在主机侧表现为一次性通道：
//! 命令发出时注册一个 `Sender`，IO 线程收到对应回报后投递绝对
//! 步数。等待方阻塞在 [`Completion::wait`] 上，相当于协程模型里
//! 的 `await`。

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{GatewayError, Result};

/// 一次运动/查询的完成句柄
///
/// 解析值是微控制器回报的绝对步数。句柄可以被丢弃（即发即弃），
/// IO 线程对已丢弃句柄的投递会被静默忽略。
#[derive(Debug)]
pub struct Completion {
    rx: Receiver<Result<i32>>,
}

impl Completion {
    pub(crate) fn new(rx: Receiver<Result<i32>>) -> Self {
        Completion { rx }
    }

    /// 阻塞等待完成，返回绝对步数
    ///
    /// 没有内建超时：丢失的回报会让调用方一直等下去，直到
    /// `halt()` 路径触发栅栏或网关下线。
    pub fn wait(self) -> Result<i32> {
        match self.rx.recv() {
            Ok(result) => result,
            // IO 线程异常退出，发送端被丢弃
            Err(_) => Err(GatewayError::Down),
        }
    }

    /// 带超时的等待；超时返回 `Ok(None)`，句柄仍可继续等待
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<i32>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(GatewayError::Down),
        }
    }
}
