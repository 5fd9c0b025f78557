//! 传输层抽象
//!
//! 真实的串口实现是外部协作者（tokio-serial / serialport 等均可），
//! 本 crate 只定义字节流接口；`mock` 特性提供测试用实现。

use std::io;
use std::time::Duration;

/// 串行传输接口
///
/// 网关的 IO 线程独占持有一个 `Transport`，所以方法拿 `&mut self`，
/// 实现无需内部加锁。
pub trait Transport: Send {
    /// 写出一段字节（一个完整 sysex 帧）
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// 读入一段字节
    ///
    /// - `Ok(Some(bytes))`: 读到数据（不保证按帧边界切分）
    /// - `Ok(None)`: 超时内没有数据，正常情况
    /// - `Err(_)`: 传输层故障，网关视为终态
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>>;
}
