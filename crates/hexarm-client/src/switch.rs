//! 限位开关输入
//!
//! 去抖后的边沿事件由外部按钮库产生（数字输入 + 内部上拉，闭合
//! 拉低）；本 crate 只消费 crossbeam 通道里的事件流。

use crossbeam_channel::{unbounded, Receiver, Sender};

/// 限位开关边沿事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchEvent {
    /// 开关压下（去抖后的下降沿）
    Press,
    /// 开关松开
    Release,
}

/// 建一对开关事件通道
///
/// 真实系统里 `Sender` 交给按钮库的回调，测试里由测试代码直接
/// 喂事件。
pub fn switch_channel() -> (Sender<SwitchEvent>, Receiver<SwitchEvent>) {
    unbounded()
}
